//! Errors surfaced to the user.
//!
//! Every operation that can fail reports one of these kinds. The web layer
//! turns them into a JSON body with a stable code; nothing here ends the
//! process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::DbError;
use crate::llm::LlmError;
use crate::session::store::PersistenceError;

#[derive(Error, Debug)]
pub enum AppError {
    /// The user has to correct what they typed
    #[error("{0}")]
    InvalidInput(String),

    #[error("Error generating SQL: {0}")]
    Translation(#[from] LlmError),

    #[error("Error running query: {0}")]
    Execution(DbError),

    #[error("Connection failed: {0}")]
    Connection(DbError),

    #[error("Error saving data: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Not connected to a database")]
    NotConnected,

    #[error("{0}")]
    InvalidState(String),

    #[error("No {what} at index {index}")]
    IndexOutOfRange { what: &'static str, index: usize },

    #[error("No query result to download")]
    NoResult,
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Stable error code for API clients
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Translation(_) => "TRANSLATION_FAILED",
            Self::Execution(_) => "EXECUTION_FAILED",
            Self::Connection(_) => "CONNECTION_FAILED",
            Self::Persistence(_) => "PERSISTENCE_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            Self::NoResult => "NO_RESULT",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::IndexOutOfRange { .. } | Self::NoResult => StatusCode::NOT_FOUND,
            Self::NotConnected | Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::Translation(_) | Self::Connection(_) => StatusCode::BAD_GATEWAY,
            Self::Execution(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}
