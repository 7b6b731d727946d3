use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::db::{DatabaseKind, ProfileSummary};
use crate::error::AppError;
use crate::pipeline::QueryOutcome;
use crate::session::connection::ConnectionStatus;
use crate::session::{ConnectRequest, FavoriteEntry, HistoryEntry};
use crate::web::state::AppState;

type ApiResult<T> = Result<Json<T>, AppError>;

// Request types

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NlQueryRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub question: String,
}

// Response types

/// Connection status, plus a warning when persisting saved data failed
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    #[serde(flatten)]
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub connection: ConnectionStatus,
    pub saved_connections: usize,
    pub favorites: usize,
    pub history: usize,
    pub load_warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Indexed<T> {
    pub index: usize,
    #[serde(flatten)]
    pub entry: T,
}

#[derive(Debug, Serialize)]
pub struct SavedConnections {
    pub connections: Vec<Indexed<ProfileSummary>>,
}

#[derive(Debug, Serialize)]
pub struct Entries<T> {
    pub entries: Vec<Indexed<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Reused {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub schema: String,
}

// System status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let session = state.session.lock().await;

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        connection: session.status(),
        saved_connections: session.saved_connections().len(),
        favorites: session.favorites().len(),
        history: session.history().len(),
        load_warning: session.load_warning().map(str::to_string),
    })
}

// Connection lifecycle

pub async fn select_database(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SelectRequest>,
) -> Json<ConnectionResponse> {
    let mut session = state.session.lock().await;
    session.select(payload.kind);

    Json(ConnectionResponse {
        status: session.status(),
        warning: None,
    })
}

pub async fn connect(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConnectRequest>,
) -> ApiResult<ConnectionResponse> {
    let mut session = state.session.lock().await;
    let warning = session.connect(payload).await?;

    Ok(Json(ConnectionResponse {
        status: session.status(),
        warning,
    }))
}

pub async fn disconnect(State(state): State<Arc<AppState>>) -> Json<ConnectionResponse> {
    let mut session = state.session.lock().await;
    session.disconnect();

    Json(ConnectionResponse {
        status: session.status(),
        warning: None,
    })
}

pub async fn list_connections(State(state): State<Arc<AppState>>) -> Json<SavedConnections> {
    let session = state.session.lock().await;
    let connections = session
        .saved_connections()
        .iter()
        .enumerate()
        .map(|(index, profile)| Indexed {
            index,
            entry: profile.summary(),
        })
        .collect();

    Json(SavedConnections { connections })
}

pub async fn connect_saved(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult<ConnectionResponse> {
    let mut session = state.session.lock().await;
    session.connect_saved(index).await?;

    Ok(Json(ConnectionResponse {
        status: session.status(),
        warning: None,
    }))
}

// Questions and results

pub async fn nl_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NlQueryRequest>,
) -> ApiResult<QueryOutcome> {
    info!("Processing natural language query: {}", payload.question);

    let mut session = state.session.lock().await;
    let outcome = state
        .pipeline
        .process(&mut session, &payload.question)
        .await
        .inspect_err(|e| error!("Query failed: {}", e))?;

    Ok(Json(outcome))
}

pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let session = state.session.lock().await;
    let table = session.last_result().ok_or(AppError::NoResult)?;

    let csv = table.to_csv().map_err(|e| {
        AppError::Execution(crate::db::DbError::Query(format!("CSV export failed: {}", e)))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment; filename=\"query_results.csv\""),
            ),
        ],
        csv,
    )
        .into_response())
}

pub async fn get_schema(State(state): State<Arc<AppState>>) -> ApiResult<SchemaResponse> {
    let session = state.session.lock().await;
    let active = session.active().ok_or(AppError::NotConnected)?;

    let schema = active.schema().await.map_err(AppError::Execution)?;
    Ok(Json(SchemaResponse {
        kind: active.profile.kind,
        schema: schema.to_string(),
    }))
}

// History and favorites

pub async fn list_history(State(state): State<Arc<AppState>>) -> Json<Entries<HistoryEntry>> {
    let session = state.session.lock().await;
    let entries = session
        .history()
        .iter()
        .cloned()
        .enumerate()
        .rev()
        .map(|(index, entry)| Indexed { index, entry })
        .collect();

    Json(Entries {
        entries,
        warning: None,
    })
}

pub async fn reuse_history(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult<Reused> {
    let mut session = state.session.lock().await;
    let question = session.reuse_history(index)?;
    Ok(Json(Reused { question }))
}

fn favorite_entries(favorites: &[FavoriteEntry], warning: Option<String>) -> Entries<FavoriteEntry> {
    Entries {
        entries: favorites
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, entry)| Indexed { index, entry })
            .collect(),
        warning,
    }
}

pub async fn list_favorites(State(state): State<Arc<AppState>>) -> Json<Entries<FavoriteEntry>> {
    let session = state.session.lock().await;
    Json(favorite_entries(session.favorites(), None))
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FavoriteRequest>,
) -> ApiResult<Entries<FavoriteEntry>> {
    let mut session = state.session.lock().await;
    let warning = session.add_favorite(&payload.question)?;
    Ok(Json(favorite_entries(session.favorites(), warning)))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult<Entries<FavoriteEntry>> {
    let mut session = state.session.lock().await;
    let warning = session.remove_favorite(index)?;
    Ok(Json(favorite_entries(session.favorites(), warning)))
}

pub async fn reuse_favorite(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult<Reused> {
    let mut session = state.session.lock().await;
    let question = session.reuse_favorite(index)?;
    Ok(Json(Reused { question }))
}
