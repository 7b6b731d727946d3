pub mod extract;
pub mod prompts;
pub mod providers;

use crate::config::LlmConfig;
use crate::db::ResultTable;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),

    #[error("LLM response error: {0}")]
    ResponseError(String),

    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// The hosted service that writes SQL and chart specifications.
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError>;

    /// A Vega-Lite specification, as JSON text, for an executed query.
    async fn generate_chart_code(
        &self,
        question: &str,
        sql: &str,
        table: &ResultTable,
    ) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct LlmManager {
    engine: Arc<dyn TranslationEngine>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let engine: Arc<dyn TranslationEngine> = match config.backend.as_str() {
            "remote" => Arc::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Arc::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )));
            }
        };

        Ok(Self { engine })
    }

    pub fn with_engine(engine: Arc<dyn TranslationEngine>) -> Self {
        Self { engine }
    }

    pub async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError> {
        let raw = self.engine.generate_sql(question, schema).await?;
        let sql = finish_sql(&raw)?;
        debug!("Generated SQL: {}", sql);
        Ok(sql)
    }

    pub async fn generate_chart_code(
        &self,
        question: &str,
        sql: &str,
        table: &ResultTable,
    ) -> Result<String, LlmError> {
        self.engine.generate_chart_code(question, sql, table).await
    }
}

/// Stray backticks break every engine's parser.
fn finish_sql(raw: &str) -> Result<String, LlmError> {
    let sql = raw.replace('`', "");
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(LlmError::ResponseError(
            "Failed to extract valid SQL from response".to_string(),
        ));
    }
    Ok(sql.to_string())
}
