//! Question in, table and chart out.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart::{render_chart, Chart};
use crate::db::ResultTable;
use crate::error::AppError;
use crate::llm::LlmManager;
use crate::session::Session;
use crate::util::validate::validate;

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub question: String,
    pub sql: String,
    pub table: ResultTable,
    pub chart: Option<Chart>,
}

pub struct QueryPipeline {
    llm: LlmManager,
}

impl QueryPipeline {
    pub fn new(llm: LlmManager) -> Self {
        Self { llm }
    }

    /// Validates, translates and executes a question against the active
    /// connection, then records it in history.
    ///
    /// Chart generation is best effort: any failure leaves `chart` empty.
    /// Favorites are never touched.
    pub async fn process(
        &self,
        session: &mut Session,
        question: &str,
    ) -> Result<QueryOutcome, AppError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::invalid_input("Please enter a question"));
        }
        if !validate(question) {
            return Err(AppError::invalid_input(
                "Invalid input detected. Please avoid quotes, semicolons and SQL comments.",
            ));
        }

        let active = session.active().ok_or(AppError::NotConnected)?;

        let schema = match active.schema().await {
            Ok(schema) => schema.to_string(),
            Err(e) => {
                warn!("Could not describe schema, continuing without it: {}", e);
                String::new()
            }
        };

        let sql = self.llm.generate_sql(question, &schema).await?;
        info!("Executing generated SQL on {}", active.profile.kind);

        let table = active
            .executor
            .execute(&sql)
            .await
            .map_err(AppError::Execution)?;
        info!("Query returned {} rows", table.row_count());

        session.record_history(question, &sql);

        let chart = self.chart(question, &sql, &table).await;
        session.set_last_result(table.clone());

        Ok(QueryOutcome {
            question: question.to_string(),
            sql,
            table,
            chart,
        })
    }

    async fn chart(&self, question: &str, sql: &str, table: &ResultTable) -> Option<Chart> {
        let code = match self.llm.generate_chart_code(question, sql, table).await {
            Ok(code) => code,
            Err(e) => {
                debug!("No chart code: {}", e);
                return None;
            }
        };

        render_chart(&code, table)
            .map_err(|e| debug!("Chart not rendered: {}", e))
            .ok()
    }
}
