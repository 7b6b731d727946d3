#![allow(dead_code)]

use askdb::db::{
    ConnectionProfile, Connector, Connectors, DatabaseKind, DbError, QueryExecutor, ResultTable,
};
use askdb::llm::{LlmError, LlmManager, TranslationEngine};
use askdb::pipeline::QueryPipeline;
use askdb::session::connection::ConnectionManager;
use askdb::session::store::CredentialStore;
use askdb::session::Session;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns a fixed table and records every statement.
pub struct FakeExecutor {
    pub table: ResultTable,
    pub statements: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn returning(table: ResultTable) -> Arc<Self> {
        Arc::new(Self {
            table,
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    async fn execute(&self, sql: &str) -> Result<ResultTable, DbError> {
        self.statements.lock().unwrap().push(sql.to_string());
        if sql.contains("missing_table") {
            return Err(DbError::Query("Table 'sales.missing_table' doesn't exist".to_string()));
        }
        Ok(self.table.clone())
    }

    async fn describe_schema(&self) -> Result<String, DbError> {
        Ok("# DATABASE SCHEMA\n\n### Table: Customer\n".to_string())
    }
}

/// Hands out one executor, failing while `fail` is set.
pub struct FakeConnector {
    pub executor: Arc<FakeExecutor>,
    pub fail: std::sync::atomic::AtomicBool,
    pub calls: AtomicUsize,
    pub profiles: Mutex<Vec<ConnectionProfile>>,
}

impl FakeConnector {
    pub fn new(executor: Arc<FakeExecutor>) -> Arc<Self> {
        Arc::new(Self {
            executor,
            fail: std::sync::atomic::AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            profiles: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(executor: Arc<FakeExecutor>) -> Arc<Self> {
        let connector = Self::new(executor);
        connector.fail.store(true, Ordering::SeqCst);
        connector
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn QueryExecutor>, DbError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profiles.lock().unwrap().push(profile.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(DbError::Connect("Access denied for user 'app'".to_string()));
        }
        Ok(self.executor.clone())
    }
}

/// Answers every question with the same SQL and chart.
pub struct FakeTranslator {
    pub sql: String,
    pub chart: Option<String>,
    pub sql_calls: AtomicUsize,
    pub chart_calls: AtomicUsize,
}

impl FakeTranslator {
    pub fn new(sql: &str, chart: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            sql: sql.to_string(),
            chart: chart.map(str::to_string),
            sql_calls: AtomicUsize::new(0),
            chart_calls: AtomicUsize::new(0),
        })
    }

    pub fn sql_calls(&self) -> usize {
        self.sql_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationEngine for FakeTranslator {
    async fn generate_sql(&self, _question: &str, schema: &str) -> Result<String, LlmError> {
        self.sql_calls.fetch_add(1, Ordering::SeqCst);
        assert!(schema.starts_with("# DATABASE SCHEMA"));
        Ok(self.sql.clone())
    }

    async fn generate_chart_code(
        &self,
        _question: &str,
        _sql: &str,
        _table: &ResultTable,
    ) -> Result<String, LlmError> {
        self.chart_calls.fetch_add(1, Ordering::SeqCst);
        self.chart
            .clone()
            .ok_or_else(|| LlmError::ResponseError("no chart".to_string()))
    }
}

pub fn count_table(count: i64) -> ResultTable {
    ResultTable {
        columns: vec!["count".to_string()],
        rows: vec![vec![json!(count)]],
    }
}

pub fn session_with(connectors: Connectors, state_file: &Path) -> Session {
    Session::open(
        CredentialStore::new(state_file),
        ConnectionManager::new(connectors, 3, Duration::from_secs(5)),
        1000,
    )
}

pub fn pipeline_with(translator: Arc<FakeTranslator>) -> QueryPipeline {
    QueryPipeline::new(LlmManager::with_engine(translator))
}

pub fn mysql_form(name: &str, save: bool) -> askdb::session::ConnectRequest {
    askdb::session::ConnectRequest {
        kind: Some(DatabaseKind::MySql),
        name: name.to_string(),
        host: "db.internal".to_string(),
        port: None,
        database: "sales".to_string(),
        username: "app".to_string(),
        password: "hunter2".to_string(),
        save,
    }
}
