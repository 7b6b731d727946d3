//! The public sample database.
//!
//! The Chinook SQLite file is downloaded once into the data directory and
//! then opened read-only for every statement.

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{
    ConnectionProfile, Connector, DatabaseKind, DbError, QueryExecutor, ResultTable,
};

pub struct DemoConnector {
    url: String,
    cache_path: PathBuf,
    client: reqwest::Client,
}

impl DemoConnector {
    pub fn new(url: String, cache_path: PathBuf) -> Self {
        Self {
            url,
            cache_path,
            client: reqwest::Client::new(),
        }
    }

    async fn ensure_downloaded(&self) -> Result<(), DbError> {
        if self.cache_path.exists() {
            debug!("Using cached demo database at {}", self.cache_path.display());
            return Ok(());
        }

        if let Some(parent) = self.cache_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DbError::Download(e.to_string()))?;
        }

        let bytes = if let Some(local) = self.url.strip_prefix("file://") {
            tokio::fs::read(local)
                .await
                .map_err(|e| DbError::Download(format!("{}: {}", local, e)))?
        } else {
            info!("Downloading demo database from {}", self.url);
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| DbError::Download(e.to_string()))?;

            if !response.status().is_success() {
                return Err(DbError::Download(format!(
                    "{} responded with status code: {}",
                    self.url,
                    response.status()
                )));
            }

            response
                .bytes()
                .await
                .map_err(|e| DbError::Download(e.to_string()))?
                .to_vec()
        };

        // Write next to the target first so a partial download is never picked up
        let partial = self.cache_path.with_extension("partial");
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| DbError::Download(e.to_string()))?;
        tokio::fs::rename(&partial, &self.cache_path)
            .await
            .map_err(|e| DbError::Download(e.to_string()))?;

        info!("Cached demo database at {}", self.cache_path.display());
        Ok(())
    }
}

#[async_trait]
impl Connector for DemoConnector {
    async fn connect(
        &self,
        _profile: &ConnectionProfile,
    ) -> Result<Arc<dyn QueryExecutor>, DbError> {
        self.ensure_downloaded().await?;

        let path = self.cache_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), DbError> {
            let conn = open_read_only(&path)?;
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|e| DbError::Connect(e.to_string()))?;
            Ok(())
        })
        .await??;

        Ok(Arc::new(SqliteExecutor::new(self.cache_path.clone())))
    }
}

/// Executes statements against a SQLite file.
pub struct SqliteExecutor {
    path: PathBuf,
}

impl SqliteExecutor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Demo
    }

    async fn execute(&self, sql: &str) -> Result<ResultTable, DbError> {
        let path = self.path.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = open_read_only(&path)?;
            run_query(&conn, &sql)
        })
        .await?
    }
}

fn open_read_only(path: &Path) -> Result<Connection, DbError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| DbError::Connect(format!("{}: {}", path.display(), e)))
}

fn run_query(conn: &Connection, sql: &str) -> Result<ResultTable, DbError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| DbError::Query(e.to_string()))?;

    let mut table = ResultTable::new(
        stmt.column_names()
            .iter()
            .map(|name| name.to_string())
            .collect(),
    );
    let column_count = table.columns.len();

    let mut rows = stmt.query([]).map_err(|e| DbError::Query(e.to_string()))?;
    while let Some(row) = rows.next().map_err(|e| DbError::Query(e.to_string()))? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(sqlite_value_to_json(row, idx)?);
        }
        table.rows.push(values);
    }

    Ok(table)
}

fn sqlite_value_to_json(row: &Row, idx: usize) -> Result<Value, DbError> {
    let value_ref = row
        .get_ref(idx)
        .map_err(|e| DbError::Query(e.to_string()))?;

    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    })
}
