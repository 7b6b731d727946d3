//! SQL Server through ODBC.
//!
//! The ODBC driver manager is a system library, so the executor is only
//! compiled with the `sqlserver` feature. Without it, connecting reports the
//! kind as unsupported.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::{ConnectionProfile, Connector, DatabaseKind, DbError, QueryExecutor};

pub struct SqlServerConnector {
    driver: String,
}

impl SqlServerConnector {
    pub fn new(driver: String) -> Self {
        Self { driver }
    }
}

/// ODBC connection string for a profile. The port is not part of it.
pub fn connection_string(driver: &str, profile: &ConnectionProfile) -> String {
    format!(
        "DRIVER={{{}}};SERVER={};DATABASE={};UID={};PWD={}",
        driver, profile.host, profile.database, profile.username, profile.password
    )
}

#[cfg(feature = "sqlserver")]
#[async_trait]
impl Connector for SqlServerConnector {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn QueryExecutor>, DbError> {
        let executor = odbc::OdbcExecutor::new(connection_string(&self.driver, profile));
        executor.ping().await?;

        tracing::info!("Connected to SQL Server at {}", profile.host);
        Ok(Arc::new(executor))
    }
}

#[cfg(not(feature = "sqlserver"))]
#[async_trait]
impl Connector for SqlServerConnector {
    async fn connect(
        &self,
        _profile: &ConnectionProfile,
    ) -> Result<Arc<dyn QueryExecutor>, DbError> {
        tracing::debug!("ODBC driver {} unavailable in this build", self.driver);
        Err(DbError::Unsupported {
            kind: DatabaseKind::SqlServer,
        })
    }
}

#[cfg(feature = "sqlserver")]
mod odbc {
    use async_trait::async_trait;
    use odbc_api::{ConnectionOptions, Cursor, DataType, Environment, ResultSetMetadata};
    use serde_json::Value;

    use crate::db::table::{cell_from_text, TextAffinity};
    use crate::db::{DatabaseKind, DbError, QueryExecutor, ResultTable};

    /// Opens a fresh ODBC connection per statement on a blocking thread.
    pub(super) struct OdbcExecutor {
        connection_string: String,
    }

    impl OdbcExecutor {
        pub(super) fn new(connection_string: String) -> Self {
            Self { connection_string }
        }

        pub(super) async fn ping(&self) -> Result<(), DbError> {
            self.execute("SELECT 1").await.map(|_| ())
        }
    }

    #[async_trait]
    impl QueryExecutor for OdbcExecutor {
        fn kind(&self) -> DatabaseKind {
            DatabaseKind::SqlServer
        }

        async fn execute(&self, sql: &str) -> Result<ResultTable, DbError> {
            let connection_string = self.connection_string.clone();
            let sql = sql.to_string();
            tokio::task::spawn_blocking(move || run_query(&connection_string, &sql)).await?
        }
    }

    fn run_query(connection_string: &str, sql: &str) -> Result<ResultTable, DbError> {
        let env = Environment::new().map_err(|e| DbError::Connect(e.to_string()))?;
        let conn = env
            .connect_with_connection_string(connection_string, ConnectionOptions::default())
            .map_err(|e| DbError::Connect(e.to_string()))?;

        let mut table = ResultTable::default();
        let Some(mut cursor) = conn
            .execute(sql, (), None)
            .map_err(|e| DbError::Query(e.to_string()))?
        else {
            // Statement without a result set
            return Ok(table);
        };

        table.columns = cursor
            .column_names()
            .map_err(|e| DbError::Query(e.to_string()))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let affinities = (1..=table.columns.len())
            .map(|col| cursor.col_data_type(col as u16).map(affinity))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let mut buffer = Vec::new();
        while let Some(mut row) = cursor.next_row().map_err(|e| DbError::Query(e.to_string()))? {
            let mut values = Vec::with_capacity(table.columns.len());
            for col in 1..=table.columns.len() {
                buffer.clear();
                let present = row
                    .get_text(col as u16, &mut buffer)
                    .map_err(|e| DbError::Query(e.to_string()))?;
                values.push(if present {
                    cell_from_text(&String::from_utf8_lossy(&buffer), affinities[col - 1])
                } else {
                    Value::Null
                });
            }
            table.rows.push(values);
        }

        Ok(table)
    }

    fn affinity(data_type: DataType) -> TextAffinity {
        match data_type {
            DataType::TinyInt
            | DataType::SmallInt
            | DataType::Integer
            | DataType::BigInt
            | DataType::Real
            | DataType::Double
            | DataType::Float { .. }
            | DataType::Numeric { .. }
            | DataType::Decimal { .. } => TextAffinity::Numeric,
            DataType::Bit => TextAffinity::Boolean,
            _ => TextAffinity::Text,
        }
    }
}
