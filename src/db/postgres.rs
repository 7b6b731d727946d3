use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::{types::Type, Client, Config, NoTls, SimpleQueryMessage};
use tracing::{info, warn};

use crate::db::table::{cell_from_text, TextAffinity};
use crate::db::{
    ConnectionProfile, Connector, DatabaseKind, DbError, QueryExecutor, ResultTable,
};

pub struct PostgresConnector;

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn QueryExecutor>, DbError> {
        let executor = PostgresExecutor {
            config: build_pg_config(profile),
        };

        // Round trip before reporting success
        let client = executor.open().await?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| DbError::Connect(format!("Failed to query PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL at {}:{}", profile.host, profile.port);
        Ok(Arc::new(executor))
    }
}

/// Opens a fresh connection per statement from the stored config.
struct PostgresExecutor {
    config: Config,
}

impl PostgresExecutor {
    async fn open(&self) -> Result<Client, DbError> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| DbError::Connect(format!("Failed to connect to PostgreSQL: {}", e)))?;

        // The connection object drives the socket until the client is dropped
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(client)
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::PostgreSql
    }

    async fn execute(&self, sql: &str) -> Result<ResultTable, DbError> {
        let client = self.open().await?;

        // Names and types survive an empty result only through a prepared statement
        let columns = match client.prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|column| (column.name().to_string(), affinity(column.type_())))
                .collect(),
            Err(_) => Vec::new(),
        };

        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(collect_rows(columns, messages))
    }
}

fn build_pg_config(profile: &ConnectionProfile) -> Config {
    let mut config = Config::new();
    config
        .host(&profile.host)
        .port(profile.port)
        .user(&profile.username)
        .password(&profile.password)
        .dbname(&profile.database);
    config
}

fn affinity(ty: &Type) -> TextAffinity {
    let numeric = [
        Type::INT2,
        Type::INT4,
        Type::INT8,
        Type::OID,
        Type::FLOAT4,
        Type::FLOAT8,
        Type::NUMERIC,
    ];
    if numeric.contains(ty) {
        TextAffinity::Numeric
    } else if *ty == Type::BOOL {
        TextAffinity::Boolean
    } else {
        TextAffinity::Text
    }
}

/// Without prepared column types every value is kept as text.
fn collect_rows(
    columns: Vec<(String, TextAffinity)>,
    messages: Vec<SimpleQueryMessage>,
) -> ResultTable {
    let (names, affinities): (Vec<String>, Vec<TextAffinity>) = columns.into_iter().unzip();
    let mut table = ResultTable::new(names);

    for message in messages {
        if let SimpleQueryMessage::Row(row) = message {
            if table.columns.is_empty() {
                table.columns = row
                    .columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect();
            }
            let values = (0..row.len())
                .map(|idx| {
                    let affinity = affinities.get(idx).copied().unwrap_or(TextAffinity::Text);
                    row.get(idx)
                        .map_or(serde_json::Value::Null, |text| cell_from_text(text, affinity))
                })
                .collect();
            table.rows.push(values);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_postgres::config::Host;

    #[test]
    fn config_carries_profile() {
        let profile = ConnectionProfile {
            name: Some("prod".to_string()),
            kind: DatabaseKind::PostgreSql,
            host: "db.internal".to_string(),
            port: 5433,
            database: "sales".to_string(),
            username: "app".to_string(),
            password: "secret".to_string(),
        };

        let config = build_pg_config(&profile);
        assert_eq!(config.get_hosts(), &[Host::Tcp("db.internal".to_string())]);
        assert_eq!(config.get_ports(), &[5433]);
        assert_eq!(config.get_dbname(), Some("sales"));
        assert_eq!(config.get_user(), Some("app"));
        assert_eq!(config.get_password(), Some("secret".as_bytes()));
    }

    #[test]
    fn no_messages_keep_prepared_columns() {
        let table = collect_rows(vec![("count".to_string(), TextAffinity::Numeric)], Vec::new());
        assert_eq!(table.columns, vec!["count"]);
        assert!(table.is_empty());
    }

    #[test]
    fn column_types_decide_affinity() {
        assert_eq!(affinity(&Type::INT8), TextAffinity::Numeric);
        assert_eq!(affinity(&Type::NUMERIC), TextAffinity::Numeric);
        assert_eq!(affinity(&Type::BOOL), TextAffinity::Boolean);
        assert_eq!(affinity(&Type::VARCHAR), TextAffinity::Text);
        assert_eq!(affinity(&Type::TEXT), TextAffinity::Text);
    }
}
