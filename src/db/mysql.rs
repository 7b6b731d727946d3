use async_trait::async_trait;
use mysql_async::{consts::ColumnType, prelude::*, Conn, OptsBuilder, Row, Value};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::table::{cell_from_text, TextAffinity};
use crate::db::{
    ConnectionProfile, Connector, DatabaseKind, DbError, QueryExecutor, ResultTable,
};

pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn QueryExecutor>, DbError> {
        let executor = MySqlExecutor {
            opts: build_mysql_opts(profile),
        };

        // Round trip before reporting success
        let mut conn = executor.open().await?;
        conn.ping()
            .await
            .map_err(|e| DbError::Connect(format!("Failed to ping MySQL: {}", e)))?;
        close(conn).await;

        info!("Connected to MySQL at {}:{}", profile.host, profile.port);
        Ok(Arc::new(executor))
    }
}

/// Opens a fresh connection per statement from the stored options.
struct MySqlExecutor {
    opts: OptsBuilder,
}

impl MySqlExecutor {
    async fn open(&self) -> Result<Conn, DbError> {
        Conn::new(self.opts.clone())
            .await
            .map_err(|e| DbError::Connect(format!("Failed to connect to MySQL: {}", e)))
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    async fn execute(&self, sql: &str) -> Result<ResultTable, DbError> {
        let mut conn = self.open().await?;

        let table = {
            let mut result = conn
                .query_iter(sql)
                .await
                .map_err(|e| DbError::Query(e.to_string()))?;

            let columns = result.columns_ref();
            let mut table = ResultTable::new(
                columns
                    .iter()
                    .map(|column| column.name_str().into_owned())
                    .collect(),
            );
            let affinities: Vec<TextAffinity> = columns
                .iter()
                .map(|column| affinity(column.column_type()))
                .collect();

            let rows: Vec<Row> = result
                .collect()
                .await
                .map_err(|e| DbError::Query(e.to_string()))?;
            result
                .drop_result()
                .await
                .map_err(|e| DbError::Query(e.to_string()))?;

            table.rows = rows
                .into_iter()
                .map(|row| row_to_json(row, &affinities))
                .collect();
            table
        };

        close(conn).await;
        Ok(table)
    }
}

fn build_mysql_opts(profile: &ConnectionProfile) -> OptsBuilder {
    OptsBuilder::default()
        .ip_or_hostname(profile.host.clone())
        .tcp_port(profile.port)
        .user(Some(profile.username.clone()))
        .pass(Some(profile.password.clone()))
        .db_name(Some(profile.database.clone()))
}

async fn close(conn: Conn) {
    if let Err(e) = conn.disconnect().await {
        warn!("Failed to disconnect from MySQL: {}", e);
    }
}

fn affinity(column_type: ColumnType) -> TextAffinity {
    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR
        | ColumnType::MYSQL_TYPE_FLOAT
        | ColumnType::MYSQL_TYPE_DOUBLE
        | ColumnType::MYSQL_TYPE_DECIMAL
        | ColumnType::MYSQL_TYPE_NEWDECIMAL => TextAffinity::Numeric,
        _ => TextAffinity::Text,
    }
}

// Row::unwrap takes the owned values; it cannot panic
fn row_to_json(row: Row, affinities: &[TextAffinity]) -> Vec<JsonValue> {
    row.unwrap()
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            let affinity = affinities.get(idx).copied().unwrap_or(TextAffinity::Text);
            mysql_value_to_json(value, affinity)
        })
        .collect()
}

// The text protocol delivers most values as bytes
fn mysql_value_to_json(value: Value, affinity: TextAffinity) -> JsonValue {
    match value {
        Value::NULL => JsonValue::Null,
        Value::Bytes(bytes) => cell_from_text(&String::from_utf8_lossy(&bytes), affinity),
        Value::Int(i) => JsonValue::from(i),
        Value::UInt(u) => JsonValue::from(u),
        Value::Float(f) => serde_json::Number::from_f64(f64::from(f))
            .map_or(JsonValue::Null, JsonValue::Number),
        Value::Double(d) => serde_json::Number::from_f64(d)
            .map_or(JsonValue::Null, JsonValue::Number),
        Value::Date(year, month, day, hour, minute, second, _micros) => JsonValue::String(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        )),
        Value::Time(negative, days, hours, minutes, seconds, _micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = u32::from(hours) + days * 24;
            JsonValue::String(format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_protocol_values() {
        use TextAffinity::{Numeric, Text};
        assert_eq!(mysql_value_to_json(Value::NULL, Text), json!(null));
        assert_eq!(mysql_value_to_json(Value::Bytes(b"42".to_vec()), Numeric), json!(42));
        assert_eq!(mysql_value_to_json(Value::Bytes(b"AC/DC".to_vec()), Text), json!("AC/DC"));
        assert_eq!(mysql_value_to_json(Value::Int(-7), Text), json!(-7));
        assert_eq!(mysql_value_to_json(Value::Double(0.5), Text), json!(0.5));
        assert_eq!(
            mysql_value_to_json(Value::Date(2009, 1, 2, 0, 0, 0, 0), Text),
            json!("2009-01-02 00:00:00")
        );
        assert_eq!(
            mysql_value_to_json(Value::Time(true, 1, 2, 3, 4, 0), Text),
            json!("-26:03:04")
        );
    }

    #[test]
    fn numeric_looking_varchar_stays_text() {
        let varchar = affinity(ColumnType::MYSQL_TYPE_VAR_STRING);
        assert_eq!(varchar, TextAffinity::Text);
        assert_eq!(
            mysql_value_to_json(Value::Bytes(b"12345".to_vec()), varchar),
            json!("12345")
        );

        let decimal = affinity(ColumnType::MYSQL_TYPE_NEWDECIMAL);
        assert_eq!(mysql_value_to_json(Value::Bytes(b"9.99".to_vec()), decimal), json!(9.99));
    }

    #[test]
    fn options_carry_profile() {
        let profile = ConnectionProfile {
            name: None,
            kind: DatabaseKind::MySql,
            host: "db.internal".to_string(),
            port: 3307,
            database: "sales".to_string(),
            username: "app".to_string(),
            password: "secret".to_string(),
        };
        let opts = mysql_async::Opts::from(build_mysql_opts(&profile));
        assert_eq!(opts.ip_or_hostname(), "db.internal");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.db_name(), Some("sales"));
        assert_eq!(opts.user(), Some("app"));
    }
}
