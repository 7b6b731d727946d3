use crate::db::{DatabaseKind, ResultTable};

/// Catalog query returning `(table, column, type)` rows for a database kind.
pub fn catalog_query(kind: DatabaseKind) -> &'static str {
    match kind {
        DatabaseKind::Demo => {
            "SELECT m.name AS table_name, p.name AS column_name, p.type AS data_type \
             FROM sqlite_master m JOIN pragma_table_info(m.name) p \
             WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%' \
             ORDER BY m.name, p.cid"
        }
        DatabaseKind::MySql => {
            "SELECT table_name, column_name, data_type \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() \
             ORDER BY table_name, ordinal_position"
        }
        DatabaseKind::PostgreSql => {
            "SELECT table_schema || '.' || table_name, column_name, data_type \
             FROM information_schema.columns \
             WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
             ORDER BY table_schema, table_name, ordinal_position"
        }
        DatabaseKind::SqlServer => {
            "SELECT TABLE_SCHEMA + '.' + TABLE_NAME, COLUMN_NAME, DATA_TYPE \
             FROM INFORMATION_SCHEMA.COLUMNS \
             ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION"
        }
    }
}

/// Renders catalog rows as the markdown document given to the model.
pub fn format_schema(catalog: &ResultTable) -> String {
    let mut metadata = String::from("# DATABASE SCHEMA\n\n");

    if catalog.is_empty() {
        metadata.push_str("No tables found in this database.\n");
        return metadata;
    }

    let mut current_table: Option<String> = None;
    for row in &catalog.rows {
        let field = |i: usize| match row.get(i) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let table = field(0);

        if current_table.as_deref() != Some(table.as_str()) {
            if current_table.is_some() {
                metadata.push('\n');
            }
            metadata.push_str(&format!("### Table: {}\n\n", table));
            metadata.push_str("| Column Name | Data Type |\n");
            metadata.push_str("|------------|-----------|\n");
            current_table = Some(table);
        }

        metadata.push_str(&format!("| {} | {} |\n", field(1), field(2)));
    }

    metadata
}
