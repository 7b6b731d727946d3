use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rows returned by a query, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One object per row, keyed by column name
    pub fn records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(record)
            })
            .collect()
    }

    /// A pipe-separated sample used in prompts.
    pub fn preview(&self, max_rows: usize) -> String {
        let mut preview = self.columns.join(" | ");
        for row in self.rows.iter().take(max_rows) {
            preview.push('\n');
            let fields: Vec<String> = row.iter().map(field_text).collect();
            preview.push_str(&fields.join(" | "));
        }
        preview
    }

    /// Header row followed by one record per row; nulls become empty fields.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if !self.columns.is_empty() {
            writer.write_record(&self.columns)?;
        }
        for row in &self.rows {
            writer.write_record(row.iter().map(field_text))?;
        }
        writer.into_inner().map_err(|e| e.into_error().into())
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// What a column's declared type says about its text-protocol values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAffinity {
    Numeric,
    Boolean,
    Text,
}

/// Turns a text-protocol value into a JSON cell according to its column type.
/// Text columns stay strings even when their contents look numeric.
pub fn cell_from_text(text: &str, affinity: TextAffinity) -> Value {
    match affinity {
        TextAffinity::Text => Value::String(text.to_string()),
        TextAffinity::Boolean => match text {
            "t" | "true" | "1" => Value::Bool(true),
            "f" | "false" | "0" => Value::Bool(false),
            other => Value::String(other.to_string()),
        },
        TextAffinity::Numeric => {
            if let Ok(int) = text.parse::<i64>() {
                Value::from(int)
            } else if let Ok(uint) = text.parse::<u64>() {
                Value::from(uint)
            } else {
                text.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map_or_else(|| Value::String(text.to_string()), Value::Number)
            }
        }
    }
}
