//! Vega-Lite charts built from model-written specifications.
//!
//! The model only picks the mark and encodings. The rows always come from the
//! executed query, so a chart never shows data the table does not.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::db::ResultTable;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// A complete Vega-Lite specification, ready for `vegaEmbed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chart(pub Value);

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Chart code is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Chart code is not a Vega-Lite specification")]
    NotASpec,

    #[error("Nothing to chart")]
    Empty,
}

pub fn render_chart(code: &str, table: &ResultTable) -> Result<Chart, ChartError> {
    let mut spec: Map<String, Value> = match serde_json::from_str::<Value>(code)? {
        Value::Object(spec) => spec,
        _ => return Err(ChartError::NotASpec),
    };

    if !spec.contains_key("mark") && !spec.contains_key("layer") {
        return Err(ChartError::NotASpec);
    }
    if table.is_empty() || table.columns.is_empty() {
        return Err(ChartError::Empty);
    }

    spec.insert("data".to_string(), json!({ "values": table.records() }));
    spec.entry("$schema")
        .or_insert_with(|| Value::String(VEGA_LITE_SCHEMA.to_string()));

    Ok(Chart(Value::Object(spec)))
}
