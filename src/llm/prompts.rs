use crate::db::ResultTable;

/// Rows shown to the model when asking for a chart
const CHART_SAMPLE_ROWS: usize = 10;

pub fn sql_prompt(question: &str, schema: &str) -> String {
    format!(
        r#"
### Instructions:
Your task is to convert a question into a SQL query, given a database schema.
Adhere to these rules:
- **Deliberately go through the question and database schema word by word** to appropriately answer the question
- **Use Table Aliases** to prevent ambiguity. For example, `SELECT table1.col1, table2.col1 FROM table1 JOIN table2 ON table1.id = table2.id`.
- **Use the exact spelling of table and column names as provided in the schema**
- When creating a ratio, always cast the numerator as float
- Return a single read-only statement

### Input:
Generate a SQL query that answers the question `{}`.
This query will run on a database whose schema is represented in this string:
{}

### Response:
Based on your instructions, here is the SQL query I have generated to answer the question `{}`:
```sql
"#,
        question, schema, question
    )
}

pub fn chart_prompt(question: &str, sql: &str, table: &ResultTable) -> String {
    format!(
        r#"
### Instructions:
Your task is to choose a chart for the result of a SQL query.
Adhere to these rules:
- Answer with a single Vega-Lite v5 specification as a JSON object
- Do not include a `data` property; the rows are attached afterwards
- Only reference these fields: {}
- Prefer a bar chart for categories and a line chart for dates

### Input:
The question was `{}`.
It was answered with this SQL:
{}

The result has {} rows. The first rows are:
{}

### Response:
```json
"#,
        table.columns.join(", "),
        question,
        sql,
        table.row_count(),
        table.preview(CHART_SAMPLE_ROWS)
    )
}
