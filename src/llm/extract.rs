//! Pulling SQL and JSON out of free-form model output.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static STATEMENT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(select|with|insert|update|delete|create|alter|drop)\b")
        .expect("statement pattern is valid")
});

/// Extracts the SQL statement from a model response.
///
/// Tries a ```sql fence, then any ``` fence, then the first line starting
/// with a SQL keyword (continued until a fence or a terminating semicolon).
/// Falls back to the whole response.
pub fn extract_sql(content: &str) -> String {
    // Case-folding ASCII keeps byte offsets valid in `content`
    if let Some(start) = content.to_ascii_lowercase().find("```sql") {
        let body = &content[start + 6..];
        if let Some(end) = body.find("```") {
            debug!("Extracted SQL from sql code block");
            return body[..end].trim().to_string();
        }
    }

    if let Some(start) = content.find("```") {
        let body = &content[start + 3..];
        if let Some(end) = body.find("```") {
            debug!("Extracted SQL from plain code block");
            return body[..end].trim().to_string();
        }
    }

    let lines: Vec<&str> = content.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !STATEMENT_START.is_match(line) {
            continue;
        }

        let mut sql = line.trim().to_string();
        if !sql.ends_with(';') {
            for next in &lines[i + 1..] {
                let next = next.trim();
                if next.starts_with("```") {
                    break;
                }
                sql.push(' ');
                sql.push_str(next);
                if next.ends_with(';') {
                    break;
                }
            }
        }

        debug!("Extracted SQL by line scanning");
        return sql.trim().to_string();
    }

    debug!("No SQL markers found, using the full response");
    content.to_string()
}

/// The first complete JSON object in `content`, as written.
pub fn extract_json_object(content: &str) -> Option<&str> {
    for (start, _) in content.match_indices('{') {
        let rest = &content[start..];
        let mut stream =
            serde_json::Deserializer::from_str(rest).into_iter::<serde_json::Value>();
        if let Some(Ok(serde_json::Value::Object(_))) = stream.next() {
            return Some(&rest[..stream.byte_offset()]);
        }
    }
    None
}
