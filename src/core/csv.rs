//! Plain CSV export of an in-memory result set.
//!
//! Values are joined with commas and never quoted, so output is only
//! well-formed when no value contains a comma or a newline.

use serde::Serialize;
use serde_json::Value;

/// Columns dropped when the caller asks for the trimmed export
pub const CSV_EXCLUDED_COLUMNS: [&str; 2] = ["latitude", "longitude"];

/// Header from the first record's field names, then one line per record
pub fn to_csv<T: Serialize>(rows: &[T], excluded: &[&str]) -> Result<String, serde_json::Error> {
    let records = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let header: Vec<String> = match records.first() {
        Some(Value::Object(first)) => first
            .keys()
            .filter(|k| !excluded.contains(&k.as_str()))
            .cloned()
            .collect(),
        _ => return Ok(String::new()),
    };

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(header.join(","));

    for record in &records {
        let line = header
            .iter()
            .map(|column| render_cell(record.get(column)))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    Ok(lines.join("\n"))
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
