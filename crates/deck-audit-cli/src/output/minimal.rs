use serde_json::Value;

use super::as_report;

/// Print just the answer: the verdict for an audit, one value per line for
/// anything else.
pub fn print_minimal(value: &Value) {
    if let Some(report) = as_report(value) {
        println!("{}", report.verdict);
        return;
    }

    match value.get("result").unwrap_or(value) {
        Value::Array(items) => {
            for item in items {
                println!("{}", summarize(item));
            }
        }
        other => println!("{}", format_minimal(other)),
    }
}

/// `value` when the item carries one, else the first field.
fn summarize(item: &Value) -> String {
    let Value::Object(map) = item else {
        return format_minimal(item);
    };
    for key in ["value", "error"] {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return format_minimal(val);
        }
    }
    map.values().next().map(format_minimal).unwrap_or_default()
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
