use colored::Colorize;
use serde_json::Value;
use tabled::{builder::Builder, Table};

use deck_audit_core::report::{Severity, ValidationReport, Verdict};

use super::as_report;

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    if let Some(report) = as_report(value) {
        print_report(&report);
        print_envelope_notes(value);
        return;
    }

    match value.get("result") {
        Some(Value::Array(rows)) => {
            print_array_table(rows);
            print_envelope_notes(value);
        }
        Some(Value::Object(res_map)) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in res_map {
                builder.push_record([key.as_str(), &format_value(val)]);
            }
            println!("{}", Table::from(builder));
            print_envelope_notes(value);
        }
        _ => println!("{}", format_value(value)),
    }
}

fn print_report(report: &ValidationReport) {
    let verdict = report.verdict.to_string();
    let verdict = match report.verdict {
        Verdict::Pass => verdict.green().bold(),
        Verdict::PassWithWarnings => verdict.yellow().bold(),
        Verdict::Fail | Verdict::Fatal => verdict.red().bold(),
    };
    println!("Verdict: {}", verdict);
    if let Some(reason) = &report.fatal_reason {
        println!("Reason:  {}", reason);
    }

    let c = &report.counts;
    let mut builder = Builder::default();
    builder.push_record(["Checked", "Matched", "Mismatched", "Missing", "Unparseable", "Format", "Unclassified", "Critical", "Warning"]);
    builder.push_record(
        [
            c.cells_checked,
            c.matched,
            c.mismatched,
            c.missing,
            c.unparseable,
            c.format_mismatch,
            c.unclassified,
            c.critical,
            c.warning,
        ]
        .map(|n| n.to_string()),
    );
    println!("{}", Table::from(builder));

    if report.discrepancies.is_empty() {
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(["Cell", "Field", "Kind", "Expected", "Observed", "Delta", "Severity"]);
    for d in &report.discrepancies {
        let severity = match d.severity {
            Severity::Critical => d.severity.to_string().red().to_string(),
            Severity::Warning => d.severity.to_string().yellow().to_string(),
        };
        builder.push_record([
            d.cell.to_string(),
            d.field.to_string(),
            d.kind.to_string(),
            d.expected.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            d.observed.to_string(),
            d.delta.map(|v| v.to_string()).unwrap_or_default(),
            severity,
        ]);
    }
    println!("\n{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &Value) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
