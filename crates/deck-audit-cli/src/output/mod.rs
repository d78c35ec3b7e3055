pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use deck_audit_core::report::ValidationReport;
use serde_json::Value;

use crate::OutputFormat;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The validation report inside an envelope, if this output carries one.
pub(crate) fn as_report(value: &Value) -> Option<ValidationReport> {
    let result = value.get("result")?;
    result.get("verdict")?;
    serde_json::from_value(result.clone()).ok()
}
