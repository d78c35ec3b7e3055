use serde_json::Value;
use std::io;

use deck_audit_core::report::ValidationReport;

use super::as_report;

/// Columns of the discrepancy export.
pub const DISCREPANCY_COLUMNS: [&str; 12] = [
    "table",
    "row",
    "col",
    "scope",
    "slot",
    "metric",
    "kind",
    "expected",
    "observed",
    "delta",
    "deviation_pct",
    "severity",
];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    if let Some(report) = as_report(value) {
        let _ = wtr.write_record(DISCREPANCY_COLUMNS);
        for row in discrepancy_rows(&report) {
            let _ = wtr.write_record(&row);
        }
    } else {
        match value.get("result") {
            Some(Value::Array(rows)) => write_array_csv(&mut wtr, rows),
            Some(Value::Object(result)) => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in result {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
            _ => {
                let _ = wtr.write_record([&format_csv_value(value)]);
            }
        }
    }

    let _ = wtr.flush();
}

/// One record per discrepancy, in report order.
pub fn discrepancy_rows(report: &ValidationReport) -> Vec<[String; 12]> {
    report
        .discrepancies
        .iter()
        .map(|d| {
            let observed = match d.observed.value() {
                Some(v) => v.to_string(),
                None => d.observed.to_string(),
            };
            [
                d.cell.table.to_string(),
                d.cell.row.to_string(),
                d.cell.col.to_string(),
                d.field.scope.to_string(),
                d.field.slot.to_string(),
                d.field.metric.name().to_string(),
                d.kind.to_string(),
                d.expected.map(|v| v.to_string()).unwrap_or_default(),
                observed,
                d.delta.map(|v| v.to_string()).unwrap_or_default(),
                d.deviation_pct.map(|v| v.to_string()).unwrap_or_default(),
                d.severity.to_string(),
            ]
        })
        .collect()
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_audit_core::comparator::Side;
    use deck_audit_core::report::{Discrepancy, DiscrepancyKind, Observed, ReportBuilder, Severity};
    use deck_audit_core::types::{CellRef, FieldKey, Metric, Period, Scope, Slot};
    use rust_decimal_macros::dec;

    #[test]
    fn test_discrepancy_rows() {
        let mut builder = ReportBuilder::new();
        builder.record_discrepancy(Discrepancy {
            cell: CellRef { table: 0, row: 4, col: 3 },
            field: FieldKey::new(Scope::All, Slot::GrandTotal, Metric::Spend),
            kind: DiscrepancyKind::Mismatch,
            expected: Some(dec!(300)),
            observed: Observed::Value { value: dec!(250.00) },
            delta: Some(dec!(50.00)),
            deviation_pct: Some(dec!(16.67)),
            severity: Severity::Critical,
        });
        builder.record_discrepancy(Discrepancy {
            cell: CellRef { table: 0, row: 1, col: 2 },
            field: FieldKey::new(Scope::Entity("Alpha".into()), Slot::Period(Period::Month(2)), Metric::Spend),
            kind: DiscrepancyKind::Missing(Side::Observed),
            expected: Some(dec!(200)),
            observed: Observed::Absent,
            delta: None,
            deviation_pct: None,
            severity: Severity::Critical,
        });
        let rows = discrepancy_rows(&builder.finalize());

        assert_eq!(
            rows[0],
            ["0", "1", "2", "Alpha", "Feb", "spend", "missing (observed)", "200", "(absent)", "", "", "critical"]
                .map(String::from)
        );
        assert_eq!(rows[1][3], "ALL");
        assert_eq!(rows[1][4], "grand total");
        assert_eq!(rows[1][8], "250.00");
        assert_eq!(rows[1][9], "50.00");
    }

    #[test]
    fn test_report_detected_in_envelope() {
        let report = ReportBuilder::new().finalize();
        let envelope = serde_json::json!({ "result": report, "warnings": [] });
        assert!(as_report(&envelope).is_some());
        assert!(as_report(&serde_json::json!({ "result": [] })).is_none());
    }
}
