use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::comparator::Side;
use crate::parser::CellFormat;
use crate::types::{CellRef, FieldKey};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    PassWithWarnings,
    Fail,
    Fatal,
}

impl Verdict {
    /// 0 pass, 1 fail or pass-with-warnings, 2 fatal
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::PassWithWarnings | Verdict::Fail => 1,
            Verdict::Fatal => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "pass",
            Verdict::PassWithWarnings => "pass-with-warnings",
            Verdict::Fail => "fail",
            Verdict::Fatal => "fatal",
        })
    }
}

/// What the deck showed for a failing cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Observed {
    Value { value: Decimal },
    Absent,
    Unparseable { text: String, reason: String },
}

impl Observed {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Observed::Value { value } => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Value { value } => write!(f, "{value}"),
            Observed::Absent => f.write_str("(absent)"),
            Observed::Unparseable { text, .. } => write!(f, "'{text}' (unparseable)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    Mismatch,
    Missing(Side),
    Unparseable,
    /// The value agrees but is rendered in the wrong format, e.g. "100%" for spend.
    FormatMismatch(CellFormat),
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscrepancyKind::Mismatch => "mismatch",
            DiscrepancyKind::Missing(Side::Observed) => "missing (observed)",
            DiscrepancyKind::Missing(Side::Expected) => "missing (expected)",
            DiscrepancyKind::Unparseable => "unparseable",
            DiscrepancyKind::FormatMismatch(CellFormat::Currency) => "format mismatch (currency)",
            DiscrepancyKind::FormatMismatch(CellFormat::Percent) => "format mismatch (percent)",
            DiscrepancyKind::FormatMismatch(CellFormat::Number) => "format mismatch (number)",
            DiscrepancyKind::FormatMismatch(CellFormat::Placeholder) => "format mismatch (placeholder)",
        })
    }
}

/// One failed comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub cell: CellRef,
    pub field: FieldKey,
    pub kind: DiscrepancyKind,
    pub expected: Option<Decimal>,
    pub observed: Observed,
    /// expected - observed
    pub delta: Option<Decimal>,
    pub deviation_pct: Option<Decimal>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub cells_checked: usize,
    pub matched: usize,
    /// Value mismatches, unparseable cells and format mismatches together.
    pub mismatched: usize,
    pub missing: usize,
    /// Subset of `mismatched` whose text could not be parsed.
    pub unparseable: usize,
    /// Subset of `mismatched` whose display format does not suit the field.
    pub format_mismatch: usize,
    /// Cells outside any data field; never part of the verdict.
    pub unclassified: usize,
    pub critical: usize,
    pub warning: usize,
}

/// Finalized outcome of one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub verdict: Verdict,
    pub counts: Counts,
    pub discrepancies: Vec<Discrepancy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_reason: Option<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Pass | Verdict::PassWithWarnings)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// The open report while a run walks the grid.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    counts: Counts,
    discrepancies: Vec<Discrepancy>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_match(&mut self) {
        self.counts.cells_checked += 1;
        self.counts.matched += 1;
    }

    pub fn record_unclassified(&mut self, cells: usize) {
        self.counts.unclassified += cells;
    }

    pub fn record_discrepancy(&mut self, discrepancy: Discrepancy) {
        self.counts.cells_checked += 1;
        match discrepancy.kind {
            DiscrepancyKind::Mismatch => self.counts.mismatched += 1,
            DiscrepancyKind::Missing(_) => self.counts.missing += 1,
            DiscrepancyKind::Unparseable => {
                self.counts.mismatched += 1;
                self.counts.unparseable += 1;
            }
            DiscrepancyKind::FormatMismatch(_) => {
                self.counts.mismatched += 1;
                self.counts.format_mismatch += 1;
            }
        }
        match discrepancy.severity {
            Severity::Critical => self.counts.critical += 1,
            Severity::Warning => self.counts.warning += 1,
        }
        self.discrepancies.push(discrepancy);
    }

    /// Close the report and compute the verdict.
    pub fn finalize(mut self) -> ValidationReport {
        self.discrepancies.sort_by_key(|d| d.cell);
        let verdict = if self.counts.critical > 0 {
            Verdict::Fail
        } else if self.counts.warning > 0 {
            Verdict::PassWithWarnings
        } else {
            Verdict::Pass
        };
        ValidationReport {
            verdict,
            counts: self.counts,
            discrepancies: self.discrepancies,
            fatal_reason: None,
        }
    }

    /// Close the report as fatal. Partial results are discarded rather than
    /// presented as authoritative.
    pub fn abort(self, reason: impl Into<String>) -> ValidationReport {
        ValidationReport {
            verdict: Verdict::Fatal,
            counts: Counts::default(),
            discrepancies: Vec::new(),
            fatal_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metric, Scope, Slot};
    use rust_decimal_macros::dec;

    fn discrepancy(row: usize, kind: DiscrepancyKind, severity: Severity) -> Discrepancy {
        Discrepancy {
            cell: CellRef { table: 0, row, col: 2 },
            field: FieldKey::new(Scope::All, Slot::GrandTotal, Metric::Spend),
            kind,
            expected: Some(dec!(300)),
            observed: Observed::Value { value: dec!(250) },
            delta: Some(dec!(50)),
            deviation_pct: Some(dec!(16.67)),
            severity,
        }
    }

    #[test]
    fn test_empty_report_passes() {
        let report = ReportBuilder::new().finalize();
        assert_eq!(report.verdict, Verdict::Pass);
        assert!(report.passed());
        assert_eq!(report.verdict.exit_code(), 0);
    }

    #[test]
    fn test_warnings_only() {
        let mut b = ReportBuilder::new();
        b.record_match();
        b.record_discrepancy(discrepancy(1, DiscrepancyKind::Mismatch, Severity::Warning));
        let report = b.finalize();
        assert_eq!(report.verdict, Verdict::PassWithWarnings);
        assert_eq!(report.counts.cells_checked, 2);
        assert_eq!(report.counts.warning, 1);
        assert_eq!(report.verdict.exit_code(), 1);
    }

    #[test]
    fn test_critical_fails_and_counts_by_kind() {
        let mut b = ReportBuilder::new();
        b.record_discrepancy(discrepancy(5, DiscrepancyKind::Unparseable, Severity::Critical));
        b.record_discrepancy(discrepancy(
            2,
            DiscrepancyKind::Missing(Side::Observed),
            Severity::Warning,
        ));
        b.record_unclassified(7);
        let report = b.finalize();
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.counts.unparseable, 1);
        // an unparseable cell is a mismatch against its expected value
        assert_eq!(report.counts.mismatched, 1);
        assert_eq!(report.counts.missing, 1);
        assert_eq!(report.counts.unclassified, 7);
        // grid order
        assert_eq!(report.discrepancies[0].cell.row, 2);
    }

    #[test]
    fn test_format_mismatch_counts_as_mismatch() {
        let mut b = ReportBuilder::new();
        b.record_discrepancy(discrepancy(
            1,
            DiscrepancyKind::FormatMismatch(CellFormat::Percent),
            Severity::Warning,
        ));
        let report = b.finalize();
        assert_eq!(report.verdict, Verdict::PassWithWarnings);
        assert_eq!(report.counts.mismatched, 1);
        assert_eq!(report.counts.format_mismatch, 1);
        assert_eq!(report.counts.unparseable, 0);
        assert_eq!(report.discrepancies[0].kind.to_string(), "format mismatch (percent)");
    }

    #[test]
    fn test_abort_discards_partial_results() {
        let mut b = ReportBuilder::new();
        b.record_discrepancy(discrepancy(1, DiscrepancyKind::Mismatch, Severity::Critical));
        let report = b.abort("source dataset missing");
        assert_eq!(report.verdict, Verdict::Fatal);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.fatal_reason.as_deref(), Some("source dataset missing"));
        assert_eq!(report.verdict.exit_code(), 2);
    }
}
