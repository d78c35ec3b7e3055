use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calculator::{compute_with_metadata, ExpectedValues, SourceRecord};
use crate::classifier::{classify, DisplayedGrid, GridClassification};
use crate::comparator::{compare, grade, Outcome};
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::parser::parse_display;
use crate::report::{Discrepancy, DiscrepancyKind, Observed, ReportBuilder, Severity, ValidationReport};
use crate::types::{with_metadata, ComputationOutput};
use crate::AuditResult;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Supplies the ground-truth records. Consumed by the run, so whatever it
/// holds open is released before the run returns.
pub trait SourceProvider {
    fn load_records(self) -> AuditResult<Vec<SourceRecord>>;
}

/// Supplies the extracted tables of the rendered report.
pub trait GridProvider {
    fn load_grid(self) -> AuditResult<DisplayedGrid>;
}

impl SourceProvider for Vec<SourceRecord> {
    fn load_records(self) -> AuditResult<Vec<SourceRecord>> {
        Ok(self)
    }
}

impl SourceProvider for AuditResult<Vec<SourceRecord>> {
    fn load_records(self) -> AuditResult<Vec<SourceRecord>> {
        self
    }
}

impl GridProvider for DisplayedGrid {
    fn load_grid(self) -> AuditResult<DisplayedGrid> {
        Ok(self)
    }
}

impl GridProvider for AuditResult<DisplayedGrid> {
    fn load_grid(self) -> AuditResult<DisplayedGrid> {
        self
    }
}

/// Life cycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Loading,
    Walking,
    Finalized,
}

/// Receives progress and findings as a run proceeds.
pub trait ReportSink {
    fn phase(&mut self, _state: RunState) {}
    fn discrepancy(&mut self, _discrepancy: &Discrepancy) {}
    fn fatal(&mut self, _reason: &str) {}
}

/// Forwards run events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn phase(&mut self, state: RunState) {
        tracing::info!(?state, "audit phase");
    }

    fn discrepancy(&mut self, d: &Discrepancy) {
        tracing::warn!(
            cell = %d.cell,
            field = %d.field,
            severity = ?d.severity,
            kind = ?d.kind,
            expected = ?d.expected,
            observed = %d.observed,
            "discrepancy"
        );
    }

    fn fatal(&mut self, reason: &str) {
        tracing::error!(reason, "audit aborted");
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub phases: Vec<RunState>,
    pub discrepancies: Vec<Discrepancy>,
    pub fatal: Option<String>,
}

impl ReportSink for CollectingSink {
    fn phase(&mut self, state: RunState) {
        self.phases.push(state);
    }

    fn discrepancy(&mut self, discrepancy: &Discrepancy) {
        self.discrepancies.push(discrepancy.clone());
    }

    fn fatal(&mut self, reason: &str) {
        self.fatal = Some(reason.to_string());
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives one audit: load, compute expectations, walk the grid, finalize.
pub struct Auditor<K: ReportSink = TracingSink> {
    config: AuditConfig,
    sink: K,
    state: RunState,
}

impl Auditor<TracingSink> {
    pub fn new(config: AuditConfig) -> Self {
        Self::with_sink(config, TracingSink)
    }
}

impl<K: ReportSink> Auditor<K> {
    pub fn with_sink(config: AuditConfig, sink: K) -> Self {
        Self {
            config,
            sink,
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Audit one rendered report against one source dataset.
    ///
    /// Never returns an error: load failures produce a `Fatal` verdict and
    /// every per-cell problem is recorded in the report.
    pub fn run<S: SourceProvider, G: GridProvider>(
        &mut self,
        source: S,
        grid: G,
    ) -> ComputationOutput<ValidationReport> {
        let start = Instant::now();
        self.state = RunState::Init;
        let mut warnings: Vec<String> = Vec::new();
        let builder = ReportBuilder::new();

        self.enter(RunState::Loading);
        let (expected, displayed) = match self.load(source, grid, &mut warnings) {
            Ok(loaded) => loaded,
            Err(e) => return self.finish(builder.abort(e.to_string()), warnings, start),
        };

        self.enter(RunState::Walking);
        let classification = classify(&displayed, &self.config);
        warnings.extend(classification.warnings().cloned());

        let report = match self.walk(&classification, &expected, builder) {
            Ok(builder) => builder.finalize(),
            Err((builder, reason)) => builder.abort(reason),
        };
        self.finish(report, warnings, start)
    }

    fn enter(&mut self, state: RunState) {
        self.state = state;
        self.sink.phase(state);
    }

    fn load<S: SourceProvider, G: GridProvider>(
        &self,
        source: S,
        grid: G,
        warnings: &mut Vec<String>,
    ) -> AuditResult<(ExpectedValues, DisplayedGrid)> {
        self.config.validate()?;

        let records = source.load_records()?;
        if records.is_empty() {
            return Err(AuditError::Load {
                source_name: "source dataset".into(),
                reason: "no records".into(),
            });
        }
        let displayed = grid.load_grid()?;
        if displayed.tables.is_empty() {
            return Err(AuditError::Load {
                source_name: "displayed grid".into(),
                reason: "no tables".into(),
            });
        }

        // The whole dataset is aggregated before any comparison starts.
        let expected = compute_with_metadata(&records, self.config.granularity)?;
        warnings.extend(expected.warnings);
        Ok((expected.result, displayed))
    }

    /// Visit every classified cell once, in table, row, column order.
    fn walk(
        &mut self,
        classification: &GridClassification,
        expected: &ExpectedValues,
        mut builder: ReportBuilder,
    ) -> Result<ReportBuilder, (ReportBuilder, String)> {
        let policy = self.config.tolerances;

        for table in &classification.tables {
            builder.record_unclassified(table.unclassified_count());

            for (cell, field) in table.classified() {
                let kind = field.kind();
                let expected_value = expected.value(field);

                let parsed = match parse_display(&cell.text) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        let reason = match e {
                            AuditError::Parse { reason, .. } => reason,
                            other => other.to_string(),
                        };
                        if self.config.fatal_on_unparseable {
                            let message = format!("{}: unparseable '{}' ({reason})", cell.cell, cell.text);
                            return Err((builder, message));
                        }
                        let discrepancy = Discrepancy {
                            cell: cell.cell,
                            field: field.clone(),
                            kind: DiscrepancyKind::Unparseable,
                            expected: expected_value,
                            observed: Observed::Unparseable {
                                text: cell.text.clone(),
                                reason,
                            },
                            delta: None,
                            deviation_pct: None,
                            severity: policy.missing.unparseable,
                        };
                        self.sink.discrepancy(&discrepancy);
                        builder.record_discrepancy(discrepancy);
                        continue;
                    }
                };

                let observed_value = parsed.value();
                let format = parsed.format();
                let outcome = compare(expected_value, observed_value, kind, &policy);
                // a wrong value outranks a wrong format on the same cell
                let (discrepancy_kind, delta, deviation_pct, severity) = match &outcome {
                    Outcome::Match if format.suits(kind) => {
                        builder.record_match();
                        continue;
                    }
                    Outcome::Match => (
                        DiscrepancyKind::FormatMismatch(format),
                        None,
                        None,
                        policy.missing.format_mismatch,
                    ),
                    Outcome::Mismatch {
                        delta,
                        deviation_pct,
                    } => (
                        DiscrepancyKind::Mismatch,
                        Some(*delta),
                        *deviation_pct,
                        grade(&outcome, expected_value, observed_value, kind, &policy)
                            .unwrap_or(Severity::Critical),
                    ),
                    Outcome::Missing { absent } => (
                        DiscrepancyKind::Missing(*absent),
                        None,
                        None,
                        grade(&outcome, expected_value, observed_value, kind, &policy)
                            .unwrap_or(Severity::Critical),
                    ),
                };
                let discrepancy = Discrepancy {
                    cell: cell.cell,
                    field: field.clone(),
                    kind: discrepancy_kind,
                    expected: expected_value,
                    observed: match observed_value {
                        Some(value) => Observed::Value { value },
                        None => Observed::Absent,
                    },
                    delta,
                    deviation_pct,
                    severity,
                };
                self.sink.discrepancy(&discrepancy);
                builder.record_discrepancy(discrepancy);
            }
        }

        Ok(builder)
    }

    fn finish(
        &mut self,
        report: ValidationReport,
        warnings: Vec<String>,
        start: Instant,
    ) -> ComputationOutput<ValidationReport> {
        if let Some(reason) = &report.fatal_reason {
            self.sink.fatal(reason);
        }
        self.enter(RunState::Finalized);

        let assumptions = serde_json::json!({
            "granularity": self.config.granularity,
            "tolerances": self.config.tolerances,
            "fatal_on_unparseable": self.config.fatal_on_unparseable,
        });
        let elapsed = start.elapsed().as_micros() as u64;
        with_metadata(
            "Deck reconciliation: independent decimal aggregation, display parsing, tolerance comparison",
            &assumptions,
            warnings,
            elapsed,
            report,
        )
    }
}

/// Run one audit with the tracing sink.
pub fn audit<S: SourceProvider, G: GridProvider>(
    source: S,
    grid: G,
    config: AuditConfig,
) -> ComputationOutput<ValidationReport> {
    Auditor::new(config).run(source, grid)
}
