use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;

use deck_audit_core::calculator::{compute_with_metadata, AggregationRule, ExpectedValues};
use deck_audit_core::types::{ComputationOutput, Granularity};

use crate::commands::CommandOutput;
use crate::input;

/// Arguments for listing expected values
#[derive(Args)]
pub struct ExpectedArgs {
    /// Source records: JSON array or CSV
    #[arg(long)]
    pub source: String,

    /// Period granularity to aggregate at
    #[arg(long, default_value = "monthly")]
    pub granularity: Granularity,
}

/// One expected value flattened for tabular output.
#[derive(Debug, Serialize)]
pub struct ExpectedRow {
    pub scope: String,
    pub slot: String,
    pub metric: &'static str,
    pub value: Decimal,
    pub rule: AggregationRule,
    pub contributors: usize,
}

pub fn rows(expected: &ExpectedValues) -> Vec<ExpectedRow> {
    expected
        .iter()
        .map(|ev| ExpectedRow {
            scope: ev.key.scope.to_string(),
            slot: ev.key.slot.to_string(),
            metric: ev.key.metric.name(),
            value: ev.value,
            rule: ev.rule,
            contributors: ev.contributors,
        })
        .collect()
}

pub fn run_expected(args: ExpectedArgs) -> Result<CommandOutput, Box<dyn std::error::Error>> {
    let records = input::file::read_records(&args.source)?;
    let out = compute_with_metadata(&records, args.granularity)?;

    let flattened = ComputationOutput {
        result: rows(&out.result),
        methodology: out.methodology,
        assumptions: out.assumptions,
        warnings: out.warnings,
        metadata: out.metadata,
    };
    Ok(serde_json::to_value(flattened)?.into())
}
