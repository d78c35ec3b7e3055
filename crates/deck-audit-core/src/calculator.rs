use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::error::AuditError;
use crate::types::*;
use crate::AuditResult;

/// Share reported for a channel whose entity has no spend at all.
pub const ZERO_TOTAL_SHARE: Share = Decimal::ZERO;

/// Decimal places shares are displayed (and therefore rounded) to.
pub const SHARE_DECIMAL_PLACES: u32 = 1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One row of the ground-truth dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Campaign or product
    pub entity: String,
    /// Media channel; empty when the dataset has no channel split
    #[serde(default)]
    pub channel: String,
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impressions: Option<Count>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grps: Option<Count>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<Count>,
}

impl SourceRecord {
    pub fn metric(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::Spend => self.spend,
            Metric::Impressions => self.impressions,
            Metric::Grps => self.grps,
            Metric::Reach => self.reach,
        }
    }
}

/// How an expected value was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationRule {
    /// Taken from exactly one source row.
    Direct,
    Sum,
    CarryForward,
    WeightedShare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedValue {
    pub key: FieldKey,
    pub value: Decimal,
    pub rule: AggregationRule,
    /// Source rows folded into this value.
    pub contributors: usize,
}

/// Every expected figure for one dataset, keyed by semantic field.
#[derive(Debug, Clone, Default)]
pub struct ExpectedValues {
    values: BTreeMap<FieldKey, ExpectedValue>,
    periods: Vec<Period>,
}

impl ExpectedValues {
    pub fn get(&self, key: &FieldKey) -> Option<&ExpectedValue> {
        self.values.get(key)
    }

    pub fn value(&self, key: &FieldKey) -> Option<Decimal> {
        self.values.get(key).map(|v| v.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpectedValue> {
        self.values.values()
    }

    /// Periods present in the source, in calendar order.
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    fn insert(&mut self, key: FieldKey, value: Decimal, rule: AggregationRule, contributors: usize) {
        self.values.insert(
            key.clone(),
            ExpectedValue {
                key,
                value,
                rule,
                contributors,
            },
        );
    }
}

impl Serialize for ExpectedValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.values.values())
    }
}

/// Running sum plus the number of rows folded in.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    sum: Decimal,
    rows: usize,
}

impl Tally {
    fn add(&mut self, value: Decimal, rows: usize) {
        self.sum = self.sum.saturating_add(value);
        self.rows += rows;
    }
}

// ---------------------------------------------------------------------------
// Main calculation
// ---------------------------------------------------------------------------

/// Derive expected values for every field the report can display.
///
/// Produces per-channel and per-entity period values, row totals, all-entity
/// monthly totals, the grand total, carried-forward balances for every
/// scope, and channel spend shares. Sums are exact; only shares are rounded.
pub fn compute(records: &[SourceRecord], granularity: Granularity) -> AuditResult<ExpectedValues> {
    compute_inner(records, granularity, &mut Vec::new())
}

/// [`compute`] wrapped in the standard result envelope. Duplicate source rows
/// are summed and reported as warnings.
pub fn compute_with_metadata(
    records: &[SourceRecord],
    granularity: Granularity,
) -> AuditResult<ComputationOutput<ExpectedValues>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let expected = compute_inner(records, granularity, &mut warnings)?;

    let assumptions = serde_json::json!({
        "granularity": granularity,
        "records": records.len(),
        "share_rounding": "round half to even, 1 dp",
        "zero_total_share": ZERO_TOTAL_SHARE.to_string(),
    });
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Expected values: exact decimal sums per period, totals, carry-forward and spend share",
        &assumptions,
        warnings,
        elapsed,
        expected,
    ))
}

fn compute_inner(
    records: &[SourceRecord],
    granularity: Granularity,
    warnings: &mut Vec<String>,
) -> AuditResult<ExpectedValues> {
    validate_records(records)?;

    // (entity, channel, period, metric) -> tally of raw rows
    let mut cells: BTreeMap<(String, String, Period, Metric), Tally> = BTreeMap::new();
    for record in records {
        let period = granularity.bucket(record.period);
        for metric in Metric::ALL {
            if let Some(value) = record.metric(metric) {
                cells
                    .entry((record.entity.clone(), record.channel.clone(), period, metric))
                    .or_default()
                    .add(value, 1);
            }
        }
    }

    let periods: Vec<Period> = cells
        .keys()
        .map(|(_, _, p, _)| *p)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // scope -> metric -> period -> tally
    let mut series: BTreeMap<Scope, BTreeMap<Metric, BTreeMap<Period, Tally>>> = BTreeMap::new();
    for ((entity, channel, period, metric), tally) in &cells {
        if tally.rows > 1 && granularity == Granularity::Monthly {
            warnings.push(format!(
                "{} source rows summed for {entity}/{channel} {period} {}",
                tally.rows,
                metric.name()
            ));
        }
        let scopes = [
            Scope::Channel {
                entity: entity.clone(),
                channel: channel.clone(),
            },
            Scope::Entity(entity.clone()),
            Scope::All,
        ];
        for scope in scopes {
            series
                .entry(scope)
                .or_default()
                .entry(*metric)
                .or_default()
                .entry(*period)
                .or_default()
                .add(tally.sum, tally.rows);
        }
    }

    let mut out = ExpectedValues {
        values: BTreeMap::new(),
        periods: periods.clone(),
    };

    for (scope, by_metric) in &series {
        for (metric, by_period) in by_metric {
            let mut total = Tally::default();
            for (period, tally) in by_period {
                let slot = match scope {
                    Scope::All => Slot::MonthlyTotal(*period),
                    _ => Slot::Period(*period),
                };
                let rule = if tally.rows == 1 {
                    AggregationRule::Direct
                } else {
                    AggregationRule::Sum
                };
                out.insert(FieldKey::new(scope.clone(), slot, *metric), tally.sum, rule, tally.rows);
                total.add(tally.sum, tally.rows);
            }

            let total_slot = match scope {
                Scope::All => Slot::GrandTotal,
                _ => Slot::EntityTotal,
            };
            out.insert(
                FieldKey::new(scope.clone(), total_slot, *metric),
                total.sum,
                AggregationRule::Sum,
                total.rows,
            );

            // Balance brought forward into each period: everything strictly before it.
            let mut carried = Tally::default();
            for period in &periods {
                out.insert(
                    FieldKey::new(scope.clone(), Slot::CarriedForward(*period), *metric),
                    carried.sum,
                    AggregationRule::CarryForward,
                    carried.rows,
                );
                if let Some(tally) = by_period.get(period) {
                    carried.add(tally.sum, tally.rows);
                }
            }
        }
    }

    insert_spend_shares(&series, &mut out);

    Ok(out)
}

/// share(entity, channel) = spend(entity, channel) / spend(entity) * 100
fn insert_spend_shares(
    series: &BTreeMap<Scope, BTreeMap<Metric, BTreeMap<Period, Tally>>>,
    out: &mut ExpectedValues,
) {
    let spend_total = |scope: &Scope| -> Option<Tally> {
        series.get(scope).and_then(|m| m.get(&Metric::Spend)).map(|by_period| {
            let mut total = Tally::default();
            for tally in by_period.values() {
                total.add(tally.sum, tally.rows);
            }
            total
        })
    };

    for scope in series.keys() {
        let Scope::Channel { entity, .. } = scope else {
            continue;
        };
        let Some(part) = spend_total(scope) else {
            continue;
        };
        let whole = spend_total(&Scope::Entity(entity.clone())).unwrap_or_default();
        out.insert(
            FieldKey::new(scope.clone(), Slot::Share, Metric::Spend),
            share_percent(part.sum, whole.sum),
            AggregationRule::WeightedShare,
            whole.rows,
        );
    }
}

/// Percentage share rounded half-to-even to one decimal.
///
/// A zero denominator yields [`ZERO_TOTAL_SHARE`]; this is the only place
/// that policy is applied.
pub fn share_percent(part: Decimal, whole: Decimal) -> Share {
    if whole.is_zero() {
        return ZERO_TOTAL_SHARE;
    }
    match part.checked_div(whole).and_then(|ratio| ratio.checked_mul(dec!(100))) {
        Some(pct) => pct.round_dp_with_strategy(SHARE_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven),
        // saturate rather than panic when the ratio leaves the decimal range
        None if part.is_sign_negative() != whole.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    }
}

fn validate_records(records: &[SourceRecord]) -> AuditResult<()> {
    for (i, record) in records.iter().enumerate() {
        if record.entity.trim().is_empty() {
            return Err(AuditError::InvalidInput {
                field: format!("records[{i}].entity"),
                reason: "Entity must be non-empty".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
