use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::report::Severity;
use crate::types::MetricKind;
use crate::AuditResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Absolute and relative epsilon for one metric class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleranceRule {
    pub absolute: Decimal,
    pub relative: Decimal,
}

impl ToleranceRule {
    pub const fn new(absolute: Decimal, relative: Decimal) -> Self {
        Self { absolute, relative }
    }

    /// max(absolute, relative * |magnitude|)
    pub fn allowance(&self, magnitude: Decimal) -> Decimal {
        self.absolute.max(self.relative.saturating_mul(magnitude.abs()))
    }
}

/// Extra room above the tolerance within which a mismatch is only a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBand {
    pub absolute: Decimal,
    pub relative: Decimal,
}

impl SeverityBand {
    pub fn width(&self, magnitude: Decimal) -> Decimal {
        self.absolute.max(self.relative.saturating_mul(magnitude.abs()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityBands {
    pub currency: SeverityBand,
    pub share: SeverityBand,
    pub count: SeverityBand,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            currency: SeverityBand {
                absolute: dec!(10),
                relative: Decimal::ZERO,
            },
            // one display rounding step
            share: SeverityBand {
                absolute: dec!(0.1),
                relative: Decimal::ZERO,
            },
            count: SeverityBand {
                absolute: Decimal::ZERO,
                relative: dec!(0.01),
            },
        }
    }
}

/// How placeholders, unreadable cells and misformatted cells are graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingPolicy {
    /// A placeholder shown where the expected value is within tolerance of
    /// zero counts as a match.
    pub absent_equals_zero: bool,
    /// Severity when the deck shows a placeholder for a non-zero expectation.
    pub observed_absent: Severity,
    /// Severity when the deck shows a figure the source data cannot account for.
    pub expected_absent: Severity,
    pub unparseable: Severity,
    /// Severity when a value agrees but is rendered in a format the field never uses.
    pub format_mismatch: Severity,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        Self {
            absent_equals_zero: true,
            observed_absent: Severity::Critical,
            expected_absent: Severity::Critical,
            unparseable: Severity::Critical,
            format_mismatch: Severity::Warning,
        }
    }
}

/// Per-metric-class comparison thresholds. Pure lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TolerancePolicy {
    pub currency: ToleranceRule,
    pub share: ToleranceRule,
    pub count: ToleranceRule,
    pub bands: SeverityBands,
    pub missing: MissingPolicy,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            // sub-unit rounding, plus headroom for large aggregates
            currency: ToleranceRule::new(dec!(0.5), dec!(0.0001)),
            // single-decimal display rounding; shares are bounded so no relative part
            share: ToleranceRule::new(dec!(0.1), Decimal::ZERO),
            count: ToleranceRule::new(Decimal::ZERO, dec!(0.005)),
            bands: SeverityBands::default(),
            missing: MissingPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

impl TolerancePolicy {
    pub fn tolerance_for(&self, kind: MetricKind) -> ToleranceRule {
        match kind {
            MetricKind::Currency => self.currency,
            MetricKind::Share => self.share,
            MetricKind::Count => self.count,
        }
    }

    pub fn band_for(&self, kind: MetricKind) -> SeverityBand {
        match kind {
            MetricKind::Currency => self.bands.currency,
            MetricKind::Share => self.bands.share,
            MetricKind::Count => self.bands.count,
        }
    }

    /// Reject negative epsilons, which would make every comparison fail.
    pub fn validate(&self) -> AuditResult<()> {
        let rules = [
            ("currency", self.currency),
            ("share", self.share),
            ("count", self.count),
        ];
        for (name, rule) in rules {
            if rule.absolute < Decimal::ZERO || rule.relative < Decimal::ZERO {
                return Err(AuditError::InvalidInput {
                    field: format!("tolerances.{name}"),
                    reason: "Tolerances must be non-negative".into(),
                });
            }
        }
        let bands = [
            ("currency", self.bands.currency),
            ("share", self.bands.share),
            ("count", self.bands.count),
        ];
        for (name, band) in bands {
            if band.absolute < Decimal::ZERO || band.relative < Decimal::ZERO {
                return Err(AuditError::InvalidInput {
                    field: format!("tolerances.bands.{name}"),
                    reason: "Severity bands must be non-negative".into(),
                });
            }
        }
        Ok(())
    }
}
