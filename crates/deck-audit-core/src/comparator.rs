use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::report::Severity;
use crate::tolerance::TolerancePolicy;
use crate::types::MetricKind;

/// Which side of a comparison had no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Expected,
    Observed,
}

/// Classified result of comparing one expected/observed pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Match,
    Mismatch {
        /// expected - observed
        delta: Decimal,
        /// delta as a percentage of |expected|; None when expected is zero or the ratio overflows
        deviation_pct: Option<Decimal>,
    },
    Missing {
        absent: Side,
    },
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Match)
    }

    /// Same variant, ignoring the payload. Used where only the verdict class matters.
    pub fn same_class(&self, other: &Outcome) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Compare an expected value against what the deck shows.
///
/// `None` on either side is a placeholder or an unknown expectation. The
/// relative tolerance is applied to the larger of the two magnitudes, so
/// swapping the operands never changes the classification.
pub fn compare(
    expected: Option<Decimal>,
    observed: Option<Decimal>,
    kind: MetricKind,
    policy: &TolerancePolicy,
) -> Outcome {
    let rule = policy.tolerance_for(kind);
    match (expected, observed) {
        (None, None) => Outcome::Match,
        (Some(present), None) => one_sided(present, Side::Observed, kind, policy),
        (None, Some(present)) => one_sided(present, Side::Expected, kind, policy),
        (Some(e), Some(o)) => {
            // saturates instead of panicking on extreme magnitudes
            let delta = e.saturating_sub(o);
            if delta.abs() <= rule.allowance(e.abs().max(o.abs())) {
                Outcome::Match
            } else {
                Outcome::Mismatch {
                    delta,
                    deviation_pct: deviation_pct(e, delta),
                }
            }
        }
    }
}

/// Severity of a non-matching outcome; `None` for a match.
pub fn grade(
    outcome: &Outcome,
    expected: Option<Decimal>,
    observed: Option<Decimal>,
    kind: MetricKind,
    policy: &TolerancePolicy,
) -> Option<Severity> {
    match outcome {
        Outcome::Match => None,
        Outcome::Missing {
            absent: Side::Observed,
        } => Some(policy.missing.observed_absent),
        Outcome::Missing {
            absent: Side::Expected,
        } => Some(policy.missing.expected_absent),
        Outcome::Mismatch { delta, .. } => {
            let magnitude = expected
                .unwrap_or(Decimal::ZERO)
                .abs()
                .max(observed.unwrap_or(Decimal::ZERO).abs());
            let limit = policy
                .tolerance_for(kind)
                .allowance(magnitude)
                .saturating_add(policy.band_for(kind).width(magnitude));
            if delta.abs() <= limit {
                Some(Severity::Warning)
            } else {
                Some(Severity::Critical)
            }
        }
    }
}

fn one_sided(present: Decimal, absent: Side, kind: MetricKind, policy: &TolerancePolicy) -> Outcome {
    let rule = policy.tolerance_for(kind);
    if policy.missing.absent_equals_zero && present.abs() <= rule.allowance(present) {
        Outcome::Match
    } else {
        Outcome::Missing { absent }
    }
}

fn deviation_pct(expected: Decimal, delta: Decimal) -> Option<Decimal> {
    if expected.is_zero() {
        return None;
    }
    delta
        .checked_div(expected.abs())?
        .checked_mul(dec!(100))
        .map(|pct| pct.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const KINDS: [MetricKind; 3] = [MetricKind::Currency, MetricKind::Share, MetricKind::Count];

    fn samples() -> Vec<Decimal> {
        vec![
            dec!(0),
            dec!(0.04),
            dec!(0.3),
            dec!(12.3),
            dec!(-500),
            dec!(99.95),
            dec!(1234.50),
            dec!(1_000_000),
            dec!(987_654_321.12),
        ]
    }

    #[test]
    fn test_reflexive_for_every_kind() {
        let policy = TolerancePolicy::default();
        for kind in KINDS {
            for x in samples() {
                assert_eq!(
                    compare(Some(x), Some(x), kind, &policy),
                    Outcome::Match,
                    "{x} vs itself under {kind:?}"
                );
            }
        }
    }

    #[test]
    fn test_symmetric_classification() {
        let policy = TolerancePolicy::default();
        for kind in KINDS {
            for x in samples() {
                for y in samples() {
                    let forward = compare(Some(x), Some(y), kind, &policy);
                    let backward = compare(Some(y), Some(x), kind, &policy);
                    assert!(
                        forward.same_class(&backward),
                        "{x} vs {y} under {kind:?}: {forward:?} / {backward:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_delta_sign_is_expected_minus_observed() {
        let policy = TolerancePolicy::default();
        match compare(Some(dec!(300)), Some(dec!(250)), MetricKind::Currency, &policy) {
            Outcome::Mismatch {
                delta,
                deviation_pct,
            } => {
                assert_eq!(delta, dec!(50));
                assert_eq!(deviation_pct, Some(dec!(16.67)));
            }
            other => panic!("Expected mismatch, got {other:?}"),
        }
        match compare(Some(dec!(250)), Some(dec!(300)), MetricKind::Currency, &policy) {
            Outcome::Mismatch { delta, .. } => assert_eq!(delta, dec!(-50)),
            other => panic!("Expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_rounding_within_tolerance_matches() {
        let policy = TolerancePolicy::default();
        assert!(compare(Some(dec!(1234.49)), Some(dec!(1234)), MetricKind::Currency, &policy).is_match());
        assert!(compare(Some(dec!(33.3)), Some(dec!(33.4)), MetricKind::Share, &policy).is_match());
        // 0.5% of 200_000
        assert!(compare(Some(dec!(200_000)), Some(dec!(199_100)), MetricKind::Count, &policy).is_match());
        assert!(!compare(Some(dec!(200_000)), Some(dec!(198_000)), MetricKind::Count, &policy).is_match());
    }

    #[test]
    fn test_absent_against_zero_matches() {
        let policy = TolerancePolicy::default();
        assert!(compare(Some(Decimal::ZERO), None, MetricKind::Currency, &policy).is_match());
        assert!(compare(None, Some(dec!(0.2)), MetricKind::Currency, &policy).is_match());
        assert!(compare(None, None, MetricKind::Share, &policy).is_match());
    }

    #[test]
    fn test_absent_against_value_is_missing() {
        let policy = TolerancePolicy::default();
        assert_eq!(
            compare(Some(dec!(100)), None, MetricKind::Currency, &policy),
            Outcome::Missing {
                absent: Side::Observed
            }
        );
        assert_eq!(
            compare(None, Some(dec!(100)), MetricKind::Currency, &policy),
            Outcome::Missing {
                absent: Side::Expected
            }
        );
    }

    #[test]
    fn test_absent_never_zero_when_policy_says_so() {
        let mut policy = TolerancePolicy::default();
        policy.missing.absent_equals_zero = false;
        assert_eq!(
            compare(Some(Decimal::ZERO), None, MetricKind::Currency, &policy),
            Outcome::Missing {
                absent: Side::Observed
            }
        );
    }

    #[test]
    fn test_grade_currency() {
        let policy = TolerancePolicy::default();
        let e = Some(dec!(300));
        let big = compare(e, Some(dec!(250)), MetricKind::Currency, &policy);
        assert_eq!(
            grade(&big, e, Some(dec!(250)), MetricKind::Currency, &policy),
            Some(Severity::Critical)
        );
        let small = compare(e, Some(dec!(295)), MetricKind::Currency, &policy);
        assert_eq!(
            grade(&small, e, Some(dec!(295)), MetricKind::Currency, &policy),
            Some(Severity::Warning)
        );
    }

    #[test]
    fn test_grade_share_one_rounding_step() {
        let policy = TolerancePolicy::default();
        let e = Some(dec!(30.0));
        let near = compare(e, Some(dec!(30.2)), MetricKind::Share, &policy);
        assert!(!near.is_match());
        assert_eq!(
            grade(&near, e, Some(dec!(30.2)), MetricKind::Share, &policy),
            Some(Severity::Warning)
        );
        let far = compare(e, Some(dec!(31.0)), MetricKind::Share, &policy);
        assert_eq!(
            grade(&far, e, Some(dec!(31.0)), MetricKind::Share, &policy),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn test_grade_missing_follows_policy() {
        let mut policy = TolerancePolicy::default();
        policy.missing.observed_absent = Severity::Warning;
        let outcome = compare(Some(dec!(100)), None, MetricKind::Currency, &policy);
        assert_eq!(
            grade(&outcome, Some(dec!(100)), None, MetricKind::Currency, &policy),
            Some(Severity::Warning)
        );
        assert_eq!(grade(&Outcome::Match, None, None, MetricKind::Currency, &policy), None);
    }

    #[test]
    fn test_extreme_magnitudes_do_not_overflow() {
        let policy = TolerancePolicy::default();
        let outcome = compare(Some(Decimal::MAX), Some(Decimal::MIN), MetricKind::Currency, &policy);
        assert!(!outcome.is_match());
        assert_eq!(
            grade(&outcome, Some(Decimal::MAX), Some(Decimal::MIN), MetricKind::Currency, &policy),
            Some(Severity::Critical)
        );
        assert_eq!(deviation_pct(Decimal::MAX, dec!(0.0000000000000000000000000001)), None);
        assert_eq!(deviation_pct(dec!(50), dec!(300)), Some(dec!(16.67)));
    }
}
