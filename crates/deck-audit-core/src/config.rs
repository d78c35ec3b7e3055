use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::tolerance::TolerancePolicy;
use crate::types::Granularity;
use crate::AuditResult;

/// Label phrases that mark aggregate rows. Matched case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowMarkers {
    pub monthly_total: Vec<String>,
    pub grand_total: Vec<String>,
    pub carried_forward: Vec<String>,
}

impl Default for RowMarkers {
    fn default() -> Self {
        Self {
            monthly_total: vec!["MONTHLY TOTAL".into()],
            grand_total: vec!["GRAND TOTAL".into(), "BRAND TOTAL".into()],
            carried_forward: vec!["CARRIED FORWARD".into()],
        }
    }
}

/// Header phrases that identify label and total columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderMarkers {
    pub entity: Vec<String>,
    pub channel: Vec<String>,
    pub metric: Vec<String>,
    pub row_total: Vec<String>,
    pub share: Vec<String>,
}

impl Default for HeaderMarkers {
    fn default() -> Self {
        Self {
            entity: vec!["CAMPAIGN".into(), "PRODUCT".into(), "ENTITY".into()],
            channel: vec!["MEDIA".into(), "CHANNEL".into()],
            metric: vec!["METRIC".into()],
            row_total: vec!["TOTAL".into()],
            share: vec!["%".into()],
        }
    }
}

/// Row labels that name a metric exactly. Qualified variants such as
/// "Reach@3+" measure something the source does not carry and stay unmapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricLabels {
    pub reach: Vec<String>,
}

impl Default for MetricLabels {
    fn default() -> Self {
        Self {
            reach: vec!["REACH".into(), "REACH@1+".into(), "REACH 1+".into(), "REACH %".into()],
        }
    }
}

/// Everything one audit run is parameterised by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub granularity: Granularity,
    pub tolerances: TolerancePolicy,
    pub markers: RowMarkers,
    pub headers: HeaderMarkers,
    pub metric_labels: MetricLabels,
    /// End the run as fatal on the first unreadable cell instead of
    /// recording it as a discrepancy.
    pub fatal_on_unparseable: bool,
}

impl AuditConfig {
    pub fn validate(&self) -> AuditResult<()> {
        self.tolerances.validate()?;

        let groups = [
            ("markers.monthly_total", &self.markers.monthly_total),
            ("markers.grand_total", &self.markers.grand_total),
            ("markers.carried_forward", &self.markers.carried_forward),
            ("headers.entity", &self.headers.entity),
            ("headers.row_total", &self.headers.row_total),
            ("headers.share", &self.headers.share),
        ];
        for (field, phrases) in groups {
            if phrases.iter().all(|p| p.trim().is_empty()) {
                return Err(AuditError::InvalidInput {
                    field: field.into(),
                    reason: "At least one non-empty phrase is required".into(),
                });
            }
        }
        Ok(())
    }
}

/// Upper-case and collapse runs of whitespace, so "Monthly\nTotal" and
/// "MONTHLY  TOTAL" compare equal.
pub fn normalize_label(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// True when any non-empty phrase occurs in the text.
pub fn matches_any(text: &str, phrases: &[String]) -> bool {
    let haystack = normalize_label(text);
    phrases
        .iter()
        .map(|p| normalize_label(p))
        .any(|p| !p.is_empty() && haystack.contains(&p))
}

/// True when the whole label equals one of the phrases.
pub fn matches_exactly(text: &str, phrases: &[String]) -> bool {
    let label = normalize_label(text);
    !label.is_empty() && phrases.iter().any(|p| normalize_label(p) == label)
}
