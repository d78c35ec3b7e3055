//! Maps displayed table coordinates to the semantic field they show.
//!
//! Column roles come from the header row once per table. Row kinds come from
//! label text, with aggregate rows recognised by marker phrases. Anything
//! that cannot be mapped with confidence is left unclassified rather than
//! guessed at.

pub mod grid;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{matches_any, matches_exactly, normalize_label, AuditConfig};
use crate::types::{CellRef, FieldKey, Metric, Period, Scope, Slot};

pub use grid::{DisplayedGrid, DisplayedTable, GridCell, MergeOrigin};

const PLACEHOLDER_LABELS: [&str; 4] = ["", "-", "\u{2013}", "\u{2014}"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    EntityLabel,
    ChannelLabel,
    MetricLabel,
    Period(Period),
    RowTotal,
    Share,
    Unmapped,
}

impl ColumnRole {
    fn is_data(&self) -> bool {
        matches!(
            self,
            ColumnRole::Period(_) | ColumnRole::RowTotal | ColumnRole::Share
        )
    }
}

/// Semantic kind of a displayed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Period { scope: Scope, metric: Metric },
    MonthlyTotal,
    GrandTotal,
    CarriedForward { scope: Scope },
    Unclassified,
}

/// One body cell with the field it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCell {
    pub cell: CellRef,
    pub text: String,
    pub field: Option<FieldKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableClassification {
    pub table: usize,
    pub columns: Vec<ColumnRole>,
    pub rows: BTreeMap<usize, RowKind>,
    /// Body cells in row, then column order.
    pub cells: Vec<ClassifiedCell>,
    pub warnings: Vec<String>,
}

impl TableClassification {
    pub fn classified(&self) -> impl Iterator<Item = (&ClassifiedCell, &FieldKey)> {
        self.cells
            .iter()
            .filter_map(|c| c.field.as_ref().map(|f| (c, f)))
    }

    pub fn unclassified_count(&self) -> usize {
        self.cells.iter().filter(|c| c.field.is_none()).count()
    }

    fn role(&self, col: usize) -> ColumnRole {
        self.columns.get(col).copied().unwrap_or(ColumnRole::Unmapped)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridClassification {
    pub tables: Vec<TableClassification>,
}

impl GridClassification {
    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        self.tables.iter().flat_map(|t| t.warnings.iter())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify every table of the grid, in grid order.
pub fn classify(grid: &DisplayedGrid, config: &AuditConfig) -> GridClassification {
    GridClassification {
        tables: grid
            .tables
            .iter()
            .enumerate()
            .map(|(index, table)| classify_table(index, table, config))
            .collect(),
    }
}

pub fn classify_table(index: usize, table: &DisplayedTable, config: &AuditConfig) -> TableClassification {
    let mut out = TableClassification {
        table: index,
        ..Default::default()
    };

    out.columns = table
        .header
        .iter()
        .enumerate()
        .map(|(col, text)| {
            let role = column_role(text, config);
            if role == ColumnRole::Unmapped && !text.trim().is_empty() {
                out.warnings.push(format!(
                    "table {index}: header '{}' in column {col} not mapped",
                    text.trim()
                ));
            }
            role
        })
        .collect();

    let (resolved, duplicates) = grid::resolve(table);
    if duplicates > 0 {
        out.warnings.push(format!(
            "table {index}: {duplicates} cells share a coordinate; the last one was used"
        ));
    }

    // Row labels: effective text of every non-data column, in column order.
    let mut labels: BTreeMap<usize, Vec<(usize, &str)>> = BTreeMap::new();
    for (&(row, col), cell) in &resolved {
        let entry = labels.entry(row).or_default();
        if !out.role(col).is_data() {
            entry.push((col, cell.effective.as_str()));
        }
    }

    let mut current_entity: Option<String> = None;
    for (&row, row_labels) in &labels {
        let kind = row_kind(&out, row_labels, &mut current_entity, config);
        out.rows.insert(row, kind);
    }

    for (&(row, col), cell) in &resolved {
        let field = if cell.covered {
            // The merge origin carries the displayed value.
            None
        } else {
            field_for(&out.rows[&row], out.role(col))
        };
        out.cells.push(ClassifiedCell {
            cell: CellRef {
                table: index,
                row,
                col,
            },
            text: cell.own.clone(),
            field,
        });
    }

    tracing::debug!(
        table = index,
        rows = out.rows.len(),
        classified = out.cells.len() - out.unclassified_count(),
        unclassified = out.unclassified_count(),
        "classified table"
    );

    out
}

fn column_role(header: &str, config: &AuditConfig) -> ColumnRole {
    let markers = &config.headers;
    if normalize_label(header).is_empty() {
        return ColumnRole::Unmapped;
    }
    if matches_any(header, &markers.share) {
        return ColumnRole::Share;
    }

    let label_hits = [
        (matches_any(header, &markers.entity), ColumnRole::EntityLabel),
        (matches_any(header, &markers.channel), ColumnRole::ChannelLabel),
        (matches_any(header, &markers.metric), ColumnRole::MetricLabel),
    ];
    let mut hits = label_hits.iter().filter(|(hit, _)| *hit);
    match (hits.next(), hits.next()) {
        (Some((_, role)), None) => return *role,
        (Some(_), Some(_)) => return ColumnRole::Unmapped,
        _ => {}
    }

    if let Ok(period) = header.parse::<Period>() {
        return ColumnRole::Period(period);
    }
    if matches_any(header, &markers.row_total) {
        return ColumnRole::RowTotal;
    }
    ColumnRole::Unmapped
}

fn row_kind(
    table: &TableClassification,
    labels: &[(usize, &str)],
    current_entity: &mut Option<String>,
    config: &AuditConfig,
) -> RowKind {
    let markers = &config.markers;
    let any_label = |phrases: &[String]| labels.iter().any(|(_, text)| matches_any(text, phrases));

    if any_label(&markers.carried_forward) {
        let scope = current_entity
            .clone()
            .map(Scope::Entity)
            .unwrap_or(Scope::All);
        return RowKind::CarriedForward { scope };
    }
    if any_label(&markers.grand_total) {
        *current_entity = None;
        return RowKind::GrandTotal;
    }
    if any_label(&markers.monthly_total) {
        *current_entity = None;
        return RowKind::MonthlyTotal;
    }

    let text_in = |role: ColumnRole| -> Option<&str> {
        labels
            .iter()
            .find(|(col, _)| table.role(*col) == role)
            .map(|(_, text)| text.trim())
    };

    let entity = match text_in(ColumnRole::EntityLabel) {
        Some(text) if !PLACEHOLDER_LABELS.contains(&text) => text.to_string(),
        _ => return RowKind::Unclassified,
    };
    *current_entity = Some(entity.clone());

    let scope = match text_in(ColumnRole::ChannelLabel) {
        Some(channel) if !PLACEHOLDER_LABELS.contains(&channel) => Scope::Channel {
            entity,
            channel: channel.to_string(),
        },
        _ => Scope::Entity(entity),
    };

    match metric_from_label(text_in(ColumnRole::MetricLabel).unwrap_or(""), config) {
        Some(metric) => RowKind::Period { scope, metric },
        None => RowKind::Unclassified,
    }
}

/// Metric named by a row's metric label; blank means spend. Labels for
/// metrics the source does not carry (frequency, OTS, reach@3+) are not mapped.
fn metric_from_label(label: &str, config: &AuditConfig) -> Option<Metric> {
    if matches_exactly(label, &config.metric_labels.reach) {
        return Some(Metric::Reach);
    }
    let label = normalize_label(label);
    if PLACEHOLDER_LABELS.contains(&label.as_str()) {
        return Some(Metric::Spend);
    }
    if label.contains("REACH") {
        None
    } else if label.contains("GRP") {
        Some(Metric::Grps)
    } else if label.contains("IMPRESSION") {
        Some(Metric::Impressions)
    } else if ["BUDGET", "SPEND", "COST", "£", "$", "€"]
        .iter()
        .any(|m| label.contains(m))
    {
        Some(Metric::Spend)
    } else {
        None
    }
}

fn field_for(row: &RowKind, column: ColumnRole) -> Option<FieldKey> {
    let key = |scope: Scope, slot: Slot, metric: Metric| Some(FieldKey::new(scope, slot, metric));
    match (row, column) {
        (RowKind::Period { scope, metric }, ColumnRole::Period(p)) => {
            key(scope.clone(), Slot::Period(p), *metric)
        }
        (RowKind::Period { scope, metric }, ColumnRole::RowTotal) => {
            key(scope.clone(), Slot::EntityTotal, *metric)
        }
        (
            RowKind::Period {
                scope: scope @ Scope::Channel { .. },
                metric: Metric::Spend,
            },
            ColumnRole::Share,
        ) => key(scope.clone(), Slot::Share, Metric::Spend),
        (RowKind::MonthlyTotal | RowKind::GrandTotal, ColumnRole::Period(p)) => {
            key(Scope::All, Slot::MonthlyTotal(p), Metric::Spend)
        }
        (RowKind::MonthlyTotal | RowKind::GrandTotal, ColumnRole::RowTotal) => {
            key(Scope::All, Slot::GrandTotal, Metric::Spend)
        }
        (RowKind::CarriedForward { scope }, ColumnRole::Period(p)) => {
            key(scope.clone(), Slot::CarriedForward(p), Metric::Spend)
        }
        _ => None,
    }
}
