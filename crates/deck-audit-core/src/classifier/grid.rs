use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coordinate a merged cell defers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MergeOrigin {
    pub row: usize,
    pub col: usize,
}

/// One extracted cell of a rendered table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    #[serde(default)]
    pub text: String,
    /// Set on every cell a merged region covers except its origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<MergeOrigin>,
}

impl GridCell {
    pub fn new(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            text: text.into(),
            merged_into: None,
        }
    }

    pub fn merged(row: usize, col: usize, origin_row: usize, origin_col: usize) -> Self {
        Self {
            row,
            col,
            text: String::new(),
            merged_into: Some(MergeOrigin {
                row: origin_row,
                col: origin_col,
            }),
        }
    }

    fn is_covered(&self) -> bool {
        self.merged_into
            .is_some_and(|o| (o.row, o.col) != (self.row, self.col))
    }
}

/// A table as extracted from one slide: header texts plus body cells.
/// Cells may be sparse and in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub header: Vec<String>,
    #[serde(default)]
    pub cells: Vec<GridCell>,
}

/// The whole rendered report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedGrid {
    pub tables: Vec<DisplayedTable>,
}

/// Cell text after merge resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedCell {
    /// Text the cell itself carries.
    pub own: String,
    /// Text of the merge origin for covered cells, otherwise the own text.
    pub effective: String,
    pub covered: bool,
}

/// Resolve merges once, keyed by (row, col) in grid order. A later cell at
/// an already-seen coordinate replaces the earlier one; the count of such
/// duplicates is returned alongside.
pub(crate) fn resolve(table: &DisplayedTable) -> (BTreeMap<(usize, usize), ResolvedCell>, usize) {
    let mut own: BTreeMap<(usize, usize), &GridCell> = BTreeMap::new();
    let mut duplicates = 0;
    for cell in &table.cells {
        if own.insert((cell.row, cell.col), cell).is_some() {
            duplicates += 1;
        }
    }

    let resolved = own
        .iter()
        .map(|(&coord, cell)| {
            let effective = match cell.merged_into {
                Some(origin) if cell.is_covered() => own
                    .get(&(origin.row, origin.col))
                    .map(|o| o.text.clone())
                    .unwrap_or_else(|| cell.text.clone()),
                _ => cell.text.clone(),
            };
            (
                coord,
                ResolvedCell {
                    own: cell.text.clone(),
                    effective,
                    covered: cell.is_covered(),
                },
            )
        })
        .collect();

    (resolved, duplicates)
}
