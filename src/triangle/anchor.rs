// src/triangle/anchor.rs

use crate::grid::{Cell, CellGrid};
use crate::triangle::ExtractError;

/// Canonical spelling every matched variant normalizes to.
pub const ANCHOR_LABEL: &str = "Relating to Period";

/// Accepted spellings of the period-label marker. Agencies vary the
/// capitalization and trailing qualifier across publication years; exact
/// multi-variant matching keeps false positives at zero.
const ANCHOR_SPELLINGS: [&str; 3] = [
    ANCHOR_LABEL,
    "Relating to Period (three months ending)",
    "Relating to period",
];

/// Location of the header cell that starts the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub row: usize,
    pub col: usize,
    /// The spelling actually found in the sheet.
    pub matched: &'static str,
}

impl Anchor {
    /// Every matched variant normalizes to the same canonical label.
    pub fn canonical(&self) -> &'static str {
        ANCHOR_LABEL
    }
}

/// Find the anchor: the first cell, scanning row-major, whose text equals
/// one of the accepted spellings. Absence is fatal for the sheet.
pub fn locate(grid: &CellGrid) -> Result<Anchor, ExtractError> {
    for (row, cells) in grid.rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Cell::Text(text) = cell {
                if let Some(matched) = ANCHOR_SPELLINGS.iter().find(|v| *v == text) {
                    return Ok(Anchor {
                        row,
                        col,
                        matched,
                    });
                }
            }
        }
    }
    Err(ExtractError::Layout)
}

/// Drop all columns strictly left of the anchor (stray notes/index columns).
/// A no-op when the anchor already sits in the first column; never drops rows.
pub fn trim_columns(grid: &CellGrid, anchor: &Anchor) -> CellGrid {
    if anchor.col == 0 {
        return grid.clone();
    }
    CellGrid::new(
        grid.rows()
            .map(|row| row[anchor.col..].to_vec())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_grid(rows: &[&[&str]]) -> CellGrid {
        CellGrid::new(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|s| {
                            if s.is_empty() {
                                Cell::Empty
                            } else {
                                Cell::Text(s.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn locates_each_accepted_spelling() {
        for spelling in ANCHOR_SPELLINGS {
            let grid = text_grid(&[&["notes", ""], &["", spelling]]);
            let anchor = locate(&grid).unwrap();
            assert_eq!((anchor.row, anchor.col), (1, 1));
            assert_eq!(anchor.matched, spelling);
        }
    }

    #[test]
    fn first_match_wins_in_row_major_order() {
        let grid = text_grid(&[
            &["", "Relating to period"],
            &["Relating to Period", ""],
        ]);
        let anchor = locate(&grid).unwrap();
        assert_eq!((anchor.row, anchor.col), (0, 1));
    }

    #[test]
    fn missing_anchor_is_a_layout_error() {
        let grid = text_grid(&[&["relating to period", "Period"], &["notes", "data"]]);
        assert!(matches!(locate(&grid), Err(ExtractError::Layout)));
    }

    #[test]
    fn near_miss_spellings_do_not_match() {
        // fuzzy variants are deliberately rejected
        let grid = text_grid(&[&["Relating to Period (3 months ending)"]]);
        assert!(locate(&grid).is_err());
    }

    #[test]
    fn trim_drops_columns_left_of_anchor_only() {
        let grid = text_grid(&[
            &["idx", "Relating to Period", "2021 Q1"],
            &["1", "2022 Q1", "1.1"],
        ]);
        let anchor = locate(&grid).unwrap();
        let trimmed = trim_columns(&grid, &anchor);
        assert_eq!(trimmed.width(), 2);
        assert_eq!(trimmed.height(), 2);
        assert_eq!(trimmed.cell(0, 0).as_text(), Some(ANCHOR_LABEL));
    }

    #[test]
    fn trim_is_a_noop_when_anchor_is_first_column() {
        let grid = text_grid(&[&["Relating to Period", "2021 Q1"]]);
        let anchor = locate(&grid).unwrap();
        assert_eq!(trim_columns(&grid, &anchor), grid);
    }
}
