// src/triangle/layout.rs

use crate::grid::{Cell, CellGrid};
use crate::triangle::anchor::{self, Anchor};

/// The grid restricted to the data region: period labels from the anchor
/// row, and one vintage label + value cells per body row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedGrid {
    /// Header cells right of the anchor, one per period column.
    pub period_cells: Vec<Cell>,
    /// Body rows below the anchor row: the vintage cell plus its value
    /// cells, in sheet order.
    pub rows: Vec<TriangleRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriangleRow {
    pub vintage: Cell,
    pub values: Vec<Cell>,
}

/// The closed set of known sheet layouts. Selected once per sheet; each
/// variant is a pure `CellGrid -> TrimmedGrid` trim so that source quirks
/// stay out of the reshaping logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// The triangle convention: the anchor row carries period labels to its
    /// right, the anchor column carries vintage labels below it.
    Standard,
}

impl Layout {
    pub fn classify(_grid: &CellGrid, _anchor: &Anchor) -> Layout {
        // Every triangle sheet seen so far follows the standard convention;
        // wide non-triangle layouts are out of scope.
        Layout::Standard
    }

    pub fn trim(self, grid: &CellGrid, anchor: &Anchor) -> TrimmedGrid {
        match self {
            Layout::Standard => trim_standard(grid, anchor),
        }
    }
}

fn trim_standard(grid: &CellGrid, anchor: &Anchor) -> TrimmedGrid {
    let grid = anchor::trim_columns(grid, anchor);
    let header = grid
        .rows()
        .nth(anchor.row)
        .expect("anchor row exists in the grid it was located in");
    let period_cells = header[1..].to_vec();

    let rows = grid
        .rows()
        .skip(anchor.row + 1)
        .map(|row| TriangleRow {
            vintage: row[0].clone(),
            values: row[1..].to_vec(),
        })
        .collect();

    TrimmedGrid {
        period_cells,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangle::anchor::locate;

    fn cell(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Empty
        } else if let Ok(n) = s.parse::<f64>() {
            Cell::Number(n)
        } else {
            Cell::Text(s.to_string())
        }
    }

    fn grid(rows: &[&[&str]]) -> CellGrid {
        CellGrid::new(
            rows.iter()
                .map(|r| r.iter().map(|s| cell(s)).collect())
                .collect(),
        )
    }

    #[test]
    fn standard_trim_splits_header_vintages_and_values() {
        let g = grid(&[
            &["notes", "", "", ""],
            &["idx", "Relating to Period", "2021 Q1", "2021 Q2"],
            &["1", "2022 Q1", "1.1", "1.2"],
            &["2", "2022 Q2", "1.3", ""],
        ]);
        let anchor = locate(&g).unwrap();
        let layout = Layout::classify(&g, &anchor);
        assert_eq!(layout, Layout::Standard);

        let trimmed = layout.trim(&g, &anchor);
        assert_eq!(
            trimmed.period_cells,
            vec![cell("2021 Q1"), cell("2021 Q2")]
        );
        assert_eq!(trimmed.rows.len(), 2);
        assert_eq!(trimmed.rows[0].vintage, cell("2022 Q1"));
        assert_eq!(trimmed.rows[0].values, vec![cell("1.1"), cell("1.2")]);
        assert_eq!(trimmed.rows[1].values, vec![cell("1.3"), Cell::Empty]);
    }
}
