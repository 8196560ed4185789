// src/grid/mod.rs

use chrono::NaiveDate;

pub mod read;

/// A single spreadsheet cell after type inference by the workbook reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// An in-memory two-dimensional table of typed cells, as read from one sheet.
///
/// A grid is built once per sheet and never mutated; every pipeline stage
/// derives a new grid or table from it, so a sheet can be re-processed
/// deterministically from the same raw read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellGrid {
    rows: Vec<Vec<Cell>>,
}

impl CellGrid {
    /// Build a grid from raw rows, padding ragged rows out to a rectangle.
    pub fn new(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        CellGrid { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Derive a new grid with fully-empty rows and columns removed.
    ///
    /// Hand-authored sheets pad the data region with blank gutters; the
    /// anchor search expects them gone.
    pub fn compact(&self) -> CellGrid {
        let width = self.width();
        let mut keep_col = vec![false; width];
        for row in &self.rows {
            for (c, cell) in row.iter().enumerate() {
                if !cell.is_empty() {
                    keep_col[c] = true;
                }
            }
        }

        let rows = self
            .rows
            .iter()
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(c, _)| keep_col[*c])
                    .map(|(_, cell)| cell.clone())
                    .collect()
            })
            .collect();
        CellGrid { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn ragged_rows_are_padded() {
        let grid = CellGrid::new(vec![vec![t("a")], vec![t("b"), Cell::Number(1.0)]]);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.cell(0, 1), &Cell::Empty);
    }

    #[test]
    fn compact_drops_empty_rows_and_columns() {
        let grid = CellGrid::new(vec![
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::Empty, t("a"), Cell::Empty],
            vec![Cell::Empty, Cell::Number(2.0), Cell::Empty],
        ]);
        let compacted = grid.compact();
        assert_eq!(compacted.height(), 2);
        assert_eq!(compacted.width(), 1);
        assert_eq!(compacted.cell(0, 0), &t("a"));
        // source grid is untouched
        assert_eq!(grid.height(), 3);
    }

    #[test]
    fn compact_of_dense_grid_is_identity() {
        let grid = CellGrid::new(vec![vec![t("a"), t("b")], vec![t("c"), t("d")]]);
        assert_eq!(grid.compact(), grid);
    }
}
