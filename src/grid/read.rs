// src/grid/read.rs

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

use crate::grid::{Cell, CellGrid};

/// List all sheet names in a workbook (xlsx, xlsm or legacy xls).
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    Ok(workbook.sheet_names().to_owned())
}

/// Pick the triangle sheet out of a workbook's sheet list: the first sheet
/// whose name mentions "triangle", in workbook order. Source files carry
/// notes/contents sheets alongside the one data sheet.
pub fn nominate_triangle_sheet(names: &[String]) -> Option<&str> {
    names
        .iter()
        .find(|n| n.to_lowercase().contains("triangle"))
        .map(String::as_str)
}

/// Read one sheet into a fully materialized [`CellGrid`].
pub fn read_grid(path: &Path, sheet_name: &str) -> Result<CellGrid> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range(sheet_name)
        .with_context(|| format!("reading sheet `{}` from {}", sheet_name, path.display()))?;

    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();
    let grid = CellGrid::new(rows);
    debug!(
        sheet = %sheet_name,
        rows = grid.height(),
        cols = grid.width(),
        "read grid"
    );
    Ok(grid)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(trimmed.to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::Date(naive.date()),
            None => Cell::Empty,
        },
        Data::DateTimeIso(s) => match s.get(..10).and_then(|p| p.parse::<chrono::NaiveDate>().ok()) {
            Some(d) => Cell::Date(d),
            None => Cell::Text(s.clone()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}
