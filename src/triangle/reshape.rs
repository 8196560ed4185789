// src/triangle/reshape.rs
//
// Wide-to-long melt of a trimmed triangle grid: every surviving vintage row
// paired with every period column, vintage-major period-minor.

use chrono::NaiveDate;
use tracing::debug;

use crate::config::Frequency;
use crate::grid::Cell;
use crate::triangle::dates::{self, PeriodFormat};
use crate::triangle::layout::TrimmedGrid;
use crate::triangle::vintage;

/// The long-format (vintage, datetime, value) table for one sheet, columnar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTable {
    pub vintage: Vec<NaiveDate>,
    pub datetime: Vec<NaiveDate>,
    pub value: Vec<f64>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Per-sheet drop counters, reported in the audit alongside the panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReshapeStats {
    /// Vintage rows whose label failed date parsing.
    pub dropped_vintages: usize,
    /// Period columns whose header failed date parsing.
    pub dropped_periods: usize,
    /// Non-empty value cells that failed numeric coercion.
    pub dropped_values: usize,
}

fn coerce_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) => Some(*v),
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
        Cell::Date(_) | Cell::Empty => None,
    }
}

fn parse_period_cell(cell: &Cell, format: PeriodFormat) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => dates::parse_period(s, format),
        Cell::Number(_) | Cell::Empty => None,
    }
}

/// Melt the trimmed grid to long format.
///
/// `vintage_format` overrides detection for the vintage column when the
/// series code demands it; period headers always go through detection. Rows
/// and columns that fail date parsing are dropped and counted; value cells
/// that are empty are absent observations (the upper triangle), while
/// non-empty cells failing numeric coercion are dropped and counted, never
/// coerced to zero.
pub fn reshape(
    trimmed: &TrimmedGrid,
    vintage_format: Option<PeriodFormat>,
    frequency: Frequency,
) -> (LongTable, ReshapeStats) {
    let mut stats = ReshapeStats::default();

    // vintage column
    let vintage_cells: Vec<&Cell> = trimmed.rows.iter().map(|r| &r.vintage).collect();
    let vintage_format = vintage_format.unwrap_or_else(|| {
        dates::detect_from_labels(vintage_cells.iter().filter_map(|c| c.as_text()))
    });
    let vintages = vintage::parse_vintages(&vintage_cells, vintage_format, frequency);
    stats.dropped_vintages = vintages.dropped;

    // period headers
    let period_format =
        dates::detect_from_labels(trimmed.period_cells.iter().filter_map(|c| c.as_text()));
    let periods: Vec<Option<NaiveDate>> = trimmed
        .period_cells
        .iter()
        .map(|c| parse_period_cell(c, period_format))
        .collect();
    stats.dropped_periods = periods.iter().filter(|p| p.is_none()).count();

    // melt, vintage-major period-minor
    let mut long = LongTable::default();
    for &(row, vintage_date) in &vintages.rows {
        let values = &trimmed.rows[row].values;
        for (col, period) in periods.iter().enumerate() {
            let Some(datetime) = period else { continue };
            let cell = values.get(col).unwrap_or(&Cell::Empty);
            match coerce_value(cell) {
                Some(v) => {
                    long.vintage.push(vintage_date);
                    long.datetime.push(*datetime);
                    long.value.push(v);
                }
                None => {
                    if !cell.is_empty() {
                        stats.dropped_values += 1;
                    }
                }
            }
        }
    }

    debug!(
        rows = long.len(),
        dropped_vintages = stats.dropped_vintages,
        dropped_periods = stats.dropped_periods,
        dropped_values = stats.dropped_values,
        "reshaped triangle"
    );
    (long, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangle::layout::TriangleRow;
    use std::collections::HashMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn quarterly_grid() -> TrimmedGrid {
        TrimmedGrid {
            period_cells: vec![text("2021 Q1"), text("2021 Q2")],
            rows: vec![
                TriangleRow {
                    vintage: text("2022 Q1"),
                    values: vec![Cell::Number(1.1), Cell::Number(1.2)],
                },
                TriangleRow {
                    vintage: text("2022 Q2"),
                    values: vec![Cell::Number(1.3), Cell::Number(1.4)],
                },
                TriangleRow {
                    vintage: text("2022 Q3"),
                    values: vec![Cell::Number(1.5), Cell::Number(1.6)],
                },
                TriangleRow {
                    vintage: text("latest"),
                    values: vec![Cell::Number(1.7), Cell::Number(1.8)],
                },
            ],
        }
    }

    #[test]
    fn melts_vintage_major_period_minor() {
        let (long, stats) = reshape(&quarterly_grid(), None, Frequency::Quarterly);
        assert_eq!(long.len(), 8);
        assert_eq!(stats, ReshapeStats::default());

        // vintage-major: the first two records belong to the first vintage
        assert_eq!(long.vintage[0], d(2022, 3, 31));
        assert_eq!(long.vintage[1], d(2022, 3, 31));
        assert_eq!(long.datetime[0], d(2021, 3, 31));
        assert_eq!(long.datetime[1], d(2021, 6, 30));
        assert_eq!(long.value[0], 1.1);
        assert_eq!(long.value[1], 1.2);

        // the trailing placeholder was synthesized as 2022 Q3 + 3 months
        assert_eq!(long.vintage[6], d(2022, 12, 31));
        assert_eq!(long.value[7], 1.8);
    }

    #[test]
    fn text_annotations_in_the_value_region_are_dropped() {
        let mut grid = quarterly_grid();
        grid.rows[1].values[1] = text("n/a");
        let (long, stats) = reshape(&grid, None, Frequency::Quarterly);
        assert_eq!(long.len(), 7);
        assert_eq!(stats.dropped_values, 1);
        assert!(long.value.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn empty_cells_are_absent_observations_not_failures() {
        let mut grid = quarterly_grid();
        grid.rows[0].values[1] = Cell::Empty;
        let (long, stats) = reshape(&grid, None, Frequency::Quarterly);
        assert_eq!(long.len(), 7);
        assert_eq!(stats.dropped_values, 0);
    }

    #[test]
    fn unparseable_period_header_drops_the_whole_column() {
        let mut grid = quarterly_grid();
        grid.period_cells[1] = text("see footnote 3");
        let (long, stats) = reshape(&grid, None, Frequency::Quarterly);
        assert_eq!(stats.dropped_periods, 1);
        assert!(long.datetime.iter().all(|dt| *dt == d(2021, 3, 31)));
    }

    #[test]
    fn vintage_format_override_takes_precedence_over_detection() {
        let grid = TrimmedGrid {
            period_cells: vec![text("2021 Q1")],
            rows: vec![
                TriangleRow {
                    vintage: text("Jan-22"),
                    values: vec![Cell::Number(5.0)],
                },
                TriangleRow {
                    vintage: text("latest"),
                    values: vec![Cell::Number(6.0)],
                },
            ],
        };
        let (long, _) = reshape(&grid, Some(PeriodFormat::MonthYear), Frequency::Monthly);
        assert_eq!(long.vintage, vec![d(2022, 1, 1), d(2022, 2, 1)]);
    }

    #[test]
    fn round_trip_pivot_recovers_the_wide_grid() {
        let grid = quarterly_grid();
        let (long, _) = reshape(&grid, None, Frequency::Quarterly);

        let mut pivot: HashMap<(NaiveDate, NaiveDate), f64> = HashMap::new();
        for i in 0..long.len() {
            pivot.insert((long.vintage[i], long.datetime[i]), long.value[i]);
        }
        assert_eq!(pivot.len(), 8);
        assert_eq!(pivot[&(d(2022, 6, 30), d(2021, 3, 31))], 1.3);
        assert_eq!(pivot[&(d(2022, 9, 30), d(2021, 6, 30))], 1.6);
        assert_eq!(pivot[&(d(2022, 12, 31), d(2021, 3, 31))], 1.7);
    }

    #[test]
    fn reshape_is_deterministic() {
        let grid = quarterly_grid();
        let first = reshape(&grid, None, Frequency::Quarterly);
        let second = reshape(&grid, None, Frequency::Quarterly);
        assert_eq!(first, second);
    }
}
