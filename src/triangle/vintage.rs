// src/triangle/vintage.rs
//
// Parsing of the vintage (row-label) column, including reconstruction of the
// trailing "latest estimate" row whose label never parses as a date.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::Frequency;
use crate::grid::Cell;
use crate::triangle::dates::{self, PeriodFormat};

/// The parsed vintage column: one `(row index, vintage date)` pair per
/// surviving body row, in sheet order, plus the count of rows dropped for
/// unparseable labels.
#[derive(Debug, Clone, PartialEq)]
pub struct VintageColumn {
    pub rows: Vec<(usize, NaiveDate)>,
    pub dropped: usize,
}

fn parse_cell(cell: &Cell, format: PeriodFormat) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => dates::parse_period(s, format),
        Cell::Number(_) | Cell::Empty => None,
    }
}

/// Parse the vintage column under `format`, restricted to rows at/after the
/// first parseable date, with the trailing placeholder synthesized.
///
/// The final row of a triangle is usually labelled "latest estimate" (or
/// similar) rather than dated. When that label fails to parse and the
/// second-to-last row parses to D, the final vintage becomes D plus one
/// reporting period: +3 months for quarterly sheets, +1 for monthly. Any
/// other unparseable row is dropped and counted.
pub fn parse_vintages(cells: &[&Cell], format: PeriodFormat, frequency: Frequency) -> VintageColumn {
    let parsed: Vec<Option<NaiveDate>> = cells.iter().map(|c| parse_cell(c, format)).collect();

    let Some(start) = parsed.iter().position(Option::is_some) else {
        return VintageColumn {
            rows: Vec::new(),
            dropped: cells.len(),
        };
    };

    // Rows above the first dated one are sheet furniture, not data; they are
    // excluded without counting as parse failures.
    let mut dropped = 0;

    // Only rows with a non-empty label participate past this point.
    let labelled: Vec<(usize, Option<NaiveDate>)> = (start..cells.len())
        .filter(|&i| !cells[i].is_empty())
        .map(|i| (i, parsed[i]))
        .collect();

    let mut dated: Vec<(usize, NaiveDate)> = Vec::with_capacity(labelled.len());
    let last = labelled.len().saturating_sub(1);
    for (pos, (row, date)) in labelled.iter().enumerate() {
        match date {
            Some(d) => dated.push((*row, *d)),
            None if pos == last && pos > 0 => {
                // the trailing "latest estimate" placeholder
                if let Some((_, prev)) = dated.last().copied() {
                    match dates::add_months(prev, frequency.vintage_offset_months()) {
                        Some(synth) => {
                            debug!(vintage = %synth, "synthesized trailing vintage");
                            dated.push((*row, synth));
                        }
                        None => dropped += 1,
                    }
                } else {
                    dropped += 1;
                }
            }
            None => dropped += 1,
        }
    }

    if dated.windows(2).any(|w| w[1].1 < w[0].1) {
        warn!("vintage column is not non-decreasing in sheet order");
    }

    VintageColumn {
        rows: dated,
        dropped,
    }
}
