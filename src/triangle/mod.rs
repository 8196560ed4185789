// src/triangle/mod.rs
//
// The triangle extraction & normalization engine: anchor detection, date
// format inference, trailing-vintage synthesis, wide-to-long reshaping and
// identity annotation, applied uniformly to quarterly and monthly sheets.

use arrow::record_batch::RecordBatch;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{Frequency, SeriesIdentity};
use crate::grid::CellGrid;

pub mod anchor;
pub mod annotate;
pub mod dates;
pub mod layout;
pub mod reshape;
pub mod vintage;

pub use annotate::IdentityLexicon;
pub use reshape::ReshapeStats;

/// Structural failures that make a sheet or file unusable. Per-row failures
/// (unparseable dates, non-numeric values) are absorbed as dropped rows and
/// reported through [`ReshapeStats`] instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// None of the accepted period-label spellings was found in the grid.
    #[error("no recognized period-label anchor found in sheet")]
    Layout,
    /// The file's declared series identity is not in the configured set.
    #[error("series `{0}` is not present in the configured identity set")]
    ConfigurationMismatch(String),
    #[error("building record batch: {0}")]
    Table(#[from] arrow::error::ArrowError),
}

/// One sheet's normalized output plus its drop counters.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub batch: RecordBatch,
    pub stats: ReshapeStats,
}

/// Run the full pipeline on one sheet's grid.
///
/// Pure with respect to the grid: the same input yields an identical batch
/// every time, and nothing is mutated in place.
#[instrument(level = "debug", skip_all, fields(code = %identity.code))]
pub fn extract_triangle(
    grid: &CellGrid,
    identity: &SeriesIdentity,
    frequency: Frequency,
    lexicon: &IdentityLexicon,
) -> Result<Extraction, ExtractError> {
    let compacted = grid.compact();
    let found = anchor::locate(&compacted)?;
    debug!(
        row = found.row,
        col = found.col,
        label = found.matched,
        "anchor located"
    );

    let layout = layout::Layout::classify(&compacted, &found);
    let trimmed = layout.trim(&compacted, &found);

    let vintage_format = dates::vintage_format_override(&identity.code);
    let (long, stats) = reshape::reshape(&trimmed, vintage_format, frequency);

    let batch = annotate::annotate(&long, identity, lexicon)?;
    Ok(Extraction { batch, stats })
}
