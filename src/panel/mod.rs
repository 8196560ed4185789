// src/panel/mod.rs
//
// Panel assembly and persistence: concatenate every per-sheet batch (plus
// the non-revised series batches) into one table and write it as parquet,
// with a JSON audit of per-file outcomes alongside.

use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression};
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
    sync::Arc,
};
use tracing::info;

use crate::triangle::ReshapeStats;

static PANEL_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let dict = DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8));
    Arc::new(Schema::new(vec![
        Field::new("vintage", DataType::Date32, false),
        Field::new("datetime", DataType::Date32, false),
        Field::new("value", DataType::Float64, false),
        Field::new("code", dict.clone(), false),
        Field::new("short_name", dict.clone(), false),
        Field::new("long_name", dict.clone(), false),
        Field::new("measure", dict, false),
    ]))
});

/// The canonical RevisionRecord schema shared by every batch in the panel.
pub fn panel_schema() -> SchemaRef {
    PANEL_SCHEMA.clone()
}

/// Concatenate per-file batches into one panel. Order across files carries
/// no meaning; order within a file is preserved. No deduplication: source
/// files are assumed disjoint by series.
pub fn assemble_panel(batches: &[RecordBatch]) -> Result<RecordBatch> {
    concat_batches(&panel_schema(), batches).context("concatenating panel batches")
}

/// Write the panel as a single parquet file, dictionary-encoded, via a
/// temporary path renamed over the destination.
pub fn write_panel(panel: &RecordBatch, path: &Path) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(
            BrotliLevel::try_new(5).expect("brotli level 5 is in range"),
        ))
        .set_dictionary_enabled(true)
        .build();

    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, panel.schema(), Some(props))
        .context("opening parquet writer")?;
    writer.write(panel).context("writing panel batch")?;
    writer.close().context("closing parquet writer")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    info!(rows = panel.num_rows(), path = %path.display(), "wrote panel");
    Ok(())
}

/// Per-file outcome, recorded whether the file made it into the panel or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub code: String,
    /// What was processed: a file path, sheet name or API endpoint.
    pub source: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Extracted {
        rows: usize,
        #[serde(flatten)]
        stats: ReshapeStats,
    },
    Skipped {
        reason: String,
    },
}

/// Machine-readable account of what the panel silently omits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audit {
    pub files: Vec<FileOutcome>,
}

impl Audit {
    pub fn record_extracted(&mut self, code: &str, source: &str, rows: usize, stats: ReshapeStats) {
        self.files.push(FileOutcome {
            code: code.to_string(),
            source: source.to_string(),
            outcome: Outcome::Extracted { rows, stats },
        });
    }

    pub fn record_skipped(&mut self, code: &str, source: &str, reason: String) {
        self.files.push(FileOutcome {
            code: code.to_string(),
            source: source.to_string(),
            outcome: Outcome::Skipped { reason },
        });
    }

    pub fn skipped_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, Outcome::Skipped { .. }))
            .count()
    }

    /// Pretty-printed JSON, written atomically next to the panel.
    pub fn write(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let mut tmp = File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        serde_json::to_writer_pretty(&mut tmp, self).context("serializing audit")?;
        tmp.write_all(b"\n")?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
        Ok(())
    }
}
