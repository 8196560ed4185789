// src/triangle/annotate.rs
//
// Attaches series identity to a long table and category-encodes it. The
// dictionary alphabet comes from the full configured series list, not from
// the values seen in one file, so every batch in the panel shares one
// dictionary per column and stays compact under concatenation.

use arrow::array::{ArrayRef, Date32Array, DictionaryArray, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{Date32Type, Int32Type};
use arrow::record_batch::RecordBatch;
use std::{collections::HashMap, sync::Arc};

use crate::config::{Config, SeriesIdentity};
use crate::panel;
use crate::triangle::reshape::LongTable;
use crate::triangle::ExtractError;

#[derive(Debug, Clone)]
struct DictValues {
    values: ArrayRef,
    index: HashMap<String, i32>,
}

impl DictValues {
    fn build<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut index = HashMap::new();
        let mut ordered: Vec<&str> = Vec::new();
        for v in values {
            if !index.contains_key(v) {
                index.insert(v.to_string(), ordered.len() as i32);
                ordered.push(v);
            }
        }
        DictValues {
            values: Arc::new(StringArray::from(ordered)),
            index,
        }
    }

    fn key(&self, value: &str) -> Option<i32> {
        self.index.get(value).copied()
    }

    /// A dictionary column of `len` rows all pointing at one entry.
    fn constant(&self, key: i32, len: usize) -> Result<ArrayRef, ExtractError> {
        let keys = Int32Array::from(vec![key; len]);
        let dict = DictionaryArray::<Int32Type>::try_new(keys, self.values.clone())?;
        Ok(Arc::new(dict))
    }
}

/// The bounded alphabet for the four identity columns, built once from
/// configuration and shared by every extraction.
#[derive(Debug, Clone)]
pub struct IdentityLexicon {
    codes: DictValues,
    short_names: DictValues,
    long_names: DictValues,
    measures: DictValues,
}

impl IdentityLexicon {
    pub fn from_config(config: &Config) -> Self {
        IdentityLexicon {
            codes: DictValues::build(config.identities().map(|i| i.code.as_str())),
            short_names: DictValues::build(config.identities().map(|i| i.short_name.as_str())),
            long_names: DictValues::build(config.identities().map(|i| i.long_name.as_str())),
            measures: DictValues::build(config.identities().map(|i| i.measure.as_str())),
        }
    }
}

/// Broadcast the four identity fields over every row of `long` and build the
/// canonical-schema record batch. An identity absent from the lexicon means
/// the file's declared series is not configured: fatal for the file.
pub fn annotate(
    long: &LongTable,
    identity: &SeriesIdentity,
    lexicon: &IdentityLexicon,
) -> Result<RecordBatch, ExtractError> {
    let mismatch = || ExtractError::ConfigurationMismatch(identity.code.clone());
    let code_key = lexicon.codes.key(&identity.code).ok_or_else(mismatch)?;
    let short_key = lexicon
        .short_names
        .key(&identity.short_name)
        .ok_or_else(mismatch)?;
    let long_key = lexicon
        .long_names
        .key(&identity.long_name)
        .ok_or_else(mismatch)?;
    let measure_key = lexicon.measures.key(&identity.measure).ok_or_else(mismatch)?;

    let n = long.len();
    let vintage = Date32Array::from_iter_values(
        long.vintage.iter().map(|d| Date32Type::from_naive_date(*d)),
    );
    let datetime = Date32Array::from_iter_values(
        long.datetime.iter().map(|d| Date32Type::from_naive_date(*d)),
    );
    let value = Float64Array::from(long.value.clone());

    let columns: Vec<ArrayRef> = vec![
        Arc::new(vintage),
        Arc::new(datetime),
        Arc::new(value),
        lexicon.codes.constant(code_key, n)?,
        lexicon.short_names.constant(short_key, n)?,
        lexicon.long_names.constant(long_key, n)?,
        lexicon.measures.constant(measure_key, n)?,
    ];

    RecordBatch::try_new(panel::panel_schema(), columns).map_err(ExtractError::from)
}
