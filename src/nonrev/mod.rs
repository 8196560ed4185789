// src/nonrev/mod.rs
//
// Client for the non-revised time-series API: a simple fetch-and-reshape
// path with no layout ambiguity. Output is already in the canonical panel
// schema and concatenates without further transformation.

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SeriesIdentity;
use crate::triangle::annotate::{annotate, IdentityLexicon};
use crate::triangle::reshape::LongTable;

const SEARCH_URL: &str = "https://api.beta.ons.gov.uk/v1/search";
const DATA_URL: &str = "https://api.beta.ons.gov.uk/v1/data";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(default)]
    months: Vec<Observation>,
}

/// One monthly observation as the API reports it: both fields are strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    pub date: String,
    pub value: String,
}

/// Fetch the monthly observations for one series code (CDID): search for
/// the series URI first, then pull its data document.
pub async fn fetch_series(client: &Client, code: &str) -> Result<Vec<Observation>> {
    let search: SearchResponse = client
        .get(SEARCH_URL)
        .query(&[("content_type", "timeseries"), ("cdids", code)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .with_context(|| format!("decoding search response for {code}"))?;

    let uri = search
        .items
        .first()
        .map(|i| i.uri.clone())
        .with_context(|| format!("time series {code} not found"))?;

    let data: DataResponse = client
        .get(DATA_URL)
        .query(&[("uri", uri.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .with_context(|| format!("decoding data response for {code}"))?;

    debug!(code, observations = data.months.len(), "fetched series");
    Ok(data.months)
}

/// Reshape API observations into a canonical-schema batch. Non-revised
/// series have no vintage dimension, so vintage = datetime on every row.
/// Unparseable observations are dropped, never coerced.
pub fn to_batch(
    observations: &[Observation],
    identity: &SeriesIdentity,
    lexicon: &IdentityLexicon,
) -> Result<RecordBatch> {
    let mut long = LongTable::default();
    let mut dropped = 0usize;
    for obs in observations {
        let parsed = parse_month(&obs.date).zip(obs.value.trim().parse::<f64>().ok());
        match parsed {
            Some((date, value)) => {
                long.vintage.push(date);
                long.datetime.push(date);
                long.value.push(value);
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(code = %identity.code, dropped, "dropped unparseable observations");
    }
    annotate(&long, identity, lexicon).map_err(Into::into)
}

/// The API labels months as `"1997 JAN"`.
fn parse_month(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{} 1", label.trim()), "%Y %b %d").ok()
}
