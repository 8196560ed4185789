// src/config/mod.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};

/// Publication frequency of a revised series, as declared in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Quarterly,
    Monthly,
}

impl Frequency {
    /// How far the trailing "latest estimate" vintage sits past the last
    /// dated vintage row: one reporting period.
    pub fn vintage_offset_months(self) -> u32 {
        match self {
            Frequency::Quarterly => 3,
            Frequency::Monthly => 1,
        }
    }
}

/// The four identity fields attached uniformly to every emitted record.
/// Supplied by configuration per source file, never derived from the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesIdentity {
    pub code: String,
    pub short_name: String,
    pub long_name: String,
    pub measure: String,
}

/// One revised series: identity plus where and how to fetch its triangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    #[serde(flatten)]
    pub identity: SeriesIdentity,
    pub frequency: Frequency,
    /// Landing page listing the downloadable spreadsheet/zip.
    pub url: String,
}

/// One non-revised series, fetched from the time-series API by its code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonRevConfig {
    #[serde(flatten)]
    pub identity: SeriesIdentity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
    #[serde(default)]
    pub nonrev: Vec<NonRevConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Every configured identity, revised and non-revised alike. This is the
    /// full alphabet for the panel's category-encoded identity columns.
    pub fn identities(&self) -> impl Iterator<Item = &SeriesIdentity> {
        self.series
            .iter()
            .map(|s| &s.identity)
            .chain(self.nonrev.iter().map(|s| &s.identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_config() {
        let yaml = r#"
series:
  - code: abmi
    short_name: gdp
    long_name: Gross Domestic Product
    measure: CVM SA
    frequency: quarterly
    url: https://example.org/gdp-revisions
  - code: abjr
    short_name: consumption
    long_name: Household final consumption expenditure
    measure: CVM SA
    frequency: monthly
    url: https://example.org/consumption
nonrev:
  - code: d7bt
    short_name: cpi
    long_name: Consumer Prices Index
    measure: index
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.series.len(), 2);
        assert_eq!(config.series[0].frequency, Frequency::Quarterly);
        assert_eq!(config.series[1].identity.code, "abjr");
        assert_eq!(config.nonrev[0].identity.short_name, "cpi");
        assert_eq!(config.identities().count(), 3);
    }

    #[test]
    fn vintage_offset_tracks_frequency() {
        assert_eq!(Frequency::Quarterly.vintage_offset_months(), 3);
        assert_eq!(Frequency::Monthly.vintage_offset_months(), 1);
    }
}
