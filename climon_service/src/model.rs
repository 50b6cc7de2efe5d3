//! Core data types for the northern-region climate risk dashboard.
//!
//! This module defines the shared domain model imported by all other modules:
//! the normalized municipality key, the three source record types, the joined
//! record produced by `analysis::join`, the geometry record, and the load-time
//! error type. It contains no I/O.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::analysis::join::JoinError;

// ---------------------------------------------------------------------------
// Municipality key
// ---------------------------------------------------------------------------

/// Canonical form of a municipality name: surrounding whitespace removed,
/// upper-cased.
///
/// Every table's key column goes through this before any join. Applying it
/// to an already-normalized name returns the same name.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// A normalized municipality identifier, the sole join key across tables.
///
/// An empty key is legal (blank cell in the source) and simply never matches
/// anything in the join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MunicipalityKey(String);

impl MunicipalityKey {
    pub fn new(raw: &str) -> Self {
        MunicipalityKey(normalize_name(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MunicipalityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything carrying a municipality key.
pub trait Keyed {
    fn key(&self) -> &MunicipalityKey;
}

// ---------------------------------------------------------------------------
// Source tables
// ---------------------------------------------------------------------------

/// The three tabular inputs, used to label errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Forecast,
    Thresholds,
    Social,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Forecast => write!(f, "forecast"),
            Table::Thresholds => write!(f, "thresholds"),
            Table::Social => write!(f, "social index"),
        }
    }
}

/// Numeric forecast fields that can be mapped directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    TempMax,
    TempMin,
    TempMean,
    HumidityMax,
    HumidityMin,
    Precipitation,
    Ehf,
}

/// One municipality on one forecast day.
///
/// Temperatures in °C, humidity in %, precipitation accumulated over the day
/// in mm. `ehf` is the Excess Heat Factor for the day.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub key: MunicipalityKey,
    pub date: NaiveDate,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_mean: Option<f64>,
    pub humidity_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub precipitation: Option<f64>,
    pub ehf: Option<f64>,
}

impl ForecastRecord {
    pub fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::TempMax => self.temp_max,
            Measure::TempMin => self.temp_min,
            Measure::TempMean => self.temp_mean,
            Measure::HumidityMax => self.humidity_max,
            Measure::HumidityMin => self.humidity_min,
            Measure::Precipitation => self.precipitation,
            Measure::Ehf => self.ehf,
        }
    }
}

/// Climatological percentile thresholds for one municipality.
///
/// Pairs are expected in ascending order (p85 < p95, p80 < p95). Any value may
/// be blank in the source sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRecord {
    pub key: MunicipalityKey,
    pub ehf_p85: Option<f64>,
    pub ehf_p95: Option<f64>,
    pub humidity_max_p85: Option<f64>,
    pub humidity_max_p95: Option<f64>,
    pub precip_p80: Option<f64>,
    pub precip_p95: Option<f64>,
}

/// GeoSES socio-environmental vulnerability score for one municipality.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialIndexRecord {
    pub key: MunicipalityKey,
    pub geoses: Option<f64>,
}

impl Keyed for ForecastRecord {
    fn key(&self) -> &MunicipalityKey {
        &self.key
    }
}

impl Keyed for ThresholdRecord {
    fn key(&self) -> &MunicipalityKey {
        &self.key
    }
}

impl Keyed for SocialIndexRecord {
    fn key(&self) -> &MunicipalityKey {
        &self.key
    }
}

// ---------------------------------------------------------------------------
// Joined record
// ---------------------------------------------------------------------------

/// A forecast row left-joined with its municipality's reference data.
///
/// `thresholds` / `social` are `None` when the municipality had no row in
/// that table; the accessors below fold that into per-field `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub forecast: ForecastRecord,
    pub thresholds: Option<ThresholdRecord>,
    pub social: Option<SocialIndexRecord>,
}

impl JoinedRecord {
    pub fn key(&self) -> &MunicipalityKey {
        &self.forecast.key
    }

    pub fn date(&self) -> NaiveDate {
        self.forecast.date
    }

    fn threshold(&self, pick: fn(&ThresholdRecord) -> Option<f64>) -> Option<f64> {
        self.thresholds.as_ref().and_then(pick)
    }

    pub fn ehf_p85(&self) -> Option<f64> {
        self.threshold(|t| t.ehf_p85)
    }

    pub fn ehf_p95(&self) -> Option<f64> {
        self.threshold(|t| t.ehf_p95)
    }

    pub fn humidity_max_p85(&self) -> Option<f64> {
        self.threshold(|t| t.humidity_max_p85)
    }

    pub fn humidity_max_p95(&self) -> Option<f64> {
        self.threshold(|t| t.humidity_max_p95)
    }

    pub fn precip_p80(&self) -> Option<f64> {
        self.threshold(|t| t.precip_p80)
    }

    pub fn precip_p95(&self) -> Option<f64> {
        self.threshold(|t| t.precip_p95)
    }

    pub fn geoses(&self) -> Option<f64> {
        self.social.as_ref().and_then(|s| s.geoses)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A municipality boundary from the GeoJSON layer, keyed like the tables.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub key: MunicipalityKey,
    pub geometry: Option<geojson::Geometry>,
}

impl Keyed for GeometryRecord {
    fn key(&self) -> &MunicipalityKey {
        &self.key
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal conditions raised while loading the inputs at startup.
///
/// None of these are retried: the inputs are static local files, so a
/// failure means the operator has to fix the file or the configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed CSV in {origin}: {source}")]
    Csv { origin: String, source: csv::Error },

    #[error("{table} table ({origin}) is missing required column '{field}'")]
    MissingColumn {
        table: Table,
        origin: String,
        field: &'static str,
    },

    #[error("{table} table ({origin}) has two columns for '{field}': '{first}' and '{second}'")]
    AmbiguousColumn {
        table: Table,
        origin: String,
        field: &'static str,
        first: String,
        second: String,
    },

    #[error("{table} table ({origin}) line {line}: cannot parse '{value}' as {field}")]
    BadValue {
        table: Table,
        origin: String,
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("malformed GeoJSON in {origin}: {source}")]
    GeoJson {
        origin: String,
        source: geojson::Error,
    },

    #[error("{origin} is not a GeoJSON FeatureCollection")]
    NotFeatureCollection { origin: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Join(#[from] JoinError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(normalize_name("  Belém "), "BELÉM");
        assert_eq!(normalize_name("\tmanaus\n"), "MANAUS");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["  Santarém", "rio branco ", "PORTO VELHO", "", "   "] {
            let once = normalize_name(raw);
            assert_eq!(
                normalize_name(&once),
                once,
                "normalizing '{}' twice should not change it",
                raw
            );
        }
    }

    #[test]
    fn test_blank_key_is_empty() {
        assert!(MunicipalityKey::new("   ").is_empty());
        assert!(!MunicipalityKey::new("Macapá").is_empty());
    }

    #[test]
    fn test_keys_from_different_spellings_are_equal() {
        assert_eq!(MunicipalityKey::new("Boa Vista"), MunicipalityKey::new(" BOA VISTA"));
    }

    #[test]
    fn test_joined_accessors_propagate_missing_reference_rows() {
        let record = JoinedRecord {
            forecast: ForecastRecord {
                key: MunicipalityKey::new("Palmas"),
                date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                temp_max: Some(35.0),
                temp_min: None,
                temp_mean: None,
                humidity_max: Some(80.0),
                humidity_min: None,
                precipitation: Some(4.0),
                ehf: Some(1.5),
            },
            thresholds: None,
            social: None,
        };
        assert_eq!(record.ehf_p85(), None);
        assert_eq!(record.precip_p95(), None);
        assert_eq!(record.geoses(), None);
        assert_eq!(record.forecast.measure(Measure::TempMax), Some(35.0));
    }
}
