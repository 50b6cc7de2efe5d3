//! Percentile threshold classification.
//!
//! Heat, humidity and precipitation are each banded against a pair of
//! municipality-specific percentiles. Bands are half-open: a value equal to
//! the lower percentile is already in the middle band, and a value equal to
//! the upper percentile is in the top band.
//!
//! ```text
//!   value < lower           → Normal
//!   lower ≤ value < upper   → middle band
//!   value ≥ upper           → top band
//! ```
//!
//! `None` is the "missing" outcome: the measured value or either percentile
//! is absent (or NaN), typically because the municipality had no threshold row.

use std::fmt;

use crate::model::{JoinedRecord, ThresholdRecord};

/// Position of a value relative to a (lower, upper) percentile pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    Normal,
    Middle,
    Top,
}

/// Bands `value` against `[lower, upper)`.
///
/// The upper percentile takes precedence, so if a sheet has the pair inverted
/// (lower > upper) values at or above `upper` still land in the top band.
pub fn band(value: Option<f64>, lower: Option<f64>, upper: Option<f64>) -> Option<Band> {
    let value = value.filter(|v| !v.is_nan())?;
    let lower = lower.filter(|v| !v.is_nan())?;
    let upper = upper.filter(|v| !v.is_nan())?;

    if value >= upper {
        Some(Band::Top)
    } else if value >= lower {
        Some(Band::Middle)
    } else {
        Some(Band::Normal)
    }
}

// ---------------------------------------------------------------------------
// Heat
// ---------------------------------------------------------------------------

/// Excess-heat situation from EHF vs p85/p95, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeatClass {
    Normal,
    Severe,
    Extreme,
}

impl HeatClass {
    pub fn label(self) -> &'static str {
        match self {
            HeatClass::Normal => "Normal",
            HeatClass::Severe => "Severe",
            HeatClass::Extreme => "Extreme",
        }
    }

    pub fn is_severe_or_worse(self) -> bool {
        self >= HeatClass::Severe
    }
}

impl From<Band> for HeatClass {
    fn from(band: Band) -> Self {
        match band {
            Band::Normal => HeatClass::Normal,
            Band::Middle => HeatClass::Severe,
            Band::Top => HeatClass::Extreme,
        }
    }
}

pub fn classify_heat(record: &JoinedRecord) -> Option<HeatClass> {
    band(record.forecast.ehf, record.ehf_p85(), record.ehf_p95()).map(HeatClass::from)
}

// ---------------------------------------------------------------------------
// Humidity
// ---------------------------------------------------------------------------

/// Maximum relative humidity vs p85/p95.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HumidityClass {
    Normal,
    HighSevere,
    HighExtreme,
}

impl HumidityClass {
    pub fn label(self) -> &'static str {
        match self {
            HumidityClass::Normal => "Normal",
            HumidityClass::HighSevere => "High-Severe",
            HumidityClass::HighExtreme => "High-Extreme",
        }
    }
}

impl From<Band> for HumidityClass {
    fn from(band: Band) -> Self {
        match band {
            Band::Normal => HumidityClass::Normal,
            Band::Middle => HumidityClass::HighSevere,
            Band::Top => HumidityClass::HighExtreme,
        }
    }
}

pub fn classify_humidity(record: &JoinedRecord) -> Option<HumidityClass> {
    band(
        record.forecast.humidity_max,
        record.humidity_max_p85(),
        record.humidity_max_p95(),
    )
    .map(HumidityClass::from)
}

// ---------------------------------------------------------------------------
// Precipitation
// ---------------------------------------------------------------------------

/// Accumulated daily precipitation vs p80/p95.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrecipitationClass {
    Normal,
    HighSevere,
    Extreme,
}

impl PrecipitationClass {
    pub fn label(self) -> &'static str {
        match self {
            PrecipitationClass::Normal => "Normal",
            PrecipitationClass::HighSevere => "High-Severe",
            PrecipitationClass::Extreme => "Extreme",
        }
    }

    pub fn is_severe_or_worse(self) -> bool {
        self >= PrecipitationClass::HighSevere
    }
}

impl From<Band> for PrecipitationClass {
    fn from(band: Band) -> Self {
        match band {
            Band::Normal => PrecipitationClass::Normal,
            Band::Middle => PrecipitationClass::HighSevere,
            Band::Top => PrecipitationClass::Extreme,
        }
    }
}

pub fn classify_precipitation(record: &JoinedRecord) -> Option<PrecipitationClass> {
    band(
        record.forecast.precipitation,
        record.precip_p80(),
        record.precip_p95(),
    )
    .map(PrecipitationClass::from)
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_label!(HeatClass, HumidityClass, PrecipitationClass);

// ---------------------------------------------------------------------------
// Sanity checks on reference data
// ---------------------------------------------------------------------------

/// Names the percentile pairs of `t` whose lower bound exceeds the upper one.
pub fn inverted_pairs(t: &ThresholdRecord) -> Vec<&'static str> {
    let pairs = [
        ("ehf_p85 > ehf_p95", t.ehf_p85, t.ehf_p95),
        (
            "humidity_max_p85 > humidity_max_p95",
            t.humidity_max_p85,
            t.humidity_max_p95,
        ),
        ("precip_p80 > precip_p95", t.precip_p80, t.precip_p95),
    ];
    pairs
        .into_iter()
        .filter_map(|(name, lo, hi)| match (lo, hi) {
            (Some(lo), Some(hi)) if lo > hi => Some(name),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForecastRecord, MunicipalityKey};
    use chrono::NaiveDate;

    fn record(ehf: Option<f64>, humidity_max: Option<f64>, precip: Option<f64>) -> JoinedRecord {
        JoinedRecord {
            forecast: ForecastRecord {
                key: MunicipalityKey::new("Altamira"),
                date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                temp_max: Some(34.0),
                temp_min: Some(23.0),
                temp_mean: Some(28.0),
                humidity_max,
                humidity_min: Some(55.0),
                precipitation: precip,
                ehf,
            },
            thresholds: Some(ThresholdRecord {
                key: MunicipalityKey::new("Altamira"),
                ehf_p85: Some(4.0),
                ehf_p95: Some(6.0),
                humidity_max_p85: Some(90.0),
                humidity_max_p95: Some(95.0),
                precip_p80: Some(100.0),
                precip_p95: Some(120.0),
            }),
            social: None,
        }
    }

    fn without_thresholds(mut r: JoinedRecord) -> JoinedRecord {
        r.thresholds = None;
        r
    }

    // --- Heat ---------------------------------------------------------------

    #[test]
    fn test_heat_between_percentiles_is_severe() {
        let r = record(Some(5.0), None, None);
        assert_eq!(classify_heat(&r), Some(HeatClass::Severe));
    }

    #[test]
    fn test_heat_exactly_at_p85_is_severe_not_normal() {
        let r = record(Some(4.0), None, None);
        assert_eq!(
            classify_heat(&r),
            Some(HeatClass::Severe),
            "p85 is the inclusive lower edge of the severe band"
        );
    }

    #[test]
    fn test_heat_exactly_at_p95_is_extreme_not_severe() {
        let r = record(Some(6.0), None, None);
        assert_eq!(classify_heat(&r), Some(HeatClass::Extreme));
    }

    #[test]
    fn test_heat_below_p85_is_normal() {
        let r = record(Some(3.999), None, None);
        assert_eq!(classify_heat(&r), Some(HeatClass::Normal));
        let r = record(Some(-12.0), None, None);
        assert_eq!(classify_heat(&r), Some(HeatClass::Normal));
    }

    #[test]
    fn test_heat_missing_index_or_thresholds_is_missing() {
        assert_eq!(classify_heat(&record(None, None, None)), None);
        assert_eq!(classify_heat(&record(Some(f64::NAN), None, None)), None);
        assert_eq!(
            classify_heat(&without_thresholds(record(Some(9.0), None, None))),
            None
        );

        let mut r = record(Some(9.0), None, None);
        if let Some(t) = r.thresholds.as_mut() {
            t.ehf_p95 = None;
        }
        assert_eq!(classify_heat(&r), None, "one absent percentile is enough");
    }

    #[test]
    fn test_heat_bands_are_contiguous_and_exhaustive() {
        // Sweep across both edges: every value lands in exactly one band and
        // severity never decreases as the value increases.
        let mut last = HeatClass::Normal;
        let mut v = 0.0;
        while v <= 10.0 {
            let class = classify_heat(&record(Some(v), None, None))
                .expect("non-missing inputs always classify");
            assert!(class >= last, "severity decreased at {}", v);
            last = class;
            v += 0.25;
        }
        assert_eq!(last, HeatClass::Extreme);
    }

    // --- Humidity -----------------------------------------------------------

    #[test]
    fn test_humidity_bands() {
        assert_eq!(
            classify_humidity(&record(None, Some(89.9), None)),
            Some(HumidityClass::Normal)
        );
        assert_eq!(
            classify_humidity(&record(None, Some(90.0), None)),
            Some(HumidityClass::HighSevere)
        );
        assert_eq!(
            classify_humidity(&record(None, Some(95.0), None)),
            Some(HumidityClass::HighExtreme)
        );
    }

    #[test]
    fn test_humidity_without_thresholds_is_missing() {
        let r = without_thresholds(record(None, Some(50.0), None));
        assert_eq!(classify_humidity(&r), None);
    }

    // --- Precipitation ------------------------------------------------------

    #[test]
    fn test_precipitation_at_p95_is_extreme() {
        let r = record(None, None, Some(120.0));
        assert_eq!(classify_precipitation(&r), Some(PrecipitationClass::Extreme));
    }

    #[test]
    fn test_precipitation_bands() {
        assert_eq!(
            classify_precipitation(&record(None, None, Some(0.0))),
            Some(PrecipitationClass::Normal)
        );
        assert_eq!(
            classify_precipitation(&record(None, None, Some(100.0))),
            Some(PrecipitationClass::HighSevere)
        );
        assert_eq!(
            classify_precipitation(&record(None, None, Some(119.9))),
            Some(PrecipitationClass::HighSevere)
        );
    }

    #[test]
    fn test_missing_measurement_is_missing_not_normal() {
        assert_eq!(classify_humidity(&record(None, None, None)), None);
        assert_eq!(classify_precipitation(&record(None, None, None)), None);
    }

    // --- Band helper --------------------------------------------------------

    #[test]
    fn test_inverted_pair_still_puts_upper_edge_in_top_band() {
        assert_eq!(band(Some(7.0), Some(10.0), Some(5.0)), Some(Band::Top));
        assert_eq!(band(Some(4.0), Some(10.0), Some(5.0)), Some(Band::Normal));
    }

    #[test]
    fn test_inverted_pairs_are_reported() {
        let t = ThresholdRecord {
            key: MunicipalityKey::new("Altamira"),
            ehf_p85: Some(6.0),
            ehf_p95: Some(4.0),
            humidity_max_p85: Some(90.0),
            humidity_max_p95: Some(95.0),
            precip_p80: Some(100.0),
            precip_p95: None,
        };
        assert_eq!(inverted_pairs(&t), vec!["ehf_p85 > ehf_p95"]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(HeatClass::Severe.to_string(), "Severe");
        assert_eq!(HumidityClass::HighExtreme.to_string(), "High-Extreme");
        assert_eq!(PrecipitationClass::HighSevere.to_string(), "High-Severe");
    }
}
