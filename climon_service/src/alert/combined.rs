//! Combined heat/rain risk.
//!
//! Two rules have been used for the combined label and they do not agree, so
//! both are kept as named policies and the configuration picks one:
//!
//! - `PointSum`: one point each for Extreme heat, Extreme precipitation and a
//!   GeoSES score at or above the regional median, mapped onto
//!   Low / Moderate / High / Very High.
//! - `HazardMatrix`: which of heat and rain are at Severe or worse, giving
//!   None / Heat only / Rain only / Heat and Rain.
//!
//! Both are total. Missing per-variable classes never raise; they count as
//! the lowest tier.

use std::fmt;

use serde::Deserialize;

use crate::alert::thresholds::{HeatClass, PrecipitationClass, classify_heat, classify_precipitation};
use crate::model::JoinedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskPolicy {
    #[default]
    PointSum,
    HazardMatrix,
}

impl fmt::Display for RiskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskPolicy::PointSum => write!(f, "point_sum"),
            RiskPolicy::HazardMatrix => write!(f, "hazard_matrix"),
        }
    }
}

/// Ordered severity produced by `PointSum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }

    fn from_points(points: u8) -> Self {
        match points {
            0 => RiskLevel::Low,
            1 => RiskLevel::Moderate,
            2 => RiskLevel::High,
            _ => RiskLevel::VeryHigh,
        }
    }
}

/// Category produced by `HazardMatrix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardCombination {
    Neither,
    HeatOnly,
    RainOnly,
    HeatAndRain,
}

impl HazardCombination {
    pub fn label(self) -> &'static str {
        match self {
            HazardCombination::Neither => "None",
            HazardCombination::HeatOnly => "Heat only",
            HazardCombination::RainOnly => "Rain only",
            HazardCombination::HeatAndRain => "Heat and Rain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinedRisk {
    Level(RiskLevel),
    Hazard(HazardCombination),
}

impl CombinedRisk {
    pub fn label(self) -> &'static str {
        match self {
            CombinedRisk::Level(level) => level.label(),
            CombinedRisk::Hazard(hazard) => hazard.label(),
        }
    }
}

impl fmt::Display for CombinedRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Point-sum severity.
///
/// With neither heat nor precipitation classified (no threshold row), the
/// result is `Low` whatever the GeoSES score: vulnerability alone does not
/// raise the tier of a municipality we cannot assess.
pub fn point_sum(
    heat: Option<HeatClass>,
    precipitation: Option<PrecipitationClass>,
    geoses: Option<f64>,
    geoses_median: Option<f64>,
) -> RiskLevel {
    if heat.is_none() && precipitation.is_none() {
        return RiskLevel::Low;
    }

    let mut points = 0;
    if heat == Some(HeatClass::Extreme) {
        points += 1;
    }
    if precipitation == Some(PrecipitationClass::Extreme) {
        points += 1;
    }
    if let (Some(score), Some(median)) = (geoses, geoses_median) {
        if score >= median {
            points += 1;
        }
    }
    RiskLevel::from_points(points)
}

pub fn hazard_matrix(
    heat: Option<HeatClass>,
    precipitation: Option<PrecipitationClass>,
) -> HazardCombination {
    let hot = heat.is_some_and(HeatClass::is_severe_or_worse);
    let wet = precipitation.is_some_and(PrecipitationClass::is_severe_or_worse);
    match (hot, wet) {
        (false, false) => HazardCombination::Neither,
        (true, false) => HazardCombination::HeatOnly,
        (false, true) => HazardCombination::RainOnly,
        (true, true) => HazardCombination::HeatAndRain,
    }
}

/// Combined risk for one joined row under `policy`.
pub fn classify_combined(
    record: &JoinedRecord,
    policy: RiskPolicy,
    geoses_median: Option<f64>,
) -> CombinedRisk {
    let heat = classify_heat(record);
    let precipitation = classify_precipitation(record);
    match policy {
        RiskPolicy::PointSum => CombinedRisk::Level(point_sum(
            heat,
            precipitation,
            record.geoses(),
            geoses_median,
        )),
        RiskPolicy::HazardMatrix => CombinedRisk::Hazard(hazard_matrix(heat, precipitation)),
    }
}

/// Median of the non-NaN values; mean of the middle pair for even counts.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForecastRecord, MunicipalityKey, SocialIndexRecord, ThresholdRecord};
    use chrono::NaiveDate;

    fn record(ehf: f64, precip: f64, geoses: Option<f64>, with_thresholds: bool) -> JoinedRecord {
        let key = MunicipalityKey::new("Marabá");
        JoinedRecord {
            forecast: ForecastRecord {
                key: key.clone(),
                date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                temp_max: None,
                temp_min: None,
                temp_mean: None,
                humidity_max: None,
                humidity_min: None,
                precipitation: Some(precip),
                ehf: Some(ehf),
            },
            thresholds: with_thresholds.then(|| ThresholdRecord {
                key: key.clone(),
                ehf_p85: Some(4.0),
                ehf_p95: Some(6.0),
                humidity_max_p85: None,
                humidity_max_p95: None,
                precip_p80: Some(100.0),
                precip_p95: Some(120.0),
            }),
            social: geoses.map(|g| SocialIndexRecord {
                key,
                geoses: Some(g),
            }),
        }
    }

    #[test]
    fn test_point_sum_levels() {
        assert_eq!(
            point_sum(Some(HeatClass::Normal), Some(PrecipitationClass::Normal), None, None),
            RiskLevel::Low
        );
        assert_eq!(
            point_sum(Some(HeatClass::Extreme), Some(PrecipitationClass::Normal), None, None),
            RiskLevel::Moderate
        );
        assert_eq!(
            point_sum(
                Some(HeatClass::Extreme),
                Some(PrecipitationClass::Extreme),
                None,
                Some(0.5)
            ),
            RiskLevel::High
        );
        assert_eq!(
            point_sum(
                Some(HeatClass::Extreme),
                Some(PrecipitationClass::Extreme),
                Some(0.5),
                Some(0.5)
            ),
            RiskLevel::VeryHigh,
            "score equal to the median earns the vulnerability point"
        );
    }

    #[test]
    fn test_point_sum_severe_is_not_extreme() {
        assert_eq!(
            point_sum(Some(HeatClass::Severe), Some(PrecipitationClass::HighSevere), None, None),
            RiskLevel::Low
        );
    }

    #[test]
    fn test_point_sum_unassessable_municipality_is_low() {
        assert_eq!(point_sum(None, None, Some(0.9), Some(0.1)), RiskLevel::Low);
    }

    #[test]
    fn test_hazard_matrix_combinations() {
        assert_eq!(hazard_matrix(None, None), HazardCombination::Neither);
        assert_eq!(
            hazard_matrix(Some(HeatClass::Severe), Some(PrecipitationClass::Normal)),
            HazardCombination::HeatOnly
        );
        assert_eq!(
            hazard_matrix(None, Some(PrecipitationClass::HighSevere)),
            HazardCombination::RainOnly
        );
        assert_eq!(
            hazard_matrix(Some(HeatClass::Extreme), Some(PrecipitationClass::Extreme)),
            HazardCombination::HeatAndRain
        );
    }

    #[test]
    fn test_classify_combined_respects_policy() {
        let r = record(7.0, 125.0, Some(0.8), true);
        assert_eq!(
            classify_combined(&r, RiskPolicy::PointSum, Some(0.5)),
            CombinedRisk::Level(RiskLevel::VeryHigh)
        );
        assert_eq!(
            classify_combined(&r, RiskPolicy::HazardMatrix, Some(0.5)),
            CombinedRisk::Hazard(HazardCombination::HeatAndRain)
        );
    }

    #[test]
    fn test_classify_combined_without_thresholds_is_lowest_tier() {
        let r = record(50.0, 500.0, Some(0.9), false);
        assert_eq!(
            classify_combined(&r, RiskPolicy::PointSum, Some(0.1)),
            CombinedRisk::Level(RiskLevel::Low)
        );
        assert_eq!(
            classify_combined(&r, RiskPolicy::HazardMatrix, None),
            CombinedRisk::Hazard(HazardCombination::Neither)
        );
    }

    #[test]
    fn test_median() {
        assert_eq!(median(Vec::<f64>::new()), None);
        assert_eq!(median([3.0]), Some(3.0));
        assert_eq!(median([5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median([f64::NAN, 2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn test_policy_deserializes_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: RiskPolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"hazard_matrix\"").unwrap();
        assert_eq!(w.policy, RiskPolicy::HazardMatrix);
        assert_eq!(RiskPolicy::default(), RiskPolicy::PointSum);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CombinedRisk::Level(RiskLevel::VeryHigh).to_string(), "Very High");
        assert_eq!(CombinedRisk::Hazard(HazardCombination::Neither).to_string(), "None");
    }
}
