//! Classification of joined forecast rows.
//!
//! `thresholds` bands heat, humidity and precipitation against each
//! municipality's percentiles; `combined` derives the overall risk label
//! from those bands under a configurable policy.

pub mod combined;
pub mod thresholds;

pub use combined::{CombinedRisk, HazardCombination, RiskLevel, RiskPolicy, classify_combined};
pub use thresholds::{
    HeatClass, HumidityClass, PrecipitationClass, classify_heat, classify_humidity,
    classify_precipitation,
};
