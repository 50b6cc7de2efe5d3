//! Load-once dashboard context.
//!
//! All inputs are read, normalized and joined exactly once at startup into a
//! `DashboardContext`. It is immutable afterwards; every selector change is a
//! fresh, pure lookup against it, so two identical requests always produce
//! identical results.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::NaiveDate;

use crate::alert::combined::median;
use crate::alert::thresholds::inverted_pairs;
use crate::alert::{
    CombinedRisk, HeatClass, HumidityClass, PrecipitationClass, RiskPolicy, classify_combined,
    classify_heat, classify_humidity, classify_precipitation,
};
use crate::analysis::join::{self, JoinError};
use crate::config::Config;
use crate::ingest::{geometry, tables};
use crate::layer::{LayerEntry, LayerValue, LookupError, MapLayer};
use crate::logging::{self, Source};
use crate::model::{
    ForecastRecord, GeometryRecord, JoinedRecord, LoadError, MunicipalityKey, SocialIndexRecord,
    ThresholdRecord,
};
use crate::variables::{VariableSource, color_for, find_variable};

/// A joined row together with every label derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord<'a> {
    pub record: &'a JoinedRecord,
    pub heat: Option<HeatClass>,
    pub humidity: Option<HumidityClass>,
    pub precipitation: Option<PrecipitationClass>,
    pub combined: CombinedRisk,
}

impl ClassifiedRecord<'_> {
    /// The value this row contributes to a map of `source`.
    pub fn value(&self, source: VariableSource) -> LayerValue {
        let category = |label: Option<&'static str>| {
            label.map(LayerValue::Category).unwrap_or(LayerValue::Missing)
        };
        match source {
            VariableSource::Measure(measure) => self
                .record
                .forecast
                .measure(measure)
                .filter(|v| !v.is_nan())
                .map(LayerValue::Number)
                .unwrap_or(LayerValue::Missing),
            VariableSource::Heat => category(self.heat.map(HeatClass::label)),
            VariableSource::Humidity => category(self.humidity.map(HumidityClass::label)),
            VariableSource::Precipitation => {
                category(self.precipitation.map(PrecipitationClass::label))
            }
            VariableSource::CombinedRisk => LayerValue::Category(self.combined.label()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardContext {
    joined: Vec<JoinedRecord>,
    geometry: Vec<GeometryRecord>,
    policy: RiskPolicy,
    geoses_median: Option<f64>,
    dates: Vec<NaiveDate>,
}

impl DashboardContext {
    /// Reads every configured input and builds the context.
    ///
    /// Any unreadable or malformed file, or an ambiguous join, is fatal.
    pub fn load(config: &Config) -> Result<Self, LoadError> {
        let options = config.csv_options()?;

        let forecast = load_logged(Source::Forecast, &config.forecast_path(), |p| {
            tables::read_forecast(p, &options)
        })?;
        let thresholds = load_logged(Source::Thresholds, &config.thresholds_path(), |p| {
            tables::read_thresholds(p, &options)
        })?;
        let social = load_logged(Source::Social, &config.social_path(), |p| {
            tables::read_social(p, &options)
        })?;
        let geometry = load_logged(Source::Geometry, &config.geometry_path(), |p| {
            geometry::read_geometry(p, &config.sources.geometry_key_property)
        })?;

        for row in &thresholds {
            for pair in inverted_pairs(row) {
                logging::warn(
                    Source::Thresholds,
                    Some(row.key.as_str()),
                    &format!("inverted percentiles ({})", pair),
                );
            }
        }

        let context = Self::from_tables(
            &forecast,
            &thresholds,
            &social,
            geometry,
            config.risk.policy,
        )
        .inspect_err(|e| logging::error(Source::System, None, &e.to_string()))?;

        logging::log_join_summary(&join::summarize(&context.joined));
        logging::info(
            Source::System,
            None,
            &format!(
                "{} forecast dates, combined risk policy '{}'",
                context.dates.len(),
                context.policy
            ),
        );
        Ok(context)
    }

    /// Builds the context from already-loaded tables.
    pub fn from_tables(
        forecast: &[ForecastRecord],
        thresholds: &[ThresholdRecord],
        social: &[SocialIndexRecord],
        geometry: Vec<GeometryRecord>,
        policy: RiskPolicy,
    ) -> Result<Self, JoinError> {
        let joined = join::join(forecast, thresholds, social)?;
        let geoses_median = median(
            social
                .iter()
                .filter(|s| !s.key.is_empty())
                .filter_map(|s| s.geoses),
        );
        let dates: BTreeSet<NaiveDate> = joined.iter().map(JoinedRecord::date).collect();

        Ok(DashboardContext {
            joined,
            geometry,
            policy,
            geoses_median,
            dates: dates.into_iter().collect(),
        })
    }

    /// Distinct forecast dates, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn policy(&self) -> RiskPolicy {
        self.policy
    }

    /// Region-wide median GeoSES score used by the point-sum policy.
    pub fn geoses_median(&self) -> Option<f64> {
        self.geoses_median
    }

    pub fn joined(&self) -> &[JoinedRecord] {
        &self.joined
    }

    pub fn geometry(&self) -> &[GeometryRecord] {
        &self.geometry
    }

    pub fn classify<'a>(&self, record: &'a JoinedRecord) -> ClassifiedRecord<'a> {
        ClassifiedRecord {
            record,
            heat: classify_heat(record),
            humidity: classify_humidity(record),
            precipitation: classify_precipitation(record),
            combined: classify_combined(record, self.policy, self.geoses_median),
        }
    }

    /// The whole classified table, in forecast order.
    pub fn classified(&self) -> Vec<ClassifiedRecord<'_>> {
        self.joined.iter().map(|r| self.classify(r)).collect()
    }

    /// Classified rows for one date, in forecast order.
    pub fn classified_on(&self, date: NaiveDate) -> Vec<ClassifiedRecord<'_>> {
        self.joined
            .iter()
            .filter(|r| r.date() == date)
            .map(|r| self.classify(r))
            .collect()
    }

    /// Map layer for `variable_id` on `date`, one entry per mesh feature.
    pub fn layer(&self, variable_id: &str, date: NaiveDate) -> Result<MapLayer<'_>, LookupError> {
        let variable = find_variable(variable_id)
            .ok_or_else(|| LookupError::UnknownVariable(variable_id.to_string()))?;
        if self.dates.binary_search(&date).is_err() {
            return Err(LookupError::UnknownDate(date));
        }

        let day: HashMap<&MunicipalityKey, &JoinedRecord> = self
            .joined
            .iter()
            .filter(|r| r.date() == date && !r.key().is_empty())
            .map(|r| (r.key(), r))
            .collect();
        let palette = variable.palette(self.policy);

        let entries = self
            .geometry
            .iter()
            .map(|feature| {
                let value = day
                    .get(&feature.key)
                    .map(|r| self.classify(r).value(variable.source))
                    .unwrap_or(LayerValue::Missing);
                let color = match (value, palette) {
                    (LayerValue::Category(label), Some(palette)) => color_for(palette, label),
                    _ => None,
                };
                LayerEntry {
                    key: &feature.key,
                    geometry: feature.geometry.as_ref(),
                    value,
                    color,
                }
            })
            .collect();

        Ok(MapLayer {
            variable,
            date,
            palette,
            entries,
        })
    }
}

fn load_logged<T>(
    source: Source,
    path: &Path,
    load: impl FnOnce(&Path) -> Result<Vec<T>, LoadError>,
) -> Result<Vec<T>, LoadError> {
    match load(path) {
        Ok(rows) => {
            logging::log_load_summary(source, path, rows.len());
            Ok(rows)
        }
        Err(e) => {
            logging::log_load_failure(source, path, &e);
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{HazardCombination, RiskLevel};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn forecast(name: &str, d: u32, ehf: f64, precip: f64) -> ForecastRecord {
        ForecastRecord {
            key: MunicipalityKey::new(name),
            date: day(d),
            temp_max: Some(33.0),
            temp_min: Some(24.0),
            temp_mean: Some(28.5),
            humidity_max: Some(50.0),
            humidity_min: Some(40.0),
            precipitation: Some(precip),
            ehf: Some(ehf),
        }
    }

    fn thresholds(name: &str) -> ThresholdRecord {
        ThresholdRecord {
            key: MunicipalityKey::new(name),
            ehf_p85: Some(4.0),
            ehf_p95: Some(6.0),
            humidity_max_p85: Some(90.0),
            humidity_max_p95: Some(95.0),
            precip_p80: Some(100.0),
            precip_p95: Some(120.0),
        }
    }

    fn social(name: &str, score: f64) -> SocialIndexRecord {
        SocialIndexRecord {
            key: MunicipalityKey::new(name),
            geoses: Some(score),
        }
    }

    fn mesh(names: &[&str]) -> Vec<GeometryRecord> {
        names
            .iter()
            .map(|n| GeometryRecord {
                key: MunicipalityKey::new(n),
                geometry: None,
            })
            .collect()
    }

    fn context(policy: RiskPolicy) -> DashboardContext {
        DashboardContext::from_tables(
            &[
                forecast("Belém", 2, 5.0, 120.0),
                forecast("Belém", 1, 7.0, 10.0),
                forecast("Oriximiná", 1, 9.0, 300.0),
            ],
            &[thresholds("Belém")],
            &[social("Belém", 0.8), social("Oriximiná", 0.2), social("Breves", 0.5)],
            mesh(&["Belém", "Oriximiná", "Breves"]),
            policy,
        )
        .expect("fixture tables are consistent")
    }

    #[test]
    fn test_dates_are_sorted_and_distinct() {
        assert_eq!(context(RiskPolicy::PointSum).dates(), &[day(1), day(2)]);
    }

    #[test]
    fn test_geoses_median_covers_whole_social_table() {
        assert_eq!(context(RiskPolicy::PointSum).geoses_median(), Some(0.5));
    }

    #[test]
    fn test_classified_table_keeps_forecast_order() {
        let ctx = context(RiskPolicy::PointSum);
        let rows = ctx.classified();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].record.date(), day(2));
        assert_eq!(rows[0].heat, Some(HeatClass::Severe));
        assert_eq!(rows[0].precipitation, Some(PrecipitationClass::Extreme));
        assert_eq!(rows[0].humidity, Some(HumidityClass::Normal));
    }

    #[test]
    fn test_municipality_without_thresholds_is_missing_every_day() {
        let ctx = context(RiskPolicy::PointSum);
        let rows: Vec<_> = ctx
            .classified()
            .into_iter()
            .filter(|r| r.record.key().as_str() == "ORIXIMINÁ")
            .collect();
        assert!(!rows.is_empty());
        for row in rows {
            assert_eq!(row.heat, None);
            assert_eq!(row.humidity, None);
            assert_eq!(row.precipitation, None);
            assert_eq!(row.combined, CombinedRisk::Level(RiskLevel::Low));
        }
    }

    #[test]
    fn test_point_sum_uses_geoses_median() {
        let ctx = context(RiskPolicy::PointSum);
        let rows = ctx.classified_on(day(1));
        // Belém day 1: Extreme heat (+1), Normal rain, GeoSES 0.8 ≥ 0.5 (+1)
        assert_eq!(rows[0].combined, CombinedRisk::Level(RiskLevel::High));
    }

    #[test]
    fn test_hazard_matrix_policy() {
        let ctx = context(RiskPolicy::HazardMatrix);
        let rows = ctx.classified_on(day(2));
        assert_eq!(
            rows[0].combined,
            CombinedRisk::Hazard(HazardCombination::HeatAndRain)
        );
    }

    #[test]
    fn test_layer_has_one_entry_per_mesh_feature() {
        let ctx = context(RiskPolicy::PointSum);
        let layer = ctx.layer("heat_class", day(2)).unwrap();
        assert_eq!(layer.entries.len(), 3);

        assert_eq!(layer.entries[0].key.as_str(), "BELÉM");
        assert_eq!(layer.entries[0].value, LayerValue::Category("Severe"));
        assert_eq!(layer.entries[0].color, Some("yellow"));

        // Oriximiná has no day-2 row; Breves has no forecast at all.
        assert_eq!(layer.entries[1].value, LayerValue::Missing);
        assert_eq!(layer.entries[2].value, LayerValue::Missing);
        assert_eq!(layer.entries[2].color, None);
    }

    #[test]
    fn test_numeric_layer_has_scale_not_colors() {
        let ctx = context(RiskPolicy::PointSum);
        let layer = ctx.layer("precipitation", day(1)).unwrap();
        assert_eq!(layer.continuous_scale(), Some("Viridis"));
        assert!(layer.palette.is_none());
        assert_eq!(layer.entries[1].value, LayerValue::Number(300.0));
        assert!(layer.entries.iter().all(|e| e.color.is_none()));
    }

    #[test]
    fn test_layer_lookup_errors() {
        let ctx = context(RiskPolicy::PointSum);
        assert_eq!(
            ctx.layer("wind", day(1)).unwrap_err(),
            LookupError::UnknownVariable("wind".to_string())
        );
        assert_eq!(
            ctx.layer("temp_max", day(9)).unwrap_err(),
            LookupError::UnknownDate(day(9))
        );
    }

    #[test]
    fn test_duplicate_reference_rows_fail_construction() {
        let err = DashboardContext::from_tables(
            &[forecast("Belém", 1, 1.0, 1.0)],
            &[thresholds("Belém"), thresholds("BELÉM")],
            &[],
            Vec::new(),
            RiskPolicy::PointSum,
        )
        .unwrap_err();
        assert!(matches!(err, JoinError::DuplicateKey { .. }));
    }
}
