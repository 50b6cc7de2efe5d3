//! Map layer handed to the presentation side.
//!
//! A layer is one variable on one date, laid over the municipal mesh: one
//! entry per boundary feature, in mesh order. Municipalities in the mesh but
//! without forecast data that day are kept with a `Missing` value, matching
//! a left merge of the mesh against the day's rows.

use chrono::NaiveDate;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use serde_json::{Map, Value as JsonValue};

use crate::model::MunicipalityKey;
use crate::variables::{NUMERIC_SCALE, PaletteEntry, Variable};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("no forecast data for {0}")]
    UnknownDate(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerValue {
    Number(f64),
    Category(&'static str),
    Missing,
}

impl LayerValue {
    fn to_json(self) -> JsonValue {
        match self {
            LayerValue::Number(v) => JsonValue::from(v),
            LayerValue::Category(label) => JsonValue::from(label),
            LayerValue::Missing => JsonValue::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry<'a> {
    pub key: &'a MunicipalityKey,
    pub geometry: Option<&'a Geometry>,
    pub value: LayerValue,
    /// Fixed palette color for categorical values; `None` for numeric or
    /// missing values.
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct MapLayer<'a> {
    pub variable: &'static Variable,
    pub date: NaiveDate,
    /// Ordered labels/colors for categorical variables.
    pub palette: Option<&'static [PaletteEntry]>,
    pub entries: Vec<LayerEntry<'a>>,
}

impl MapLayer<'_> {
    /// Color scale name for numeric variables.
    pub fn continuous_scale(&self) -> Option<&'static str> {
        if self.palette.is_none() {
            Some(NUMERIC_SCALE)
        } else {
            None
        }
    }

    /// The layer as a GeoJSON FeatureCollection.
    ///
    /// Each feature carries `NM_MUN`, `variable`, `date`, `value` (number,
    /// label or null) and `color` (null unless categorical).
    pub fn to_geojson(&self) -> GeoJson {
        let features = self
            .entries
            .iter()
            .map(|entry| {
                let mut properties = Map::new();
                properties.insert("NM_MUN".into(), JsonValue::from(entry.key.as_str()));
                properties.insert("variable".into(), JsonValue::from(self.variable.id));
                properties.insert(
                    "date".into(),
                    JsonValue::from(self.date.format("%Y-%m-%d").to_string()),
                );
                properties.insert("value".into(), entry.value.to_json());
                properties.insert(
                    "color".into(),
                    entry.color.map(JsonValue::from).unwrap_or(JsonValue::Null),
                );
                Feature {
                    bbox: None,
                    geometry: entry.geometry.cloned(),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}
