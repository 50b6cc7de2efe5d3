//! Municipality boundary layer.
//!
//! Reads a GeoJSON FeatureCollection and keys each feature by one of its
//! properties (`NM_MUN` in the IBGE municipal meshes), normalized the same
//! way as the tables. Features without that property get an empty key and
//! will render with no data.

use std::fs;
use std::path::Path;

use geojson::{Feature, GeoJson};

use crate::model::{GeometryRecord, LoadError, MunicipalityKey};

pub fn read_geometry(path: &Path, key_property: &str) -> Result<Vec<GeometryRecord>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    geometry_from_str(&text, key_property, &path.display().to_string())
}

pub fn geometry_from_str(
    text: &str,
    key_property: &str,
    origin: &str,
) -> Result<Vec<GeometryRecord>, LoadError> {
    let geojson = text.parse::<GeoJson>().map_err(|source| LoadError::GeoJson {
        origin: origin.to_string(),
        source,
    })?;
    records_from_geojson(geojson, key_property, origin)
}

fn records_from_geojson(
    geojson: GeoJson,
    key_property: &str,
    origin: &str,
) -> Result<Vec<GeometryRecord>, LoadError> {
    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(LoadError::NotFeatureCollection {
                origin: origin.to_string(),
            });
        }
    };

    Ok(features
        .into_iter()
        .map(|feature| record_from_feature(feature, key_property))
        .collect())
}

fn record_from_feature(feature: Feature, key_property: &str) -> GeometryRecord {
    let name = feature
        .property(key_property)
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    GeometryRecord {
        key: MunicipalityKey::new(name),
        geometry: feature.geometry,
    }
}
