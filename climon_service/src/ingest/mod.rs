//! Readers for the static input files.
//!
//! - `schema`: header aliases mapped onto canonical fields.
//! - `tables`: CSV loaders for the forecast, threshold and GeoSES sheets.
//! - `geometry`: municipality boundaries from GeoJSON.

pub mod geometry;
pub mod schema;
pub mod tables;
