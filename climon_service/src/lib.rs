//! Climate risk classification for the northern-region municipal dashboard.
//!
//! Loads the daily forecast, climatological thresholds and GeoSES tables,
//! joins them on the normalized municipality name, and bands each day's heat,
//! humidity and precipitation into the labels the choropleth map displays.
//!
//! Data flows one way: `ingest` → `analysis::join` → `alert` → `layer` /
//! `export`, with `context::DashboardContext` holding the joined table.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod context;
pub mod export;
pub mod ingest;
pub mod layer;
pub mod logging;
pub mod model;
pub mod variables;

pub use config::Config;
pub use context::{ClassifiedRecord, DashboardContext};
pub use layer::{LayerValue, LookupError, MapLayer};
pub use model::{LoadError, MunicipalityKey, normalize_name};
