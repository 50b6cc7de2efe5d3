/// Table organization for the dashboard.
///
/// Everything here is pure and works on already-loaded records; reading the
/// sheets lives in `ingest`, banding lives in `alert`.
///
/// Submodules:
/// - `join`: left-joins the forecast table with the threshold and GeoSES
///   reference tables on the normalized municipality key.
pub mod join;
