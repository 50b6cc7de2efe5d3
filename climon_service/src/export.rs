//! File exports: the classified table as CSV and a map layer as GeoJSON.
//!
//! Output depends only on the loaded inputs: no timestamps, no hash-map
//! iteration order, so repeated runs are byte-identical.

use std::io::Write;

use serde::Serialize;

use crate::context::ClassifiedRecord;
use crate::layer::MapLayer;

#[derive(Serialize)]
struct ClassifiedRow<'a> {
    #[serde(rename = "NM_MUN")]
    municipality: &'a str,
    date: String,
    temp_max: Option<f64>,
    temp_min: Option<f64>,
    temp_mean: Option<f64>,
    humidity_max: Option<f64>,
    humidity_min: Option<f64>,
    precipitation: Option<f64>,
    ehf: Option<f64>,
    ehf_p85: Option<f64>,
    ehf_p95: Option<f64>,
    humidity_max_p85: Option<f64>,
    humidity_max_p95: Option<f64>,
    precip_p80: Option<f64>,
    precip_p95: Option<f64>,
    geoses: Option<f64>,
    heat_class: Option<&'static str>,
    humidity_class: Option<&'static str>,
    precipitation_class: Option<&'static str>,
    combined_risk: &'static str,
}

impl<'a> From<&ClassifiedRecord<'a>> for ClassifiedRow<'a> {
    fn from(c: &ClassifiedRecord<'a>) -> Self {
        let r = c.record;
        let f = &r.forecast;
        ClassifiedRow {
            municipality: r.key().as_str(),
            date: r.date().format("%Y-%m-%d").to_string(),
            temp_max: f.temp_max,
            temp_min: f.temp_min,
            temp_mean: f.temp_mean,
            humidity_max: f.humidity_max,
            humidity_min: f.humidity_min,
            precipitation: f.precipitation,
            ehf: f.ehf,
            ehf_p85: r.ehf_p85(),
            ehf_p95: r.ehf_p95(),
            humidity_max_p85: r.humidity_max_p85(),
            humidity_max_p95: r.humidity_max_p95(),
            precip_p80: r.precip_p80(),
            precip_p95: r.precip_p95(),
            geoses: r.geoses(),
            heat_class: c.heat.map(|h| h.label()),
            humidity_class: c.humidity.map(|h| h.label()),
            precipitation_class: c.precipitation.map(|p| p.label()),
            combined_risk: c.combined.label(),
        }
    }
}

/// Writes the classified table, one row per (municipality, date). Missing
/// values and missing classes are empty cells.
pub fn write_classified_csv<W: Write>(
    rows: &[ClassifiedRecord<'_>],
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(ClassifiedRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes `layer` as a GeoJSON FeatureCollection.
pub fn write_layer_geojson<W: Write>(layer: &MapLayer<'_>, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "{}", layer.to_geojson())?;
    writer.flush()
}
