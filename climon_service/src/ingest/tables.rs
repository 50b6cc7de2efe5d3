//! CSV loaders for the forecast, threshold and GeoSES tables.
//!
//! Each loader resolves the header row through a `SchemaMap`, normalizes the
//! municipality key, and parses numeric cells. Blank cells and the usual
//! spreadsheet placeholders become `None`; anything else that fails to parse
//! aborts the load with the offending line and column.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::ingest::schema::{ColumnMap, Field, SchemaMap};
use crate::model::{
    ForecastRecord, LoadError, MunicipalityKey, SocialIndexRecord, Table, ThresholdRecord,
};

/// Cell contents treated as "no value".
const MISSING_MARKERS: &[&str] = &["", "NAN", "NULL", "NA", "N/A", "NONE", "-"];

/// How to read the source CSVs.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub schema: SchemaMap,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: b',',
            schema: SchemaMap::new(),
        }
    }
}

// ============================================================================
// Public loaders
// ============================================================================

pub fn read_forecast(path: &Path, options: &CsvOptions) -> Result<Vec<ForecastRecord>, LoadError> {
    forecast_from_reader(open(path)?, &path.display().to_string(), options)
}

pub fn read_thresholds(
    path: &Path,
    options: &CsvOptions,
) -> Result<Vec<ThresholdRecord>, LoadError> {
    thresholds_from_reader(open(path)?, &path.display().to_string(), options)
}

pub fn read_social(path: &Path, options: &CsvOptions) -> Result<Vec<SocialIndexRecord>, LoadError> {
    social_from_reader(open(path)?, &path.display().to_string(), options)
}

pub fn forecast_from_reader<R: Read>(
    reader: R,
    origin: &str,
    options: &CsvOptions,
) -> Result<Vec<ForecastRecord>, LoadError> {
    let table = Table::Forecast;
    let (columns, rows) = read_table(reader, table, origin, options)?;

    let mut records = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let cell = Cell {
            table,
            origin,
            line,
            columns: &columns,
            row: &row,
        };
        records.push(ForecastRecord {
            key: cell.key(),
            date: cell.date(Field::Date)?,
            temp_max: cell.number(Field::TempMax)?,
            temp_min: cell.number(Field::TempMin)?,
            temp_mean: cell.number(Field::TempMean)?,
            humidity_max: cell.number(Field::HumidityMax)?,
            humidity_min: cell.number(Field::HumidityMin)?,
            precipitation: cell.number(Field::Precipitation)?,
            ehf: cell.number(Field::Ehf)?,
        });
    }
    Ok(records)
}

pub fn thresholds_from_reader<R: Read>(
    reader: R,
    origin: &str,
    options: &CsvOptions,
) -> Result<Vec<ThresholdRecord>, LoadError> {
    let table = Table::Thresholds;
    let (columns, rows) = read_table(reader, table, origin, options)?;

    let mut records = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let cell = Cell {
            table,
            origin,
            line,
            columns: &columns,
            row: &row,
        };
        records.push(ThresholdRecord {
            key: cell.key(),
            ehf_p85: cell.number(Field::EhfP85)?,
            ehf_p95: cell.number(Field::EhfP95)?,
            humidity_max_p85: cell.number(Field::HumidityMaxP85)?,
            humidity_max_p95: cell.number(Field::HumidityMaxP95)?,
            precip_p80: cell.number(Field::PrecipP80)?,
            precip_p95: cell.number(Field::PrecipP95)?,
        });
    }
    Ok(records)
}

pub fn social_from_reader<R: Read>(
    reader: R,
    origin: &str,
    options: &CsvOptions,
) -> Result<Vec<SocialIndexRecord>, LoadError> {
    let table = Table::Social;
    let (columns, rows) = read_table(reader, table, origin, options)?;

    let mut records = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let cell = Cell {
            table,
            origin,
            line,
            columns: &columns,
            row: &row,
        };
        records.push(SocialIndexRecord {
            key: cell.key(),
            geoses: cell.number(Field::GeoSes)?,
        });
    }
    Ok(records)
}

// ============================================================================
// Internals
// ============================================================================

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the header and all rows, returning each row with its source line.
fn read_table<R: Read>(
    reader: R,
    table: Table,
    origin: &str,
    options: &CsvOptions,
) -> Result<(ColumnMap, Vec<(u64, StringRecord)>), LoadError> {
    let csv_err = |source| LoadError::Csv {
        origin: origin.to_string(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let columns = options.schema.resolve(table, origin, &headers)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = result.map_err(csv_err)?;
        // Trailing blank lines in hand-exported sheets
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let line = row.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
        rows.push((line, row));
    }
    Ok((columns, rows))
}

/// One row of one table, with enough context to build a useful error.
struct Cell<'a> {
    table: Table,
    origin: &'a str,
    line: u64,
    columns: &'a ColumnMap,
    row: &'a StringRecord,
}

impl Cell<'_> {
    fn raw(&self, field: Field) -> &str {
        self.columns.cell(self.row, field).trim()
    }

    fn bad_value(&self, field: Field) -> LoadError {
        LoadError::BadValue {
            table: self.table,
            origin: self.origin.to_string(),
            line: self.line,
            field: field.name(),
            value: self.raw(field).to_string(),
        }
    }

    fn key(&self) -> MunicipalityKey {
        MunicipalityKey::new(self.raw(Field::Municipality))
    }

    fn number(&self, field: Field) -> Result<Option<f64>, LoadError> {
        parse_number(self.raw(field)).ok_or_else(|| self.bad_value(field))
    }

    fn date(&self, field: Field) -> Result<NaiveDate, LoadError> {
        parse_date(self.raw(field)).ok_or_else(|| self.bad_value(field))
    }
}

/// Parses a numeric cell.
///
/// Outer `None` means unparseable; inner `None` means the cell is blank or a
/// missing-value placeholder. A decimal comma is accepted when there is no
/// decimal point. Infinities, spelled out or from overflow, are unparseable.
pub fn parse_number(raw: &str) -> Option<Option<f64>> {
    let s = raw.trim();
    if MISSING_MARKERS.contains(&s.to_ascii_uppercase().as_str()) {
        return Some(None);
    }

    let value = if s.contains(',') && !s.contains('.') {
        s.replace(',', ".").parse::<f64>()
    } else {
        s.parse::<f64>()
    };

    match value {
        Ok(v) if v.is_nan() => Some(None),
        Ok(v) if v.is_infinite() => None,
        Ok(v) => Some(Some(v)),
        Err(_) => None,
    }
}

/// Parses a forecast date. Spreadsheet exports sometimes carry a midnight
/// time component; it is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
