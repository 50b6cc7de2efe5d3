//! Column alias mapping for the source sheets.
//!
//! The forecast, threshold and GeoSES sheets have been exported by hand many
//! times over and their headers drift ("Municipio", "municipio", "NM_MUN",
//! "Umid_Max" vs "UR_MAX", ...). Instead of one code path per variant, every
//! canonical field carries a list of accepted header spellings; headers are
//! compared after the same trim+uppercase normalization used for keys.

use std::collections::HashMap;

use csv::StringRecord;

use crate::logging::{self, Source};
use crate::model::{LoadError, Table, normalize_name};

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Municipality,
    Date,
    TempMax,
    TempMin,
    TempMean,
    HumidityMax,
    HumidityMin,
    Precipitation,
    Ehf,
    EhfP85,
    EhfP95,
    HumidityMaxP85,
    HumidityMaxP95,
    PrecipP80,
    PrecipP95,
    GeoSes,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Municipality,
        Field::Date,
        Field::TempMax,
        Field::TempMin,
        Field::TempMean,
        Field::HumidityMax,
        Field::HumidityMin,
        Field::Precipitation,
        Field::Ehf,
        Field::EhfP85,
        Field::EhfP95,
        Field::HumidityMaxP85,
        Field::HumidityMaxP95,
        Field::PrecipP80,
        Field::PrecipP95,
        Field::GeoSes,
    ];

    /// Name used in configuration files and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Field::Municipality => "municipality",
            Field::Date => "date",
            Field::TempMax => "temp_max",
            Field::TempMin => "temp_min",
            Field::TempMean => "temp_mean",
            Field::HumidityMax => "humidity_max",
            Field::HumidityMin => "humidity_min",
            Field::Precipitation => "precipitation",
            Field::Ehf => "ehf",
            Field::EhfP85 => "ehf_p85",
            Field::EhfP95 => "ehf_p95",
            Field::HumidityMaxP85 => "humidity_max_p85",
            Field::HumidityMaxP95 => "humidity_max_p95",
            Field::PrecipP80 => "precip_p80",
            Field::PrecipP95 => "precip_p95",
            Field::GeoSes => "geoses",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        let name = name.trim().to_ascii_lowercase();
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Built-in header spellings, already normalized.
    pub fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Field::Municipality => &[
                "NM_MUN",
                "MUNICIPIO",
                "MUNICÍPIO",
                "NOME_MUNICIPIO",
                "NM_MUNICIPIO",
                "MUNICIPALITY",
            ],
            Field::Date => &["DATA", "DATE", "DIA"],
            Field::TempMax => &["TEMP_MAX", "TMAX", "TEMPERATURA_MAXIMA"],
            Field::TempMin => &["TEMP_MIN", "TMIN", "TEMPERATURA_MINIMA"],
            Field::TempMean => &["TEMP_MEDIA", "TEMP_MED", "TMED", "TEMP_MEAN"],
            Field::HumidityMax => &["UMID_MAX", "UR_MAX", "HUMIDITY_MAX"],
            Field::HumidityMin => &["UMID_MIN", "UR_MIN", "HUMIDITY_MIN"],
            Field::Precipitation => &[
                "PREC_ACUMULADA",
                "PRECIPITACAO",
                "PRECIPITAÇÃO",
                "PREC",
                "PRECIPITATION",
            ],
            Field::Ehf => &["EHF"],
            Field::EhfP85 => &["EHF_P85"],
            Field::EhfP95 => &["EHF_P95"],
            Field::HumidityMaxP85 => &["UMID_MAX_P85", "UMID_P85", "UR_MAX_P85"],
            Field::HumidityMaxP95 => &["UMID_MAX_P95", "UMID_P95", "UR_MAX_P95"],
            Field::PrecipP80 => &["PREC_P80"],
            Field::PrecipP95 => &["PREC_P95"],
            Field::GeoSes => &["GEOSES", "INDICE_GEOSES", "GEOSES_INDEX"],
        }
    }
}

/// Columns each table must provide. Anything else in the sheet is ignored.
pub fn required_fields(table: Table) -> &'static [Field] {
    match table {
        Table::Forecast => &[
            Field::Municipality,
            Field::Date,
            Field::TempMax,
            Field::TempMin,
            Field::TempMean,
            Field::HumidityMax,
            Field::HumidityMin,
            Field::Precipitation,
            Field::Ehf,
        ],
        Table::Thresholds => &[
            Field::Municipality,
            Field::EhfP85,
            Field::EhfP95,
            Field::HumidityMaxP85,
            Field::HumidityMaxP95,
            Field::PrecipP80,
            Field::PrecipP95,
        ],
        Table::Social => &[Field::Municipality, Field::GeoSes],
    }
}

// ---------------------------------------------------------------------------
// Schema map
// ---------------------------------------------------------------------------

/// Built-in aliases plus any extras supplied in `[schema.aliases]`.
#[derive(Debug, Clone, Default)]
pub struct SchemaMap {
    extra: HashMap<Field, Vec<String>>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extra header spelling for `field`.
    pub fn with_alias(mut self, field: Field, alias: &str) -> Self {
        self.extra.entry(field).or_default().push(normalize_name(alias));
        self
    }

    fn matches(&self, field: Field, header: &str) -> bool {
        field.default_aliases().contains(&header)
            || self
                .extra
                .get(&field)
                .is_some_and(|aliases| aliases.iter().any(|a| a == header))
    }

    /// Maps the header row of `table` onto canonical fields.
    ///
    /// Fails when a required field has no column, or when two columns claim
    /// the same field. If no header looks like a municipality column, the
    /// first column is taken as the key.
    pub fn resolve(
        &self,
        table: Table,
        origin: &str,
        headers: &StringRecord,
    ) -> Result<ColumnMap, LoadError> {
        let fields = required_fields(table);
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_name(h.trim_start_matches('\u{feff}')))
            .collect();

        let mut columns: HashMap<Field, usize> = HashMap::new();
        for (idx, header) in normalized.iter().enumerate() {
            for &field in fields {
                if !self.matches(field, header) {
                    continue;
                }
                if let Some(&prev) = columns.get(&field) {
                    return Err(LoadError::AmbiguousColumn {
                        table,
                        origin: origin.to_string(),
                        field: field.name(),
                        first: headers.get(prev).unwrap_or_default().to_string(),
                        second: headers.get(idx).unwrap_or_default().to_string(),
                    });
                }
                columns.insert(field, idx);
            }
        }

        if !columns.contains_key(&Field::Municipality)
            && !normalized.is_empty()
            && !columns.values().any(|&idx| idx == 0)
        {
            logging::warn(
                Source::from(table),
                None,
                &format!(
                    "{}: no municipality column recognized, using first column '{}'",
                    origin,
                    headers.get(0).unwrap_or_default()
                ),
            );
            columns.insert(Field::Municipality, 0);
        }

        for &field in fields {
            if !columns.contains_key(&field) {
                return Err(LoadError::MissingColumn {
                    table,
                    origin: origin.to_string(),
                    field: field.name(),
                });
            }
        }

        Ok(ColumnMap { columns })
    }
}

/// Resolved column positions for one table.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// The raw cell for `field`, or `""` if the row is short.
    pub fn cell<'r>(&self, record: &'r StringRecord, field: Field) -> &'r str {
        self.index(field)
            .and_then(|idx| record.get(idx))
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
