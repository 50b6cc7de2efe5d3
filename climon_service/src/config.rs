//! Service configuration.
//!
//! Loaded once at startup from a TOML file (`climon.toml` by default, or the
//! path in `CLIMON_CONFIG`). Relative source paths are resolved against the
//! directory holding the configuration file, so the file can sit next to the
//! data it describes.
//!
//! ```toml
//! [sources]
//! forecast = "dados/previsao_diaria_com_ehf.csv"
//! thresholds = "dados/limiares_climaticos_norte.csv"
//! social = "dados/geoses_norte.csv"
//! geometry = "dados/municipios_norte_simplificado.geojson"
//!
//! [risk]
//! policy = "hazard_matrix"
//!
//! [schema.aliases]
//! humidity_max = ["UR_MAXIMA"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::alert::RiskPolicy;
use crate::ingest::schema::{Field, SchemaMap};
use crate::ingest::tables::CsvOptions;
use crate::logging::LogLevel;
use crate::model::LoadError;

pub const DEFAULT_CONFIG_PATH: &str = "climon.toml";

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "CLIMON_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub forecast: PathBuf,
    pub thresholds: PathBuf,
    pub social: PathBuf,
    pub geometry: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// GeoJSON feature property holding the municipality name.
    #[serde(default = "default_geometry_key")]
    pub geometry_key_property: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub policy: RiskPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: LogLevel,
    pub file: Option<PathBuf>,
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            file: None,
            timestamps: default_timestamps(),
        }
    }
}

/// Extra header spellings, keyed by canonical field name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

fn default_delimiter() -> char {
    ','
}

fn default_geometry_key() -> String {
    "NM_MUN".to_string()
}

fn default_level() -> LogLevel {
    LogLevel::Info
}

fn default_timestamps() -> bool {
    true
}

impl Config {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(&text, &base_dir)
    }

    /// Parses configuration text, resolving relative paths against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, LoadError> {
        let mut config: Config = toml::from_str(text)?;
        config.base_dir = base_dir.to_path_buf();
        // Fail at startup, not on first load
        config.csv_options()?;
        Ok(config)
    }

    /// `path` as given if absolute, otherwise relative to the config file.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn forecast_path(&self) -> PathBuf {
        self.resolve(&self.sources.forecast)
    }

    pub fn thresholds_path(&self) -> PathBuf {
        self.resolve(&self.sources.thresholds)
    }

    pub fn social_path(&self) -> PathBuf {
        self.resolve(&self.sources.social)
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.resolve(&self.sources.geometry)
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(|p| self.resolve(p))
    }

    /// CSV reading options: delimiter plus built-in and configured aliases.
    pub fn csv_options(&self) -> Result<CsvOptions, LoadError> {
        let delimiter = self.sources.delimiter;
        if !delimiter.is_ascii() {
            return Err(LoadError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                delimiter
            )));
        }

        let mut schema = SchemaMap::new();
        for (name, aliases) in &self.schema.aliases {
            let field = Field::from_name(name).ok_or_else(|| {
                LoadError::Config(format!("unknown field '{}' in [schema.aliases]", name))
            })?;
            for alias in aliases {
                schema = schema.with_alias(field, alias);
            }
        }

        Ok(CsvOptions {
            delimiter: delimiter as u8,
            schema,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
