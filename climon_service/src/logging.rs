/// Structured logging for the climate risk dashboard service
///
/// Provides context-rich logging with data source and municipality
/// identifiers, timestamps, and severity levels. Supports both console
/// output and file-based logging. Log output never feeds back into the
/// classified data.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::analysis::join::JoinSummary;
use crate::model::Table;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(rename = "warn", alias = "warning")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Forecast,
    Thresholds,
    Social,
    Geometry,
    Config,
    System,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Forecast => write!(f, "FCST"),
            Source::Thresholds => write!(f, "THRS"),
            Source::Social => write!(f, "GSES"),
            Source::Geometry => write!(f, "GEOM"),
            Source::Config => write!(f, "CONF"),
            Source::System => write!(f, "SYS"),
        }
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        match table {
            Table::Forecast => Source::Forecast,
            Table::Thresholds => Source::Thresholds,
            Table::Social => Source::Social,
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, source: Source, municipality: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let place = municipality.map(|m| format!(" [{}]", m)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, source, place, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => eprintln!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, place, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, place, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&Path>, console_timestamps: bool) {
    Logger::init(
        min_level,
        log_file.map(|p| p.display().to_string()),
        console_timestamps,
    );
}

fn emit(level: LogLevel, source: Source, municipality: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, source, municipality, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: Source, municipality: Option<&str>, message: &str) {
    emit(LogLevel::Info, source, municipality, message);
}

/// Log a warning message
pub fn warn(source: Source, municipality: Option<&str>, message: &str) {
    emit(LogLevel::Warning, source, municipality, message);
}

/// Log an error message
pub fn error(source: Source, municipality: Option<&str>, message: &str) {
    emit(LogLevel::Error, source, municipality, message);
}

/// Log a debug message
pub fn debug(source: Source, municipality: Option<&str>, message: &str) {
    emit(LogLevel::Debug, source, municipality, message);
}

// ---------------------------------------------------------------------------
// Structured Load Logging
// ---------------------------------------------------------------------------

/// Log a fatal failure to load one of the inputs
pub fn log_load_failure(source: Source, path: &Path, err: &dyn std::error::Error) {
    error(
        source,
        None,
        &format!("loading {} failed: {}", path.display(), err),
    );
}

/// Log the row count of a successfully loaded input
pub fn log_load_summary(source: Source, path: &Path, rows: usize) {
    info(
        source,
        None,
        &format!("loaded {} rows from {}", rows, path.display()),
    );
}

/// Log how well the reference tables covered the forecast
pub fn log_join_summary(summary: &JoinSummary) {
    for key in &summary.missing_thresholds {
        warn(Source::Thresholds, Some(key.as_str()), "no threshold row, classes will be missing");
    }
    for key in &summary.missing_social {
        warn(Source::Social, Some(key.as_str()), "no GeoSES row");
    }

    let message = format!(
        "Join complete: {} forecast rows, {} with thresholds, {} with GeoSES",
        summary.rows, summary.with_thresholds, summary.with_social
    );

    if summary.rows > 0 && summary.with_thresholds == 0 {
        error(Source::System, None, &message);
    } else if !summary.missing_thresholds.is_empty() {
        warn(Source::System, None, &message);
    } else {
        info(Source::System, None, &message);
    }
}
