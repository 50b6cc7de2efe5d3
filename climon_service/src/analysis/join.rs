//! Left join of the forecast table with the reference tables.
//!
//! Every forecast row survives the join, in input order. A
//! municipality with no threshold or GeoSES row simply gets `None` there.
//! Reference tables must hold at most one row per municipality; a duplicate
//! is an error.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use crate::model::{
    ForecastRecord, JoinedRecord, Keyed, MunicipalityKey, SocialIndexRecord, Table,
    ThresholdRecord,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JoinError {
    #[error("{table} table has more than one row for municipality '{key}'")]
    DuplicateKey { table: Table, key: MunicipalityKey },

    #[error("forecast table has more than one row for '{key}' on {date}")]
    DuplicateForecast { key: MunicipalityKey, date: NaiveDate },
}

/// Joins forecast rows with thresholds and GeoSES scores.
///
/// Output has exactly one `JoinedRecord` per forecast row, in input order.
/// Rows with a blank key never match and are never treated as duplicates.
pub fn join(
    forecast: &[ForecastRecord],
    thresholds: &[ThresholdRecord],
    social: &[SocialIndexRecord],
) -> Result<Vec<JoinedRecord>, JoinError> {
    check_forecast_unique(forecast)?;
    let threshold_index = index_unique(Table::Thresholds, thresholds)?;
    let social_index = index_unique(Table::Social, social)?;

    let joined = forecast
        .iter()
        .map(|row| JoinedRecord {
            forecast: row.clone(),
            thresholds: threshold_index.get(&row.key).map(|t| (*t).clone()),
            social: social_index.get(&row.key).map(|s| (*s).clone()),
        })
        .collect();

    Ok(joined)
}

/// Builds a key → row index, refusing duplicate keys.
fn index_unique<T: Keyed>(
    table: Table,
    rows: &[T],
) -> Result<HashMap<&MunicipalityKey, &T>, JoinError> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = row.key();
        if key.is_empty() {
            continue;
        }
        if index.insert(key, row).is_some() {
            return Err(JoinError::DuplicateKey {
                table,
                key: key.clone(),
            });
        }
    }
    Ok(index)
}

fn check_forecast_unique(forecast: &[ForecastRecord]) -> Result<(), JoinError> {
    let mut seen = HashSet::with_capacity(forecast.len());
    for row in forecast.iter().filter(|r| !r.key.is_empty()) {
        if !seen.insert((&row.key, row.date)) {
            return Err(JoinError::DuplicateForecast {
                key: row.key.clone(),
                date: row.date,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Join summary
// ---------------------------------------------------------------------------

/// Match statistics for a joined table, for the startup log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinSummary {
    pub rows: usize,
    pub with_thresholds: usize,
    pub with_social: usize,
    /// Municipalities lacking a threshold row, sorted.
    pub missing_thresholds: BTreeSet<MunicipalityKey>,
    /// Municipalities lacking a GeoSES row, sorted.
    pub missing_social: BTreeSet<MunicipalityKey>,
}

pub fn summarize(joined: &[JoinedRecord]) -> JoinSummary {
    let mut summary = JoinSummary {
        rows: joined.len(),
        ..JoinSummary::default()
    };
    for record in joined {
        if record.thresholds.is_some() {
            summary.with_thresholds += 1;
        } else {
            summary.missing_thresholds.insert(record.key().clone());
        }
        if record.social.is_some() {
            summary.with_social += 1;
        } else {
            summary.missing_social.insert(record.key().clone());
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
