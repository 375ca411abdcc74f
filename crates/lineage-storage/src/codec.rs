//! Column encodings shared by the query modules.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with
//! microsecond precision, so text ordering matches chronological ordering.

use chrono::{DateTime, SecondsFormat, Utc};

use lineage_core::errors::StorageError;
use lineage_core::LineageResult;

pub fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn encode_opt_ts(ts: Option<&DateTime<Utc>>) -> Option<String> {
    ts.map(encode_ts)
}

pub fn decode_ts(column: &str, raw: &str) -> LineageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(column, e.to_string()))
}

pub fn decode_opt_ts(column: &str, raw: Option<String>) -> LineageResult<Option<DateTime<Utc>>> {
    raw.map(|s| decode_ts(column, &s)).transpose()
}

/// Parse a column through `FromStr`, reporting failures as corrupt data.
pub fn decode_enum<T>(column: &str, raw: Option<String>) -> LineageResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|s| s.parse::<T>().map_err(|e| corrupt(column, e.to_string())))
        .transpose()
}

pub fn corrupt(column: &str, reason: impl Into<String>) -> lineage_core::LineageError {
    StorageError::CorruptColumn {
        column: column.to_string(),
        reason: reason.into(),
    }
    .into()
}
