//! Timestamp encoding for TEXT columns
//!
//! Fixed-width RFC 3339 in UTC, so lexical order is chronological order.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{SqliteError, SqliteResult};

pub(crate) fn now() -> String {
    encode(Utc::now())
}

/// The instant `age` ago; saturates at the earliest representable time
pub(crate) fn ago(age: Duration) -> String {
    let cutoff = chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    encode(cutoff)
}

pub(crate) fn encode(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode(text: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| SqliteError::Serialization(format!("bad timestamp '{text}': {e}")))
}
