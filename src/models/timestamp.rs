use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::RecordError;
use crate::models::session::DayPolicy;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a backend timestamp.
///
/// Values carrying an offset are absolute. Naive values are wall-clock times in
/// the policy's timezone: a time skipped by a DST jump is rejected, a repeated
/// one resolves to its first occurrence.
pub fn parse_timestamp(
    field: &'static str,
    value: &str,
    policy: &DayPolicy,
) -> Result<DateTime<Utc>, RecordError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let invalid = || RecordError::InvalidTimestamp {
        field,
        value: value.to_string(),
    };
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(invalid)?;
    match policy.timezone().from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(invalid()),
    }
}

pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}
