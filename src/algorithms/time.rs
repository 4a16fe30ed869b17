use chrono::{NaiveTime, Timelike};

use super::error::FormatError;

const FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Converts a time-of-day string into minutes since midnight.
///
/// Seconds are accepted but dropped.
pub fn to_minutes(value: &str) -> Result<u32, FormatError> {
    FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value.trim(), fmt).ok())
        .map(|t| t.hour() * 60 + t.minute())
        .ok_or_else(|| FormatError {
            value: value.to_string(),
        })
}
