//! Time strings as served by the transit API and their conversion to
//! absolute timestamps.
//!
//! Timetables use wall-clock times whose hour may run past 23 for trips that
//! continue after midnight. Those are folded back into a 24 hour clock with
//! [`correct_time`] and then placed on a calendar date by
//! [`anchor_to_service_day`].

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{InsightError, Result};

/// Format used when writing observation timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const CLOCK_FORMAT: &str = "%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn digits(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

fn is_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10 && b[4] == b'-' && b[7] == b'-' && digits(&b[..4]) && digits(&b[5..7]) && digits(&b[8..])
}

fn is_clock(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 8 && b[2] == b':' && b[5] == b':' && digits(&b[..2]) && digits(&b[3..5]) && digits(&b[6..])
}

fn is_clock_with_fraction(s: &str) -> bool {
    match s.split_once('.') {
        Some((clock, fraction)) => is_clock(clock) && digits(fraction.as_bytes()),
        None => is_clock(s),
    }
}

/// Checks that `s` is a date (`YYYY-MM-DD`), a clock time (`HH:MM:SS`) or both
/// separated by a space or `T`.
pub fn validate_time_format(s: &str) -> Result<()> {
    let ok = is_date(s)
        || is_clock(s)
        || s.split_once([' ', 'T'])
            .is_some_and(|(date, clock)| is_date(date) && is_clock_with_fraction(clock));

    if ok {
        Ok(())
    } else {
        Err(InsightError::InvalidDomain(format!("String is not time: '{s}'.")))
    }
}

/// Folds an hour of 24 or more back into the 0-23 range, keeping minutes and
/// seconds: `"25:10:00"` becomes `"01:10:00"`.
pub fn correct_time(s: &str) -> Result<String> {
    if !is_clock(s) {
        return Err(InsightError::InvalidDomain(format!("String is not time: '{s}'.")));
    }

    let hour: u32 = s[..2]
        .parse()
        .map_err(|_| InsightError::InvalidDomain(format!("String is not time: '{s}'.")))?;

    if hour < 24 {
        return Ok(s.to_string());
    }

    Ok(format!("{:02}{}", hour % 24, &s[2..]))
}

/// Parses a timetable time-of-day, correcting past-midnight hours first.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let corrected = correct_time(s.trim())?;
    NaiveTime::parse_from_str(&corrected, CLOCK_FORMAT)
        .map_err(|e| InsightError::InvalidDomain(format!("cannot parse time '{s}': {e}")))
}

/// Parses an absolute timestamp. A bare date maps to midnight.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    validate_time_format(s)?;

    if is_date(s) {
        return NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| InsightError::InvalidDomain(format!("invalid date '{s}'")));
    }

    let normalized = s.replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT)
        .map_err(|e| InsightError::InvalidDomain(format!("cannot parse timestamp '{s}': {e}")))
}

/// Places each time-of-day on a calendar date relative to `reference`.
///
/// Times at or after the reference clock time land on the reference date,
/// earlier ones on the following day, so a service day that crosses midnight
/// becomes one continuous run of timestamps.
pub fn anchor_to_service_day(times: &[NaiveTime], reference: NaiveDateTime) -> Result<Vec<NaiveDateTime>> {
    let same_day = reference.date();
    let next_day = same_day.checked_add_days(Days::new(1)).ok_or_else(|| {
        InsightError::InvalidDomain(format!("no calendar day after {same_day}"))
    })?;
    let cutoff = reference.time();

    Ok(times
        .iter()
        .map(|&t| {
            if t >= cutoff {
                same_day.and_time(t)
            } else {
                next_day.and_time(t)
            }
        })
        .collect())
}

/// Serde adapter for observation timestamps in CSV and API payloads.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&t.format(super::TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
