//! Date parsing and formatting for front matter and filesystem timestamps.
//!
//! Accepted front matter formats:
//!
//! | Input | Example |
//! |-------|---------|
//! | ISO date | `2024-03-15` |
//! | ISO date-time | `2024-03-15 09:30:00`, `2024-03-15T09:30:00` |
//! | RFC 3339 | `2024-03-15T09:30:00+02:00` |
//! | day/month/year | `15/3/2024`, `05/03/2024` |
//!
//! Dates without a time of day are taken as midnight UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::fmt::Write;
use std::sync::LazyLock;
use std::time::SystemTime;

static DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());

const FALLBACK_FORMAT: &str = "%Y-%m-%d";

/// Parse a front matter date string.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures(input) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(midnight);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok().map(midnight)
}

/// Parse a date from a front matter value. Only strings carry dates.
pub fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_date)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Format a timestamp with a strftime pattern.
///
/// An invalid pattern falls back to `YYYY-MM-DD` instead of failing.
pub fn format_date(date: &DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_ok() {
        return out;
    }
    date.format(FALLBACK_FORMAT).to_string()
}

/// Convert a filesystem timestamp.
pub fn from_system_time(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_iso_date_as_midnight() {
        let d = parse_date("2024-03-15").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 15));
        assert_eq!(d.hour(), 0);
    }

    #[test]
    fn parses_day_month_year() {
        let d = parse_date("5/3/2024").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 5));
        let d = parse_date("15/12/2023").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2023, 12, 15));
    }

    #[test]
    fn rejects_impossible_day_month_year() {
        assert!(parse_date("31/2/2024").is_none());
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let d = parse_date("2024-03-15T09:30:00+02:00").unwrap();
        assert_eq!(d.hour(), 7);
    }

    #[test]
    fn parses_naive_datetime() {
        let d = parse_date("2024-03-15 09:30:00").unwrap();
        assert_eq!((d.hour(), d.minute()), (9, 30));
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_date("next tuesday").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_value(&Value::from(20240315)).is_none());
    }

    #[test]
    fn format_with_pattern() {
        let d = parse_date("2024-03-05").unwrap();
        assert_eq!(format_date(&d, "%a, %b %-d, %Y"), "Tue, Mar 5, 2024");
    }

    #[test]
    fn invalid_pattern_falls_back() {
        let d = parse_date("2024-03-05").unwrap();
        assert_eq!(format_date(&d, "%Q"), "2024-03-05");
    }
}
