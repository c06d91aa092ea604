//! Date string formats understood by validators and parsers.
//!
//! Two encodings are supported:
//!
//! - ISO-8601 with millisecond precision and a literal `Z` suffix
//!   (`2000-01-01T00:00:00.000Z`), the default.
//! - Calendar dates (`2000-01-01`), interpreted as UTC midnight so the
//!   resulting instant does not depend on the host time zone.
//!
//! Matching is deliberately strict: a string must match the pattern *and*
//! have the exact expected length.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

// SAFETY: These regexes are compile-time constants and are validated by tests.
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").expect("static regex must compile")
});
static YMD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex must compile"));

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const YMD_FORMAT: &str = "%Y-%m-%d";

/// Accepted date string encoding.
///
/// # Examples
///
/// ```
/// use shapecheck_core::DateFormat;
///
/// assert!(DateFormat::Iso.parse("2000-01-01T00:00:00.000Z").is_some());
/// assert!(DateFormat::Iso.parse("2000-01-01").is_none());
/// assert!(DateFormat::YearMonthDay.parse("2000-01-01").is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    /// `yyyy-mm-ddThh:mm:ss.sssZ`
    #[default]
    #[serde(rename = "iso")]
    Iso,
    /// `yyyy-mm-dd`
    #[serde(rename = "yyyy-mm-dd")]
    YearMonthDay,
}

impl DateFormat {
    /// Exact character length of a well-formed date string.
    pub fn expected_len(self) -> usize {
        match self {
            DateFormat::Iso => 24,
            DateFormat::YearMonthDay => 10,
        }
    }

    /// Returns a human-readable template for error messages.
    pub fn template(self) -> &'static str {
        match self {
            DateFormat::Iso => "yyyy-mm-ddThh:mm:ss.sssZ",
            DateFormat::YearMonthDay => "yyyy-mm-dd",
        }
    }

    /// Checks the shape of `s` without interpreting it.
    pub fn matches(self, s: &str) -> bool {
        if s.len() != self.expected_len() {
            return false;
        }
        match self {
            DateFormat::Iso => ISO_RE.is_match(s),
            DateFormat::YearMonthDay => YMD_RE.is_match(s),
        }
    }

    /// Parses `s` into a UTC instant.
    ///
    /// Returns `None` when the shape does not match or the calendar fields are
    /// out of range (e.g. `2000-02-30`).
    pub fn parse(self, s: &str) -> Option<DateTime<Utc>> {
        if !self.matches(s) {
            return None;
        }
        match self {
            DateFormat::Iso => NaiveDateTime::parse_from_str(s, ISO_FORMAT)
                .ok()
                .map(|naive| naive.and_utc()),
            DateFormat::YearMonthDay => NaiveDate::parse_from_str(s, YMD_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc()),
        }
    }

    /// Renders `date` in this format.
    pub fn format(self, date: &DateTime<Utc>) -> String {
        match self {
            DateFormat::Iso => format_iso(date),
            DateFormat::YearMonthDay => date.format(YMD_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template())
    }
}

/// Renders `date` as ISO-8601 with milliseconds and a `Z` suffix.
pub fn format_iso(date: &DateTime<Utc>) -> String {
    date.format(ISO_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_iso_requires_milliseconds_and_z() {
        assert!(DateFormat::Iso.matches("2000-01-01T00:00:00.000Z"));
        assert!(!DateFormat::Iso.matches("2000-01-01T00:00:00Z"));
        assert!(!DateFormat::Iso.matches("2000-01-01T00:00:00.000+01:00"));
        assert!(!DateFormat::Iso.matches("2000-01-01"));
    }

    #[test]
    fn test_year_month_day_is_utc_midnight() {
        let date = DateFormat::YearMonthDay.parse("2000-01-02").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2000, 1, 2));
        assert_eq!((date.hour(), date.minute(), date.second()), (0, 0, 0));
    }

    #[test]
    fn test_year_month_day_rejects_iso() {
        assert!(DateFormat::YearMonthDay.parse("2000-01-01T00:00:00.000Z").is_none());
    }

    #[test]
    fn test_out_of_range_fields_fail_to_parse() {
        assert!(DateFormat::YearMonthDay.matches("2000-02-30"));
        assert!(DateFormat::YearMonthDay.parse("2000-02-30").is_none());
    }

    #[test]
    fn test_format_round_trips() {
        let raw = "2021-06-15T12:34:56.789Z";
        let date = DateFormat::Iso.parse(raw).unwrap();
        assert_eq!(DateFormat::Iso.format(&date), raw);
    }
}
