//! Value-to-SQL-literal inference.
//!
//! Every raw CSV cell is classified into exactly one [`SqlLiteral`] variant by
//! an ordered chain of checks (first match wins):
//!
//! 1. absent, blank, or `NULL` (any ASCII case) → `NULL`
//! 2. ISO-8601 date or date-time → `CONVERT(datetime2(7), '...', 126)` with the
//!    instant normalized to UTC and a 7-digit fraction
//! 3. signed decimal number → passed through unchanged
//! 4. anything else → `N'...'` with embedded quotes doubled
//!
//! The date check runs before the numeric check and the string variant is the
//! universal fallback, so classification is total and never fails.

use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::debug;
use regex::{Captures, Regex};
use thiserror::Error;

/// Style 126 is the ISO-8601 input style understood by `CONVERT`.
pub const DATETIME_STYLE: u16 = 126;
pub const DATETIME_TYPE: &str = "datetime2(7)";
const FRACTION_DIGITS: usize = 7;
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?$").expect("numeric pattern compiles"));

static ISO_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})",
        r"(?:T(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})",
        r"(?:\.(?P<fraction>\d{1,9}))?",
        r"(?P<zone>Z|(?P<sign>[+\-])(?P<off_hour>\d{2}):(?P<off_minute>\d{2}))?",
        r")?$"
    ))
    .expect("iso date-time pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlLiteral {
    Null,
    /// Numeric text emitted verbatim.
    Number(String),
    /// Normalized `YYYY-MM-DDTHH:MM:SS.fffffff` text, or the input text when
    /// it could not be read as a calendar instant.
    DateTime(String),
    /// Unescaped string contents.
    Text(String),
}

impl fmt::Display for SqlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlLiteral::Null => f.write_str("NULL"),
            SqlLiteral::Number(text) => f.write_str(text),
            SqlLiteral::DateTime(text) => {
                write!(f, "CONVERT({DATETIME_TYPE}, '{text}', {DATETIME_STYLE})")
            }
            SqlLiteral::Text(text) => write!(f, "N'{}'", escape_quotes(text)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("'{0}' is not an ISO-8601 date or date-time")]
    Pattern(String),
    #[error("'{0}' is not a valid calendar date")]
    Date(String),
    #[error("'{0}' is not a valid time of day")]
    Time(String),
    #[error("'{0}' carries an out-of-range UTC offset")]
    Offset(String),
    #[error("'{0}' falls outside years 0001-9999")]
    Year(String),
}

/// Renders one raw field as SQL text.
pub fn render(value: Option<&str>) -> String {
    classify(value).to_string()
}

pub fn classify(value: Option<&str>) -> SqlLiteral {
    let Some(raw) = value else {
        return SqlLiteral::Null;
    };
    let trimmed = raw.trim();
    match trimmed {
        v if v.is_empty() || v.eq_ignore_ascii_case("NULL") => SqlLiteral::Null,
        v if ISO_DATETIME_RE.is_match(v) => match normalize_datetime(v) {
            Ok(normalized) => SqlLiteral::DateTime(normalized),
            Err(err) => {
                debug!("Keeping date-like value verbatim: {err}");
                SqlLiteral::DateTime(v.to_string())
            }
        },
        v if NUMERIC_RE.is_match(v) => SqlLiteral::Number(v.to_string()),
        v => SqlLiteral::Text(v.to_string()),
    }
}

/// Converts an ISO-8601 date or date-time into UTC wall-clock text with a
/// 7-digit fraction and no offset suffix.
pub fn normalize_datetime(value: &str) -> Result<String, DateTimeError> {
    let captures = ISO_DATETIME_RE
        .captures(value)
        .ok_or_else(|| DateTimeError::Pattern(value.to_string()))?;

    let date = parse_date(&captures).ok_or_else(|| DateTimeError::Date(value.to_string()))?;
    let time = match captures.name("hour") {
        Some(_) => parse_time(&captures).ok_or_else(|| DateTimeError::Time(value.to_string()))?,
        None => NaiveTime::MIN,
    };

    let local = NaiveDateTime::new(date, time);
    check_year(&local, value)?;
    let utc = match captures.name("zone") {
        None => local,
        Some(zone) => {
            let offset = if zone.as_str() == "Z" {
                FixedOffset::east_opt(0)
            } else {
                parse_offset(&captures)
            }
            .ok_or_else(|| DateTimeError::Offset(value.to_string()))?;
            local
                .and_local_timezone(offset)
                .single()
                .ok_or_else(|| DateTimeError::Offset(value.to_string()))?
                .with_timezone(&Utc)
                .naive_utc()
        }
    };

    check_year(&utc, value)?;
    Ok(format_datetime2(&utc))
}

fn check_year(value: &NaiveDateTime, input: &str) -> Result<(), DateTimeError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&value.year()) {
        Ok(())
    } else {
        Err(DateTimeError::Year(input.to_string()))
    }
}

/// `YYYY-MM-DDTHH:MM:SS.fffffff`, the text form `datetime2(7)` accepts.
pub fn format_datetime2(value: &NaiveDateTime) -> String {
    let ticks = value.and_utc().timestamp_subsec_nanos() / 100;
    format!(
        "{}.{ticks:0width$}",
        value.format("%Y-%m-%dT%H:%M:%S"),
        width = FRACTION_DIGITS
    )
}

pub fn escape_quotes(value: &str) -> String {
    value.replace('\'', "''")
}

fn parse_date(captures: &Captures<'_>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        number(captures, "year")?,
        number(captures, "month")?,
        number(captures, "day")?,
    )
}

fn parse_time(captures: &Captures<'_>) -> Option<NaiveTime> {
    NaiveTime::from_hms_nano_opt(
        number(captures, "hour")?,
        number(captures, "minute")?,
        number(captures, "second")?,
        fraction_nanos(captures.name("fraction").map(|m| m.as_str()))?,
    )
}

fn fraction_nanos(fraction: Option<&str>) -> Option<u32> {
    match fraction {
        None => Some(0),
        Some(digits) => format!("{digits:0<9}").parse().ok(),
    }
}

fn parse_offset(captures: &Captures<'_>) -> Option<FixedOffset> {
    let hours: i32 = number(captures, "off_hour")?;
    let minutes: i32 = number(captures, "off_minute")?;
    if minutes >= 60 {
        return None;
    }
    let magnitude = hours * 3600 + minutes * 60;
    match captures.name("sign").map(|m| m.as_str()) {
        Some("-") => FixedOffset::west_opt(magnitude),
        _ => FixedOffset::east_opt(magnitude),
    }
}

fn number<T: FromStr>(captures: &Captures<'_>, name: &str) -> Option<T> {
    captures.name(name)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn parse_utc(normalized: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(normalized, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    #[test]
    fn null_sentinels_render_null() {
        assert_eq!(render(None), "NULL");
        assert_eq!(render(Some("")), "NULL");
        assert_eq!(render(Some("   \t")), "NULL");
        assert_eq!(render(Some("null")), "NULL");
        assert_eq!(render(Some(" NuLl ")), "NULL");
    }

    #[test]
    fn numbers_pass_through_trimmed() {
        assert_eq!(render(Some("42")), "42");
        assert_eq!(render(Some(" -3.14 ")), "-3.14");
        assert_eq!(render(Some("+7")), "+7");
        assert_eq!(render(Some("007")), "007");
    }

    #[test]
    fn numeric_lookalikes_fall_back_to_strings() {
        assert_eq!(render(Some("1e10")), "N'1e10'");
        assert_eq!(render(Some("1,000")), "N'1,000'");
        assert_eq!(render(Some("3.")), "N'3.'");
        assert_eq!(render(Some(".5")), "N'.5'");
    }

    #[test]
    fn strings_are_quoted_and_escaped() {
        assert_eq!(render(Some("Alice")), "N'Alice'");
        assert_eq!(render(Some("O'Brien")), "N'O''Brien'");
        assert_eq!(render(Some("  padded  ")), "N'padded'");
        assert_eq!(render(Some("''")), "N''''''");
    }

    #[test]
    fn bare_date_expands_to_midnight() {
        assert_eq!(
            render(Some("2024-03-09")),
            "CONVERT(datetime2(7), '2024-03-09T00:00:00.0000000', 126)"
        );
    }

    #[test]
    fn offset_is_converted_to_utc() {
        assert_eq!(
            normalize_datetime("2024-01-05T10:00:00+02:00").unwrap(),
            "2024-01-05T08:00:00.0000000"
        );
        assert_eq!(
            normalize_datetime("2024-01-05T23:30:00-01:00").unwrap(),
            "2024-01-06T00:30:00.0000000"
        );
        assert_eq!(
            normalize_datetime("2024-01-05T10:00:00Z").unwrap(),
            "2024-01-05T10:00:00.0000000"
        );
    }

    #[test]
    fn fraction_is_padded_or_truncated_to_seven_digits() {
        assert_eq!(
            normalize_datetime("2024-01-05T10:00:00.5").unwrap(),
            "2024-01-05T10:00:00.5000000"
        );
        assert_eq!(
            normalize_datetime("2024-01-05T10:00:00.1234567").unwrap(),
            "2024-01-05T10:00:00.1234567"
        );
        assert_eq!(
            normalize_datetime("2024-01-05T10:00:00.123456789").unwrap(),
            "2024-01-05T10:00:00.1234567"
        );
    }

    #[test]
    fn invalid_calendar_values_fall_back_verbatim() {
        assert_eq!(
            classify(Some("2024-02-30")),
            SqlLiteral::DateTime("2024-02-30".to_string())
        );
        assert_eq!(
            render(Some(" 2024-01-01T25:00:00 ")),
            "CONVERT(datetime2(7), '2024-01-01T25:00:00', 126)"
        );
        assert!(matches!(
            normalize_datetime("2024-13-01"),
            Err(DateTimeError::Date(_))
        ));
        assert!(matches!(
            normalize_datetime("2024-01-01T10:00:00+24:00"),
            Err(DateTimeError::Offset(_))
        ));
    }

    #[test]
    fn years_outside_datetime2_range_fall_back_verbatim() {
        assert_eq!(
            render(Some("9999-12-31T23:30:00-01:00")),
            "CONVERT(datetime2(7), '9999-12-31T23:30:00-01:00', 126)"
        );
        assert_eq!(
            render(Some("0000-01-01")),
            "CONVERT(datetime2(7), '0000-01-01', 126)"
        );
        assert_eq!(
            render(Some("0001-01-01T00:30:00+01:00")),
            "CONVERT(datetime2(7), '0001-01-01T00:30:00+01:00', 126)"
        );
        assert!(matches!(
            normalize_datetime("0000-06-15T12:00:00"),
            Err(DateTimeError::Year(_))
        ));
        assert_eq!(
            normalize_datetime("9999-12-31T23:59:59.9999999Z").unwrap(),
            "9999-12-31T23:59:59.9999999"
        );
        assert_eq!(
            normalize_datetime("0001-01-01T01:30:00+01:00").unwrap(),
            "0001-01-01T00:30:00.0000000"
        );
    }

    #[test]
    fn partial_dates_are_not_dates() {
        assert_eq!(render(Some("2024")), "2024");
        assert_eq!(render(Some("2024-01")), "N'2024-01'");
        assert_eq!(render(Some("2024-01-05 10:00:00")), "N'2024-01-05 10:00:00'");
    }

    #[test]
    fn normalized_text_reparses_as_utc() {
        let normalized = normalize_datetime("2023-12-31T22:15:30.25-05:30").unwrap();
        let parsed = parse_utc(&normalized).expect("reparse");
        let expected = DateTime::parse_from_rfc3339("2023-12-31T22:15:30.25-05:30")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }
}
