//! Cell formatting for task records.
//!
//! Dates read from the backend come in several shapes (`YYYY-MM-DD`,
//! RFC 3339 timestamps, naive timestamps) and the display forms written
//! here are accepted back as input, so display-then-normalize keeps the
//! calendar day.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::schema::{Column, TaskField};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d %b %Y"];

const NAIVE_DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d %b %Y %H:%M",
];

/// Parse a calendar date. Date-only input is never shifted by time zone;
/// timestamps are converted to local time first.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    parse_datetime(value).map(|datetime| datetime.date())
}

/// Parse a timestamp into local wall-clock time. Date-only input maps to
/// midnight.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(value) {
        return Some(stamp.with_timezone(&Local).naive_local());
    }
    // PostgREST renders `timestamptz` with a space separator and a short offset.
    if let Ok(stamp) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(stamp.with_timezone(&Local).naive_local());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// "10 Jan 2024"; empty or unparseable input yields "".
pub fn format_date(value: &str) -> String {
    parse_date(value)
        .map(|date| date.format("%-d %b %Y").to_string())
        .unwrap_or_default()
}

/// "10 Jan 2024 14:05" in local time; empty or unparseable input yields "".
pub fn format_datetime(value: &str) -> String {
    parse_datetime(value)
        .map(|datetime| datetime.format("%-d %b %Y %H:%M").to_string())
        .unwrap_or_default()
}

/// Normalize to the `YYYY-MM-DD` date-input form; empty or unparseable
/// input yields "".
pub fn to_date_input_value(value: &str) -> String {
    parse_date(value)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Whether a date-input value can be written: empty, or a complete,
/// zero-padded `YYYY-MM-DD` calendar date.
pub fn is_date_input(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .is_ok_and(|date| date.format("%Y-%m-%d").to_string() == value)
}

/// Sort key for a deployment date: epoch milliseconds, 0 when missing or
/// unparseable.
pub fn timestamp_key(value: Option<&str>) -> i64 {
    value
        .and_then(parse_datetime)
        .map(|datetime| datetime.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Text shown in a table cell for a column value.
pub fn cell_display(column: Column, value: Option<&str>) -> String {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        return String::new();
    };
    match column {
        Column::Field(TaskField::DeploymentDate) => format_date(value),
        Column::CreatedAt | Column::UpdatedAt => format_datetime(value),
        Column::Field(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_date_uses_short_month_and_unpadded_day() {
        assert_eq!(format_date("2024-01-05"), "5 Jan 2024");
        assert_eq!(format_date("2024-12-31"), "31 Dec 2024");
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("not a date"), "");
    }

    #[test]
    fn format_datetime_keeps_wall_clock_for_naive_input() {
        assert_eq!(format_datetime("2024-01-10T14:05:00"), "10 Jan 2024 14:05");
        assert_eq!(format_datetime("2024-01-10 09:30:12.123456"), "10 Jan 2024 09:30");
        assert_eq!(format_datetime("   "), "");
    }

    #[test]
    fn date_input_value_normalizes_every_accepted_shape() {
        assert_eq!(to_date_input_value("2024-03-01"), "2024-03-01");
        assert_eq!(to_date_input_value("1 Mar 2024"), "2024-03-01");
        assert_eq!(to_date_input_value("2024-03-01T08:00:00"), "2024-03-01");
        assert_eq!(to_date_input_value("garbage"), "");
        assert_eq!(to_date_input_value(""), "");
    }

    #[test]
    fn date_input_accepts_only_empty_or_full_dates() {
        assert!(is_date_input(""));
        assert!(is_date_input("2024-02-29"));
        assert!(!is_date_input("2024-01-"));
        assert!(!is_date_input("2024-01-1"));
        assert!(!is_date_input("2023-02-29"));
        assert!(!is_date_input("10 Jan 2024"));
        assert!(!is_date_input("garbage"));
    }

    #[test]
    fn display_then_normalize_preserves_calendar_day() {
        for raw in ["2024-01-10", "2023-02-28", "2024-02-29", "1999-12-31"] {
            assert_eq!(to_date_input_value(&format_date(raw)), raw);
        }
    }

    #[test]
    fn timestamp_key_orders_and_defaults_to_zero() {
        assert_eq!(timestamp_key(None), 0);
        assert_eq!(timestamp_key(Some("")), 0);
        assert_eq!(timestamp_key(Some("nope")), 0);
        assert!(timestamp_key(Some("2024-03-01")) > timestamp_key(Some("2024-01-10")));
        assert_eq!(timestamp_key(Some("1970-01-01")), 0);
    }

    #[test]
    fn cell_display_formats_by_column() {
        assert_eq!(
            cell_display(Column::Field(TaskField::DeploymentDate), Some("2024-01-10")),
            "10 Jan 2024"
        );
        assert_eq!(
            cell_display(Column::UpdatedAt, Some("2024-01-10T14:05:00")),
            "10 Jan 2024 14:05"
        );
        assert_eq!(cell_display(Column::Field(TaskField::Pay), Some("1200 USD")), "1200 USD");
        assert_eq!(cell_display(Column::Field(TaskField::Pay), None), "");
    }
}
