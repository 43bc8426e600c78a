//! Time related utils.

use chrono::{FixedOffset, SecondsFormat, Utc};

/// DateTime in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// Create a new DateTime for the current time.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a DateTime as `20220313`.
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format a DateTime as `20220313T072004Z`.
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a DateTime as RFC3339, `2022-03-13T07:20:04Z`.
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a DateTime as `Sun, 13 Mar 2022 07:20:04`.
///
/// GMT wall clock without a zone suffix, the shape the Kodo gateway
/// expects in its `Date` header.
pub fn format_gmt(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S").to_string()
}

/// Format a DateTime as `2022-03-13 15:20:04` in UTC+8.
///
/// The Alipay gateway reads `timestamp` fields as Beijing wall-clock
/// time regardless of where the caller runs.
pub fn format_beijing(t: DateTime) -> String {
    let beijing = FixedOffset::east_opt(8 * 3600).expect("static offset is valid");
    t.with_timezone(&beijing).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> DateTime {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(fixed()), "20240115");
    }

    #[test]
    fn test_format_iso8601() {
        assert_eq!(format_iso8601(fixed()), "20240115T093000Z");
    }

    #[test]
    fn test_format_rfc3339() {
        assert_eq!(format_rfc3339(fixed()), "2024-01-15T09:30:00Z");
    }

    #[test]
    fn test_format_gmt() {
        assert_eq!(format_gmt(fixed()), "Mon, 15 Jan 2024 09:30:00");
    }

    #[test]
    fn test_format_beijing_shifts_eight_hours() {
        assert_eq!(format_beijing(fixed()), "2024-01-15 17:30:00");
    }
}
