//! Best-effort normalization of legacy date strings

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, TimeZone};

/// How a format string should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// The string carries its own offset
    Explicit,
    /// No offset in the string, read as local time
    Local,
}

/// Known formats, most constrained first
const DATE_FORMATS: &[(&str, Zone)] = &[
    ("%a, %d %b %Y %H:%M:%S %z", Zone::Explicit),
    ("%d %b %Y %H:%M:%S %z", Zone::Explicit),
    ("%m/%d/%Y %I:%M:%S %p", Zone::Local),
    ("%Y-%m-%d %H:%M:%S%z", Zone::Explicit),
    ("%Y-%m-%d %H:%M:%S", Zone::Local),
];

/// Parse `raw` against the known formats and return the instant in the
/// local offset, or `None` if nothing matches.
#[must_use]
pub fn parse_date(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS.iter().find_map(|(format, zone)| match zone {
        Zone::Explicit => DateTime::<FixedOffset>::parse_from_str(raw, format)
            .ok()
            .map(|dt| dt.with_timezone(&Local)),
        Zone::Local => NaiveDateTime::parse_from_str(raw, format)
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest()),
    })
}

/// Normalize a date string to ISO 8601 with the local offset.
///
/// Empty input gives an empty string. Input that matches no known format
/// is returned unchanged.
///
/// ```
/// use msg_convert::normalize_date;
///
/// assert_eq!(normalize_date("garbage-date"), "garbage-date");
/// assert_eq!(normalize_date("   "), "");
/// ```
#[must_use]
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    parse_date(trimmed).map_or_else(
        || trimmed.to_string(),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false),
    )
}

/// Re-emit an RFC 2822 date as a MIME `Date` header value.
///
/// Falls back to the raw string when it does not parse.
#[must_use]
pub fn mime_date(raw: &str) -> String {
    let trimmed = raw.trim();
    DateTime::parse_from_rfc2822(trimmed).map_or_else(|_| trimmed.to_string(), |dt| dt.to_rfc2822())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn reparse(normalized: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(normalized)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_rfc2822_with_weekday() {
        let out = normalize_date("Thu, 01 Dec 2016 11:44:10 -0500");
        let expected = Utc.with_ymd_and_hms(2016, 12, 1, 16, 44, 10).unwrap();
        assert_eq!(reparse(&out), expected);
        assert_eq!(normalize_date(&out), out);
    }

    #[test]
    fn test_rfc2822_without_weekday() {
        let out = normalize_date("01 Dec 2016 11:44:10 +0100");
        let expected = Utc.with_ymd_and_hms(2016, 12, 1, 10, 44, 10).unwrap();
        assert_eq!(reparse(&out), expected);
    }

    #[test]
    fn test_us_twelve_hour_is_local() {
        let out = normalize_date("12/01/2016 03:15:00 PM");
        let naive = NaiveDate::from_ymd_opt(2016, 12, 1)
            .unwrap()
            .and_hms_opt(15, 15, 0)
            .unwrap();
        let expected = Local.from_local_datetime(&naive).earliest().unwrap();
        assert_eq!(reparse(&out), expected.with_timezone(&Utc));
    }

    #[test]
    fn test_iso_with_zone() {
        let out = normalize_date("2016-12-01 11:44:10+0000");
        let expected = Utc.with_ymd_and_hms(2016, 12, 1, 11, 44, 10).unwrap();
        assert_eq!(reparse(&out), expected);
    }

    #[test]
    fn test_iso_without_zone_is_local() {
        let out = normalize_date("2016-12-01 11:44:10");
        let naive = NaiveDate::from_ymd_opt(2016, 12, 1)
            .unwrap()
            .and_hms_opt(11, 44, 10)
            .unwrap();
        let expected = Local.from_local_datetime(&naive).earliest().unwrap();
        assert_eq!(reparse(&out), expected.with_timezone(&Utc));
    }

    #[test]
    fn test_unknown_format_passes_through() {
        assert_eq!(normalize_date("garbage-date"), "garbage-date");
        assert_eq!(normalize_date("yesterday at noon"), "yesterday at noon");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_date(""), "");
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_mime_date() {
        assert_eq!(
            mime_date("Thu, 01 Dec 2016 11:44:10 -0500"),
            "Thu, 1 Dec 2016 11:44:10 -0500"
        );
        assert_eq!(mime_date("not a date"), "not a date");
    }
}
