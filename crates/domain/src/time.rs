//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// UTC timestamp used for `created`, `last_connected`, `last_changed`, etc.
pub type Timestamp = DateTime<Utc>;

/// Wire format for timestamps: `YYYY-MM-DD HH:MM:SS`.
pub const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp in the wire format.
#[must_use]
pub fn format_wire(ts: Timestamp) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

/// Parse a wire-format timestamp, interpreted as UTC.
#[must_use]
pub fn parse_wire(raw: &str) -> Option<Timestamp> {
    NaiveDateTime::parse_from_str(raw, WIRE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_format_without_fractional_seconds() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_wire(ts), "2024-03-09 07:05:01");
    }

    #[test]
    fn should_parse_what_it_formats() {
        let ts = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_wire(&format_wire(ts)), Some(ts));
        assert_eq!(parse_wire("yesterday"), None);
    }
}
