//! Timestamp utilities
//!
//! Measured-at timestamps carry their originating UTC offset
//! (`DateTime<FixedOffset>`) through the whole pipeline; nothing in this
//! crate consults the ambient system time zone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::{Error, Result};

/// Hours past end-of-day a measurement may still attribute to that day.
/// Matches the 18:00 evening rollover window of sleep attribution.
pub const ATTRIBUTION_TOLERANCE_HOURS: i64 = 6;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Latest local wall-clock instant a measurement may carry and still belong
/// to `date` (end of day plus the attribution tolerance)
pub fn attribution_deadline(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(24 + ATTRIBUTION_TOLERANCE_HOURS)
}

/// Parse an RFC 3339 timestamp, preserving its UTC offset
pub fn parse_measured_at(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| Error::InvalidInput(format!("unparseable timestamp {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_attribution_deadline_is_next_morning() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 14).unwrap();
        let deadline = attribution_deadline(date);
        assert_eq!(
            deadline,
            NaiveDate::from_ymd_opt(2025, 8, 15)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_measured_at_preserves_offset() {
        let ts = parse_measured_at("2025-08-14T22:30:00+02:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(ts.naive_local().to_string(), "2025-08-14 22:30:00");
    }

    #[test]
    fn test_parse_measured_at_rejects_garbage() {
        assert!(parse_measured_at("yesterday evening").is_err());
        assert!(parse_measured_at("").is_err());
    }
}
