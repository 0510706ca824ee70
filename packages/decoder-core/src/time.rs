//! Time helpers shared by the store and the sync envelope.

use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Formats a timestamp as RFC 3339 with millisecond precision.
pub fn to_rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an ISO-8601 / RFC 3339 timestamp, returning `None` when it
/// does not parse.
///
/// Naive timestamps without an offset (as written by Python's
/// `datetime.utcnow().isoformat()`) are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_millis_is_reasonable() {
        let ts = now_timestamp_millis();
        // Should be after 2024-01-01 in millis
        assert!(ts > 1704067200_000, "Timestamp {} is too old", ts);
    }

    #[test]
    fn test_parse_rfc3339_round_trip() {
        let ts = now();
        let parsed = parse_timestamp(&to_rfc3339(&ts)).unwrap();
        assert_eq!(parsed.timestamp_millis(), ts.timestamp_millis());
    }

    #[test]
    fn test_parse_naive_iso() {
        let parsed = parse_timestamp("2025-03-01T10:20:30.123456").unwrap();
        assert_eq!(parsed.timestamp(), 1740824430);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
