//! Timestamp normalization for EWS requests
//!
//! Exchange expects every timestamp as UTC in a fixed-width pattern.
//! Naive timestamps cannot be represented by the typed API; textual input
//! without an offset is rejected here.

use crate::error::{CalendarError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Timestamp pattern expected by Exchange (`YYYY-MM-DDTHH:MM:SSZ`)
pub const EXCHANGE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Convert an aware timestamp to UTC
pub fn to_utc<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

/// Convert to UTC and format with [`EXCHANGE_DATE_FORMAT`]
pub fn format_exchange_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    to_utc(dt).format(EXCHANGE_DATE_FORMAT).to_string()
}

/// Parse an RFC 3339 timestamp that carries an offset.
///
/// Input that parses as a local date-time but lacks an offset yields
/// [`CalendarError::NaiveTimestamp`], anything else unparsable yields
/// [`CalendarError::InvalidTimestamp`].
pub fn parse_aware_datetime(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt);
    }

    let naive = value
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"));
    if naive.is_ok() {
        return Err(CalendarError::NaiveTimestamp(value.to_string()));
    }

    Err(CalendarError::InvalidTimestamp(value.to_string()))
}

/// Serde adapter for optional aware timestamps.
///
/// Values are written as RFC 3339 strings and must carry an offset when read.
/// Native TOML datetimes are accepted too.
pub mod serde_aware {
    use super::parse_aware_datetime;
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Toml(toml::value::Datetime),
    }

    impl RawTimestamp {
        fn into_text(self) -> String {
            match self {
                Self::Text(text) => text,
                Self::Toml(dt) => dt.to_string(),
            }
        }
    }

    pub fn serialize<S>(value: &Option<DateTime<FixedOffset>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<RawTimestamp> = Option::deserialize(deserializer)?;
        raw.map(|raw| parse_aware_datetime(&raw.into_text()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Los_Angeles;
    use chrono_tz::Asia::Tokyo;

    #[test]
    fn test_format_utc_is_unchanged() {
        let dt = Utc.with_ymd_and_hms(2013, 10, 14, 9, 30, 0).unwrap();
        assert_eq!(format_exchange_datetime(&dt), "2013-10-14T09:30:00Z");
    }

    #[test]
    fn test_format_converts_named_zone() {
        // PDT is UTC-7 in October
        let dt = Los_Angeles.with_ymd_and_hms(2013, 10, 14, 17, 5, 9).unwrap();
        assert_eq!(format_exchange_datetime(&dt), "2013-10-15T00:05:09Z");

        let dt = Tokyo.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        assert_eq!(format_exchange_datetime(&dt), "2023-12-31T23:00:00Z");
    }

    #[test]
    fn test_format_drops_subseconds() {
        let dt = DateTime::parse_from_rfc3339("2024-03-01T12:00:00.987+01:00").unwrap();
        assert_eq!(format_exchange_datetime(&dt), "2024-03-01T11:00:00Z");
    }

    #[test]
    fn test_to_utc_preserves_instant() {
        let dt = Tokyo.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let utc = to_utc(&dt);
        assert_eq!(utc, dt);
        assert_eq!(utc.timezone(), Utc);
    }

    #[test]
    fn test_parse_aware() {
        let dt = parse_aware_datetime("2024-06-01T09:00:00+09:00").unwrap();
        assert_eq!(format_exchange_datetime(&dt), "2024-06-01T00:00:00Z");

        let dt = parse_aware_datetime("2024-06-01T09:00:00Z").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_naive_is_rejected() {
        let err = parse_aware_datetime("2024-06-01T09:00:00").unwrap_err();
        assert!(matches!(err, CalendarError::NaiveTimestamp(_)));

        let err = parse_aware_datetime("2024-06-01 09:00:00").unwrap_err();
        assert!(matches!(err, CalendarError::NaiveTimestamp(_)));
    }

    #[test]
    fn test_parse_garbage_is_invalid() {
        let err = parse_aware_datetime("next tuesday").unwrap_err();
        assert!(matches!(err, CalendarError::InvalidTimestamp(_)));
    }
}
