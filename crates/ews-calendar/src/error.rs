//! Error types for ews-calendar

use thiserror::Error;

/// ews-calendar error type
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: String, end: String },

    #[error("Timestamp has no UTC offset, cannot convert to UTC: {0}")]
    NaiveTimestamp(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown item field: {0}")]
    UnknownField(String),

    #[error("Invalid base shape: {0} (expected IdOnly, Default or AllProperties)")]
    InvalidBaseShape(String),

    #[error("XML write error: {0}")]
    XmlWrite(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CalendarError::MissingField("change_key");
        assert_eq!(err.to_string(), "Missing required field: change_key");

        let err = CalendarError::UnknownField("colour".to_string());
        assert_eq!(err.to_string(), "Unknown item field: colour");
    }
}
