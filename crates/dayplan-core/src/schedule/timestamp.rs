//! ISO-8601 timestamp parsing with a mandatory UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

use crate::error::ValidationError;

/// Offset-bearing layouts accepted besides strict RFC 3339.
const AWARE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M%:z"];

/// Layouts that parse fine but lack an offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse `value` into an offset-aware instant.
///
/// A timestamp without an offset is rejected as
/// [`ValidationError::NaiveTimestamp`]; it is never assumed to be UTC.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<FixedOffset>, ValidationError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }

    let naive = NAIVE_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).is_ok());
    if naive {
        Err(ValidationError::NaiveTimestamp {
            field: field.to_string(),
            value: value.to_string(),
        })
    } else {
        Err(ValidationError::MalformedTimestamp {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// `HH:MM` in the instant's own offset.
pub fn clock_label(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn accepts_rfc3339_and_zulu() {
        let dt = parse_timestamp("t", "2025-08-25T09:00:00+02:00").unwrap();
        assert_eq!(dt.hour(), 9);
        assert_eq!(dt.offset().local_minus_utc(), 7200);

        let z = parse_timestamp("t", "2025-08-25T09:00:00Z").unwrap();
        assert_eq!(z.offset().local_minus_utc(), 0);
    }

    #[test]
    fn accepts_minute_precision_with_offset() {
        let dt = parse_timestamp("t", "2025-08-25T09:30+00:00").unwrap();
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn rejects_missing_offset() {
        let err = parse_timestamp("events[0].start", "2025-08-25T11:00:00").unwrap_err();
        assert!(matches!(err, ValidationError::NaiveTimestamp { .. }));
        assert_eq!(err.field(), "events[0].start");
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_timestamp("deadline", "next tuesday").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedTimestamp { .. }));
    }

    #[test]
    fn clock_label_uses_local_offset() {
        let dt = parse_timestamp("t", "2025-08-25T09:05:00-04:00").unwrap();
        assert_eq!(clock_label(&dt), "09:05");
    }
}
