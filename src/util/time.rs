use chrono::format::{Item, StrftimeItems};
use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::ReportError;

/// Converts tracker timestamps into the report's timezone and display format.
#[derive(Debug, Clone)]
pub struct TimeNormalizer {
    input_format: String,
    timezone: Tz,
    output_format: String,
}

impl TimeNormalizer {
    /// Validate both format strings and resolve the IANA zone name up front, so that
    /// rendering cannot fail once rows are being mapped.
    pub fn new(
        input_format: &str,
        timezone: &str,
        output_format: &str,
    ) -> Result<Self, ReportError> {
        validate_strftime("datetime_input_fmt", input_format)?;
        validate_strftime("datetime_output_fmt", output_format)?;
        let timezone = parse_timezone(timezone)?;
        Ok(Self {
            input_format: input_format.to_string(),
            timezone,
            output_format: output_format.to_string(),
        })
    }

    pub fn normalize(&self, raw: &str) -> Result<String, ReportError> {
        normalize(raw, &self.input_format, self.timezone, &self.output_format)
    }
}

/// Parse `raw` (which must carry a UTC offset), shift it into `timezone` and render it.
/// The empty string passes through untouched.
pub fn normalize(
    raw: &str,
    input_format: &str,
    timezone: Tz,
    output_format: &str,
) -> Result<String, ReportError> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    let parsed = DateTime::parse_from_str(raw, input_format).map_err(|_| {
        ReportError::MalformedTimestamp {
            value: raw.to_string(),
            format: input_format.to_string(),
        }
    })?;
    Ok(parsed
        .with_timezone(&timezone)
        .format(output_format)
        .to_string())
}

pub fn parse_timezone(name: &str) -> Result<Tz, ReportError> {
    name.parse::<Tz>()
        .map_err(|_| ReportError::UnknownTimezone(name.to_string()))
}

/// Reject format strings chrono would fail to render (e.g. `%Q`).
pub fn validate_strftime(key: &str, format: &str) -> Result<(), ReportError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ReportError::InvalidFormat {
            key: key.to_string(),
            format: format.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "%Y-%m-%d %H:%M:%S%.f%z";
    const OUTPUT: &str = "%Y-%m-%d %H:%M:%S";

    fn moscow() -> Tz {
        parse_timezone("Europe/Moscow").unwrap()
    }

    #[test]
    fn converts_utc_into_target_zone() {
        let out = normalize("2023-05-01 09:15:00.123456+0000", INPUT, moscow(), OUTPUT).unwrap();
        assert_eq!(out, "2023-05-01 12:15:00");
    }

    #[test]
    fn embedded_offset_only_anchors_the_instant() {
        let out = normalize("2023-05-01 14:15:00+0200", INPUT, moscow(), OUTPUT).unwrap();
        assert_eq!(out, "2023-05-01 15:15:00");
    }

    #[test]
    fn empty_input_passes_through() {
        assert_eq!(normalize("", INPUT, moscow(), OUTPUT).unwrap(), "");
        assert_eq!(normalize("", "garbage", Tz::UTC, "%Q").unwrap(), "");
    }

    #[test]
    fn missing_offset_is_malformed() {
        let err = normalize("2023-05-01 09:15:00", INPUT, moscow(), OUTPUT).unwrap_err();
        assert!(matches!(err, ReportError::MalformedTimestamp { .. }));
    }

    #[test]
    fn trailing_input_is_malformed() {
        let err =
            normalize("2023-05-01 09:15:00+0000 extra", INPUT, moscow(), OUTPUT).unwrap_err();
        assert!(matches!(err, ReportError::MalformedTimestamp { .. }));
    }

    #[test]
    fn renormalizing_is_idempotent() {
        let fmt = "%Y-%m-%d %H:%M:%S%z";
        let once = normalize("2023-12-31 23:59:59+0000", fmt, moscow(), fmt).unwrap();
        let twice = normalize(&once, fmt, moscow(), fmt).unwrap();
        assert_eq!(once, "2024-01-01 02:59:59+0300");
        assert_eq!(once, twice);
    }

    #[test]
    fn normalizer_rejects_bad_config() {
        assert!(matches!(
            TimeNormalizer::new(INPUT, "Mars/Olympus", OUTPUT),
            Err(ReportError::UnknownTimezone(_))
        ));
        assert!(matches!(
            TimeNormalizer::new(INPUT, "UTC", "%Y-%Q"),
            Err(ReportError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn normalizer_uses_configured_formats() {
        let normalizer = TimeNormalizer::new(INPUT, "UTC", "%d.%m.%Y").unwrap();
        assert_eq!(
            normalizer.normalize("2023-05-01 23:30:00+0000").unwrap(),
            "01.05.2023"
        );
    }
}
