use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses the ISO-8601 timestamps written into transcript entries
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a timestamp string into a `DateTime<Utc>`.
    /// Accepts `Z` and explicit offsets; offset-less values are taken as UTC.
    pub fn parse(timestamp_str: &str) -> Result<DateTime<Utc>> {
        let trimmed = timestamp_str.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(naive.and_utc());
        }

        anyhow::bail!("Failed to parse timestamp: {}", timestamp_str)
    }

    /// UTC calendar day (`YYYY-MM-DD`) of a timestamp string.
    pub fn utc_day(timestamp_str: &str) -> Option<String> {
        Self::parse(timestamp_str)
            .ok()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_z_suffix() {
        let parsed = TimestampParser::parse("2024-01-01T12:00:00.000Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_offset_converts_to_utc() {
        let parsed = TimestampParser::parse("2024-01-01T01:30:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2023-12-31T23:30:00+00:00");
    }

    #[test]
    fn test_parse_naive() {
        assert!(TimestampParser::parse("2024-01-01T12:00:00.000").is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TimestampParser::parse("invalid").is_err());
        assert!(TimestampParser::parse("").is_err());
    }

    #[test]
    fn test_utc_day() {
        assert_eq!(
            TimestampParser::utc_day("2024-03-05T23:59:59Z").as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            TimestampParser::utc_day("2024-03-05T23:30:00-02:00").as_deref(),
            Some("2024-03-06")
        );
        assert_eq!(TimestampParser::utc_day("nope"), None);
    }
}
