use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Result, StorageError};

/// Parses an ISO-8601 instant. A bare calendar date is read as midnight UTC.
pub fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StorageError::validation(format!("{} is required", field)));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            StorageError::validation(format!(
                "{} must be an ISO-8601 date or instant, got '{}'",
                field, value
            ))
        })
}

/// Trims an optional free-text field, dropping it when blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_instant_accepts_rfc3339_and_dates() {
        assert_eq!(
            parse_instant("promoted_on", "2022-01-01").unwrap(),
            Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_instant("promoted_on", "2023-06-01T10:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 1, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_instant_rejects_garbage() {
        assert!(matches!(
            parse_instant("promoted_on", "last tuesday"),
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            parse_instant("promoted_on", "2023-02-30"),
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            parse_instant("promoted_on", " "),
            Err(StorageError::Validation(_))
        ));
    }
}
