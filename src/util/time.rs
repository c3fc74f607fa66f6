use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// All stored timestamps are UTC RFC 3339 with millisecond precision, so
/// lexical order matches chronological order in range queries.
pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now() -> String {
    format(&Utc::now())
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Re-format any accepted input into the canonical stored form
pub fn normalize(value: &str) -> Option<String> {
    parse(value).map(|at| format(&at))
}

pub fn minutes_between(from: &str, to: &str) -> Option<f64> {
    let start = parse(from)?;
    let end = parse(to)?;
    Some((end - start).num_milliseconds() as f64 / 60_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dates_and_timestamps() {
        assert_eq!(normalize("2025-09-07").unwrap(), "2025-09-07T00:00:00.000Z");
        assert_eq!(normalize("2025-09-07T10:15:00+05:30").unwrap(), "2025-09-07T04:45:00.000Z");
        assert!(parse("yesterday").is_none());
    }

    #[test]
    fn test_minutes_between() {
        let minutes = minutes_between("2025-09-07T10:00:00.000Z", "2025-09-07T10:45:30.000Z").unwrap();
        assert!((minutes - 45.5).abs() < f64::EPSILON);
    }
}
