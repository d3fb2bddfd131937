//! Parsing of the date expressions accepted by the probes: `now`, RFC 3339
//! timestamps, unix seconds, and relative forms such as `5 minutes ago`.
use chaos_core::{ChaosError, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

pub fn parse_when(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    try_parse(expr.trim(), now)
        .ok_or_else(|| ChaosError::activity_failed(format!("failed to parse '{}'", expr)))
}

/// RFC 3339 in UTC, e.g. `2024-05-01T12:00:00Z`.
pub fn to_rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses `expr` relative to the current time and renders it for the API.
pub fn resolve(expr: &str) -> Result<String> {
    parse_when(expr, Utc::now()).map(to_rfc3339)
}

fn try_parse(expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if expr.is_empty() {
        return None;
    }

    let lowered = expr.to_lowercase();
    if lowered == "now" {
        return Some(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(expr) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(expr, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Some(span) = lowered.strip_suffix(" ago") {
        return now.checked_sub_signed(parse_span(span)?);
    }

    if let Some(span) = lowered.strip_prefix("in ") {
        return now.checked_add_signed(parse_span(span)?);
    }

    let seconds = expr.parse::<f64>().ok().filter(|s| s.is_finite())?;
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

fn parse_span(span: &str) -> Option<chrono::Duration> {
    // humantime wants `2minutes`/`1h30m`; users write `2 minutes`
    let compact: String = span.split_whitespace().collect();
    if compact.is_empty() {
        return None;
    }
    let duration = humantime::parse_duration(&compact).ok()?;
    chrono::Duration::from_std(duration).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_now() {
        assert_eq!(parse_when("now", fixed_now()).unwrap(), fixed_now());
        assert_eq!(parse_when("  NOW ", fixed_now()).unwrap(), fixed_now());
    }

    #[test]
    fn test_relative_past_and_future() {
        let ago = parse_when("5 minutes ago", fixed_now()).unwrap();
        assert_eq!(to_rfc3339(ago), "2024-05-01T11:55:00Z");

        let compound = parse_when("1 hour 30 minutes ago", fixed_now()).unwrap();
        assert_eq!(to_rfc3339(compound), "2024-05-01T10:30:00Z");

        let ahead = parse_when("in 2h", fixed_now()).unwrap();
        assert_eq!(to_rfc3339(ahead), "2024-05-01T14:00:00Z");
    }

    #[test]
    fn test_absolute_forms() {
        let rfc = parse_when("2024-04-30T22:00:00+02:00", fixed_now()).unwrap();
        assert_eq!(to_rfc3339(rfc), "2024-04-30T20:00:00Z");

        let naive = parse_when("2024-04-30 08:15:00", fixed_now()).unwrap();
        assert_eq!(to_rfc3339(naive), "2024-04-30T08:15:00Z");

        let unix = parse_when("1714564800", fixed_now()).unwrap();
        assert_eq!(unix, fixed_now());

        let fractional = parse_when("1714564800.5", fixed_now()).unwrap();
        assert_eq!(to_rfc3339(fractional), "2024-05-01T12:00:00.500Z");
    }

    #[test]
    fn test_unparsable_expressions() {
        for expr in ["2 mns ago", "right now", "", "ago", "in ", "yesterday-ish"] {
            let err = parse_when(expr, fixed_now()).unwrap_err();
            assert_eq!(err.to_string(), format!("Activity failed: failed to parse '{}'", expr));
        }
    }
}
