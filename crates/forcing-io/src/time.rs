//! Time axis decoding.
//!
//! Handles CF-style `"<unit> since <reference>"` strings as written by the
//! surface model and forcing tools, plus the hour truncation used when
//! matching requested valid times against file stamps.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::error::{ForcingError, Result};

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Parse a CF unit name (singular, plural and common abbreviations).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => Some(Self::Seconds),
            "minutes" | "minute" | "mins" | "min" => Some(Self::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Some(Self::Hours),
            "days" | "day" | "d" => Some(Self::Days),
            _ => None,
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86400.0,
        }
    }
}

/// Parsed `units` attribute of a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub reference: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse `"<unit> since <date>[ <time>]"`.
    ///
    /// The reference accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`,
    /// `YYYY-MM-DD HH:MM:SS[.f]` and the `T`-separated forms; a trailing
    /// `Z`, `UTC` or `+00:00` is ignored.
    pub fn parse(units: &str) -> Result<Self> {
        let parts: Vec<&str> = units.trim().splitn(3, ' ').collect();
        if parts.len() < 3 || !parts[1].eq_ignore_ascii_case("since") {
            return Err(ForcingError::InvalidTimeUnits(format!(
                "unexpected time units format: '{}'",
                units
            )));
        }

        let unit = TimeUnit::from_str(parts[0]).ok_or_else(|| {
            ForcingError::InvalidTimeUnits(format!("unknown time unit '{}'", parts[0]))
        })?;
        let reference = parse_reference(parts[2]).ok_or_else(|| {
            ForcingError::InvalidTimeUnits(format!("cannot parse reference date '{}'", parts[2]))
        })?;

        Ok(Self { unit, reference })
    }

    /// Convert one offset to an absolute time, rounded to the second.
    pub fn decode(&self, offset: f64) -> Result<DateTime<Utc>> {
        if !offset.is_finite() {
            return Err(ForcingError::InvalidTimeUnits(format!(
                "non-finite time offset {}",
                offset
            )));
        }
        let secs = (offset * self.unit.seconds()).round() as i64;
        self.reference
            .checked_add_signed(Duration::seconds(secs))
            .ok_or_else(|| {
                ForcingError::InvalidTimeUnits(format!(
                    "date overflow adding {} s to {}",
                    secs, self.reference
                ))
            })
    }
}

fn parse_reference(text: &str) -> Option<DateTime<Utc>> {
    let mut text = text.trim();
    for suffix in ["UTC", "utc", "Z", "+00:00", "+0000"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            text = stripped.trim_end();
        }
    }
    let text = text.replacen('T', " ", 1);

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&text, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Check that a CF calendar name is compatible with chrono's proleptic
/// Gregorian arithmetic.
pub fn check_calendar(calendar: Option<&str>) -> Result<()> {
    match calendar.map(|c| c.to_lowercase()) {
        None => Ok(()),
        Some(c) if matches!(c.as_str(), "standard" | "gregorian" | "proleptic_gregorian" | "") => {
            Ok(())
        }
        Some(c) => Err(ForcingError::InvalidTimeUnits(format!(
            "unsupported calendar '{}'",
            c
        ))),
    }
}

/// Decode a whole time coordinate.
pub fn decode_times(
    offsets: &[f64],
    units: &str,
    calendar: Option<&str>,
) -> Result<Vec<DateTime<Utc>>> {
    check_calendar(calendar)?;
    let units = TimeUnits::parse(units)?;
    offsets.iter().map(|&v| units.decode(v)).collect()
}

/// Drop minutes, seconds and sub-seconds.
pub fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_minute(0))
        .unwrap_or(t)
}

/// Indices of `available` matching `requested` at hour resolution.
///
/// Requested order is kept (outer loop over requested times) and each index
/// appears once, at its first match. An empty request selects every index.
pub fn match_hourly(
    available: &[DateTime<Utc>],
    requested: &[DateTime<Utc>],
) -> Result<Vec<usize>> {
    if requested.is_empty() {
        return Ok((0..available.len()).collect());
    }

    let mut seen = HashSet::new();
    let mut indices = Vec::new();
    for want in requested {
        let want = truncate_to_hour(*want);
        for (i, have) in available.iter().enumerate() {
            if truncate_to_hour(*have) == want && seen.insert(i) {
                indices.push(i);
            }
        }
    }

    if indices.is_empty() {
        return Err(ForcingError::TimeNotFound(format_times(requested)));
    }
    Ok(indices)
}

/// Comma-separated `YYYY-MM-DD HH:MM:SS` list for messages.
pub fn format_times(times: &[DateTime<Utc>]) -> String {
    times
        .iter()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build a validity time from model date components and seconds of day.
pub fn from_date_and_seconds(year: i64, month: i64, day: i64, seconds: f64) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )?;
    let midnight = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
    midnight.checked_add_signed(Duration::seconds(seconds.round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_units_variants() {
        let u = TimeUnits::parse("seconds since 2017-09-01 00:00:00").unwrap();
        assert_eq!(u.unit, TimeUnit::Seconds);
        assert_eq!(u.reference, utc(2017, 9, 1, 0, 0, 0));

        let u = TimeUnits::parse("hours since 2020-01-01T06:00:00Z").unwrap();
        assert_eq!(u.unit, TimeUnit::Hours);
        assert_eq!(u.reference, utc(2020, 1, 1, 6, 0, 0));

        let u = TimeUnits::parse("days since 2000-01-01").unwrap();
        assert_eq!(u.unit, TimeUnit::Days);
        assert_eq!(u.reference, utc(2000, 1, 1, 0, 0, 0));

        let u = TimeUnits::parse("minutes since 2020-03-04 12:30").unwrap();
        assert_eq!(u.reference, utc(2020, 3, 4, 12, 30, 0));
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(TimeUnits::parse("hours").is_err());
        assert!(TimeUnits::parse("fortnights since 2020-01-01").is_err());
        assert!(TimeUnits::parse("hours after 2020-01-01").is_err());
        assert!(TimeUnits::parse("hours since yesterday").is_err());
    }

    #[test]
    fn test_decode_times() {
        let times = decode_times(&[0.0, 3600.0, 5400.0], "seconds since 2017-09-01 00:00:00", None)
            .unwrap();
        assert_eq!(times[1], utc(2017, 9, 1, 1, 0, 0));
        assert_eq!(times[2], utc(2017, 9, 1, 1, 30, 0));

        let times = decode_times(&[1.5], "days since 2000-01-01", Some("gregorian")).unwrap();
        assert_eq!(times[0], utc(2000, 1, 2, 12, 0, 0));
    }

    #[test]
    fn test_unsupported_calendar() {
        let err = decode_times(&[0.0], "days since 2000-01-01", Some("noleap")).unwrap_err();
        assert!(matches!(err, ForcingError::InvalidTimeUnits(_)));
    }

    #[test]
    fn test_truncate_to_hour() {
        assert_eq!(truncate_to_hour(utc(2020, 5, 6, 7, 59, 59)), utc(2020, 5, 6, 7, 0, 0));
    }

    #[test]
    fn test_match_hourly() {
        let available = vec![
            utc(2020, 1, 1, 0, 0, 0),
            utc(2020, 1, 1, 1, 0, 0),
            utc(2020, 1, 1, 2, 0, 0),
        ];
        assert_eq!(match_hourly(&available, &[]).unwrap(), vec![0, 1, 2]);
        assert_eq!(
            match_hourly(&available, &[utc(2020, 1, 1, 2, 15, 0), utc(2020, 1, 1, 0, 0, 0)])
                .unwrap(),
            vec![2, 0]
        );
        let err = match_hourly(&available, &[utc(2021, 1, 1, 0, 0, 0)]).unwrap_err();
        assert!(matches!(err, ForcingError::TimeNotFound(_)));
    }

    #[test]
    fn test_match_hourly_sub_hourly_round_trip() {
        let available = vec![utc(2020, 1, 1, 0, 0, 0), utc(2020, 1, 1, 0, 30, 0)];
        let all = match_hourly(&available, &[]).unwrap();
        assert_eq!(all, vec![0, 1]);

        let returned: Vec<_> = all.iter().map(|&i| available[i]).collect();
        assert_eq!(match_hourly(&available, &returned).unwrap(), all);

        // Repeated requests do not repeat steps
        let t = utc(2020, 1, 1, 0, 0, 0);
        assert_eq!(match_hourly(&available, &[t, t]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_from_date_and_seconds() {
        let t = from_date_and_seconds(2017, 9, 1, 10800.0).unwrap();
        assert_eq!(t, utc(2017, 9, 1, 3, 0, 0));
        assert!(from_date_and_seconds(2017, 13, 1, 0.0).is_none());
    }
}
