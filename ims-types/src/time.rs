//! The IMS2.0 time utility: converts a `DATETIME` token's text into a UTC instant.
//!
//! Mirrors the reference grammar: `YYYY[-/.]MM[-/.]DD([T ]HH[:MM[:SS[.frac]]])?`,
//! year restricted to 1700..=5999 (the century classes the reference lexer's
//! `DATETIME` regex accepts).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error(
    "the date `{0}` is not a valid IMS2.0 date (expected YYYY[-/.]MM[-/.]DD[T |]HH[:MM[:SS[.frac]]], year 1700-5999)"
)]
pub struct InvalidDateError(pub String);

fn scan_digits(s: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
    }
    i
}

/// Parses an IMS2.0-formatted date string into a timezone-aware UTC datetime.
pub fn imsdate_to_datetime(input: &str) -> Result<DateTime<Utc>, InvalidDateError> {
    let fail = || InvalidDateError(input.to_string());
    let bytes = input.as_bytes();

    let year_end = scan_digits(bytes, 0);
    if year_end != 4 {
        return Err(fail());
    }
    let year: i32 = input[0..year_end].parse().map_err(|_| fail())?;
    if !(1700..=5999).contains(&year) {
        return Err(fail());
    }
    let mut pos = year_end;

    let sep = *bytes.get(pos).ok_or_else(fail)?;
    if !matches!(sep, b'-' | b'/' | b'.') {
        return Err(fail());
    }
    pos += 1;

    let month_start = pos;
    let month_end = scan_digits(bytes, pos);
    if month_end == month_start || month_end - month_start > 2 {
        return Err(fail());
    }
    let month: u32 = input[month_start..month_end].parse().map_err(|_| fail())?;
    pos = month_end;

    if bytes.get(pos).copied() != Some(sep) {
        return Err(fail());
    }
    pos += 1;

    let day_start = pos;
    let day_end = scan_digits(bytes, pos);
    if day_end == day_start || day_end - day_start > 2 {
        return Err(fail());
    }
    let day: u32 = input[day_start..day_end].parse().map_err(|_| fail())?;
    pos = day_end;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(fail)?;

    if pos >= bytes.len() {
        let naive = NaiveDateTime::new(date, NaiveTime::MIN);
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if bytes[pos] == b'T' || bytes[pos] == b't' || bytes[pos] == b' ' {
        pos += 1;
    }

    if pos >= bytes.len() {
        let naive = NaiveDateTime::new(date, NaiveTime::MIN);
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let (hour, min, sec, nanos) = parse_time_part(&input[pos..]).ok_or_else(fail)?;
    let time = NaiveTime::from_hms_nano_opt(hour, min, sec, nanos).ok_or_else(fail)?;
    let naive = NaiveDateTime::new(date, time);
    Ok(Utc.from_utc_datetime(&naive))
}

fn parse_time_part(t: &str) -> Option<(u32, u32, u32, u32)> {
    let (main, nanos) = match t.find('.') {
        Some(dot) => {
            let frac = &t[dot + 1..];
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let frac_value: f64 = format!("0.{frac}").parse().ok()?;
            (&t[..dot], (frac_value * 1_000_000_000.0).round() as u32)
        }
        None => (t, 0),
    };

    let parts: Vec<&str> = main.split(':').collect();
    match parts.as_slice() {
        [h] => Some((h.parse().ok()?, 0, 0, nanos)),
        [h, m] => Some((h.parse().ok()?, m.parse().ok()?, 0, nanos)),
        [h, m, s] => Some((h.parse().ok()?, m.parse().ok()?, s.parse().ok()?, nanos)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_date_only() {
        let dt = imsdate_to_datetime("2020-01-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2020-01-01T00:00:00+00:00");
    }

    #[test]
    fn parses_date_with_hour() {
        let dt = imsdate_to_datetime("1700-01-01T00").unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn parses_fractional_seconds() {
        let dt = imsdate_to_datetime("2020-01-01T12:30:15.5").unwrap();
        assert_eq!(dt.hour(), 12);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 15);
        assert_eq!(dt.nanosecond(), 500_000_000);
    }

    #[test]
    fn rejects_year_below_floor() {
        assert!(imsdate_to_datetime("1699-12-31").is_err());
    }

    #[test]
    fn accepts_slash_and_dot_separators() {
        assert!(imsdate_to_datetime("2020/01/01").is_ok());
        assert!(imsdate_to_datetime("2020.01.01").is_ok());
    }

    #[test]
    fn rejects_mixed_separators() {
        assert!(imsdate_to_datetime("2020-01/01").is_err());
    }
}
