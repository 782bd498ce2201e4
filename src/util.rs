// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_format::{Locale, ToFormattedString};

/// Timestamp layouts seen in 311 exports, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Trim and treat empty strings as missing.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters other than an
///   exponent marker.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed or is not finite.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = non_empty(s)?;
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer identifiers sometimes arrive as `123.0` after a float round trip.
pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = non_empty(s)?;
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let whole = s.strip_suffix(".0")?;
    whole.parse::<i64>().ok()
}

/// Unparsable timestamps become `None` rather than an error; a bare date
/// means midnight.
pub fn parse_datetime_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = non_empty(s)?;
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    ["%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn median(mut v: Vec<f64>) -> Option<f64> {
    // Median of a list of numbers, `None` when there is nothing to take the
    // median of. Takes the `Vec` by value so it can sort in place.
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        Some(v[mid])
    } else {
        Some((v[mid - 1] + v[mid]) / 2.0)
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console and log messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

/// Rendering for optional numbers in preview tables.
pub fn display_opt(v: &Option<f64>) -> String {
    match v {
        Some(x) => format_number(*x, 2),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_published_and_iso_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 3)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(parse_datetime_safe(Some("01/03/2020 02:05:00 PM")), Some(expected));
        assert_eq!(parse_datetime_safe(Some("2020-01-03T14:05:00")), Some(expected));
        assert_eq!(parse_datetime_safe(Some("2020-01-03T14:05:00.000")), Some(expected));
        assert_eq!(parse_datetime_safe(Some("2020-01-03 14:05:00")), Some(expected));
        assert_eq!(parse_datetime_safe(Some("2020-01-03T14:05")), Some(expected));
    }

    #[test]
    fn bare_date_is_midnight_and_garbage_is_none() {
        let midnight = NaiveDate::from_ymd_opt(2009, 12, 31)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_datetime_safe(Some("2009-12-31")), Some(midnight));
        assert_eq!(parse_datetime_safe(Some("not a date")), None);
        assert_eq!(parse_datetime_safe(Some("   ")), None);
        assert_eq!(parse_datetime_safe(None), None);
    }

    #[test]
    fn parses_identifiers_with_float_artifact() {
        assert_eq!(parse_i64_safe(Some("42")), Some(42));
        assert_eq!(parse_i64_safe(Some(" 42.0 ")), Some(42));
        assert_eq!(parse_i64_safe(Some("42.5")), None);
        assert_eq!(parse_i64_safe(Some("abc")), None);
    }

    #[test]
    fn parses_forgiving_floats() {
        assert_eq!(parse_f64_safe(Some(" 40.7128 ")), Some(40.7128));
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("N/A")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
    }

    #[test]
    fn median_handles_even_odd_and_empty() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(Vec::new()), None);
    }

    #[test]
    fn rounds_to_five_decimals() {
        assert_eq!(round_to(40.7127753, 5), 40.71278);
        assert_eq!(round_to(-73.9859414, 5), -73.98594);
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(7.0, 0), "7");
        assert_eq!(format_int(9855usize), "9,855");
        assert_eq!(display_opt(&None), "");
        assert_eq!(display_opt(&Some(48.0)), "48.00");
    }
}
