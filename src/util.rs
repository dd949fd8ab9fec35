// Utility helpers for cell parsing, basic statistics and number formatting.
//
// This module centralizes all the "dirty" spreadsheet cell handling so the
// rest of the code can assume clean, typed values.
use calamine::Data;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in exports (commas, spaces, text).
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Exports carry either a bare date or a midnight timestamp.
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Convert an Excel serial day number (1900 date system) into a date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Read an identifier cell as text. Whole numbers lose their `.0` so that a
/// code typed as a number (`304.0`) matches the same code typed as text.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Read a count cell. Missing or unparseable values count as zero.
pub fn cell_number(cell: &Data) -> f64 {
    match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => parse_f64_safe(Some(s)).unwrap_or(0.0),
        Data::Bool(b) => f64::from(u8::from(*b)),
        Data::DateTime(dt) => dt.as_f64(),
        Data::DateTimeIso(_) | Data::DurationIso(_) | Data::Error(_) | Data::Empty => 0.0,
    }
}

pub fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => serial_to_date(dt.as_f64()),
        Data::Float(f) => serial_to_date(*f),
        Data::Int(i) => serial_to_date(*i as f64),
        Data::String(s) | Data::DateTimeIso(s) => parse_date_safe(Some(s)),
        _ => None,
    }
}

/// ISO week numbers arrive as numbers or numeric text; anything else is 0.
pub fn cell_week(cell: &Data) -> u32 {
    let n = cell_number(cell);
    if n.is_finite() && n > 0.0 {
        n as u32
    } else {
        0
    }
}

/// Arithmetic mean of the defined (non-NaN) values; `NaN` when none are.
pub fn mean_defined(v: &[f64]) -> f64 {
    let defined: Vec<f64> = v.iter().copied().filter(|x| !x.is_nan()).collect();
    if defined.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = defined.iter().sum();
    sum / defined.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Render a count rounded to whole units; undefined values render as `-`.
pub fn format_count(n: f64) -> String {
    if n.is_finite() {
        format_number(n.round(), 0)
    } else {
        "-".to_string()
    }
}

/// Render a ratio as a percentage (`0.1234` -> `12.3%` with one decimal).
/// Undefined ratios render as `-`.
pub fn format_percent(ratio: f64, decimals: usize) -> String {
    if ratio.is_finite() {
        format!("{:.*}%", decimals, ratio * 100.0)
    } else {
        "-".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_in_export_formats() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(parse_date_safe(Some("2026-10-12")), Some(d));
        assert_eq!(parse_date_safe(Some("2026-10-12 00:00:00")), Some(d));
        assert_eq!(parse_date_safe(Some("2026-10-12T00:00:00")), Some(d));
        assert_eq!(parse_date_safe(Some("12/10/2026")), Some(d));
        assert_eq!(parse_date_safe(Some("")), None);
        assert_eq!(parse_date_safe(None), None);
    }

    #[test]
    fn serial_numbers_follow_excel_epoch() {
        // 45658 is 2025-01-01 in the 1900 date system.
        assert_eq!(
            serial_to_date(45658.0),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(serial_to_date(f64::NAN), None);
    }

    #[test]
    fn identifier_cells_keep_codes_as_text() {
        assert_eq!(cell_text(&Data::Float(304.0)), "304");
        assert_eq!(cell_text(&Data::Int(109)), "109");
        assert_eq!(cell_text(&Data::String(" 0402 ".to_string())), "0402");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn missing_counts_are_zero() {
        assert_eq!(cell_number(&Data::Empty), 0.0);
        assert_eq!(cell_number(&Data::String("1,250".to_string())), 1250.0);
        assert_eq!(cell_number(&Data::String("n/a".to_string())), 0.0);
        assert_eq!(cell_week(&Data::Float(42.0)), 42);
        assert_eq!(cell_week(&Data::Empty), 0);
    }

    #[test]
    fn mean_skips_undefined_values() {
        assert_eq!(mean_defined(&[0.5, f64::NAN, 1.0]), 0.75);
        assert!(mean_defined(&[f64::NAN]).is_nan());
        assert!(mean_defined(&[]).is_nan());
    }

    #[test]
    fn formats_counts_and_percentages() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.2, 0), "0");
        assert_eq!(format_count(1499.6), "1,500");
        assert_eq!(format_count(f64::NAN), "-");
        assert_eq!(format_percent(0.1234, 1), "12.3%");
        assert_eq!(format_percent(0.5, 2), "50.00%");
        assert_eq!(format_percent(f64::NAN, 2), "-");
        assert_eq!(format_percent(f64::INFINITY, 2), "-");
    }
}
