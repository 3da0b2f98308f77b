//! Canonical forms for registry fields.
//!
//! Every comparison between a school's registry and a parent's declaration goes through these
//! functions. They never fail: absence is signalled by an empty string or `None`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use unicode_normalization::UnicodeNormalization;

/// Formats accepted by the generic fallback once the fixed ISO and day-first shapes fail.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y%m%d",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim, decompose and strip combining diacritical marks.
pub fn normalize_text(value: &str) -> String {
    value.trim().nfd().filter(|c| !is_combining_mark(*c)).collect()
}

pub fn normalize_name(value: &str) -> String {
    collapse_whitespace(&normalize_text(value).to_lowercase())
}

pub fn normalize_class(value: &str) -> String {
    collapse_whitespace(&normalize_text(value).to_uppercase())
}

/// Uppercase with all whitespace and hyphens removed, so `ab-12` and `AB 12` compare equal.
pub fn normalize_code(value: &str) -> String {
    normalize_text(value)
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Letters and digits only. Used to disambiguate candidates, never stored.
pub fn normalize_loose_token(value: &str) -> String {
    normalize_text(value)
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Canonical `YYYY-MM-DD` form of a date written as `YYYY-MM-DD`, `YYYY/MM/DD`,
/// `DD-MM-YYYY` or `DD/MM/YYYY`, falling back to a set of common textual formats.
///
/// Returns `None` when nothing parses. A returned value always has the exact shape
/// `YYYY-MM-DD`, so normalizing it again yields the same string.
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some([first, second, third]) = split_numeric_date(value) {
        let ymd = if first.len() == 4 && second.len() <= 2 && third.len() <= 2 {
            Some((first, second, third))
        } else if third.len() == 4 && first.len() <= 2 && second.len() <= 2 {
            Some((third, second, first))
        } else {
            None
        };

        if let Some(date) = ymd.and_then(|(y, m, d)| calendar_date(y, m, d)) {
            return Some(iso_date(date));
        }
    }

    parse_fallback(value).filter(|d| (1000..=9999).contains(&d.year())).map(iso_date)
}

/// Splits `a-b-c` / `a/b/c` into three all-digit parts.
fn split_numeric_date(value: &str) -> Option<[&str; 3]> {
    let mut parts = value.split(['-', '/']);
    let parts = [parts.next()?, parts.next()?, parts.next()?];
    if value.split(['-', '/']).count() != 3 {
        return None;
    }
    parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .then_some(parts)
}

fn calendar_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn parse_fallback(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok().map(|dt| dt.date()))
        .or_else(|| FALLBACK_DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok()))
}
