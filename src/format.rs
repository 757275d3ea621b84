//! Display formatting for dashboard figures and dates (en-US conventions).

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::FormatError;

/// Fraction digit bounds for [`format_number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub minimum_fraction_digits: usize,
    pub maximum_fraction_digits: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            minimum_fraction_digits: 0,
            maximum_fraction_digits: 3,
        }
    }
}

impl NumberFormat {
    /// Exactly `digits` fraction digits.
    pub fn fixed(digits: usize) -> Self {
        Self {
            minimum_fraction_digits: digits,
            maximum_fraction_digits: digits,
        }
    }
}

/// Insert thousands separators into a string of ASCII digits.
fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a non-negative finite value with grouping and fraction bounds.
fn format_magnitude(value: f64, format: NumberFormat) -> String {
    let max = format.maximum_fraction_digits.max(format.minimum_fraction_digits);
    let fixed = format!("{value:.max$}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut frac = frac_part.to_owned();
    while frac.len() > format.minimum_fraction_digits && frac.ends_with('0') {
        frac.pop();
    }

    let grouped = group_digits(int_part);
    if frac.is_empty() {
        grouped
    } else {
        format!("{grouped}.{frac}")
    }
}

/// Format `num` with en-US digit grouping.
///
/// ```
/// use dashboard_stores::format::{format_number, NumberFormat};
///
/// assert_eq!(format_number(1234567.891, NumberFormat::default()), "1,234,567.891");
/// assert_eq!(format_number(2.5, NumberFormat::fixed(2)), "2.50");
/// ```
pub fn format_number(num: f64, format: NumberFormat) -> String {
    if num.is_nan() {
        return "NaN".to_owned();
    }
    if num.is_infinite() {
        return if num < 0.0 { "-∞" } else { "∞" }.to_owned();
    }
    let body = format_magnitude(num.abs(), format);
    if num.is_sign_negative() && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{body}")
    } else {
        body
    }
}

/// Format `amount` as currency, e.g. `"$45,231.89"`.
///
/// USD, EUR, GBP and JPY use their symbol; other ISO codes are written as a
/// prefix followed by a non-breaking space. JPY and KRW have no minor unit.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let code = currency.to_ascii_uppercase();
    let digits = match code.as_str() {
        "JPY" | "KRW" => 0,
        _ => 2,
    };
    let prefix = match code.as_str() {
        "USD" => "$".to_owned(),
        "EUR" => "€".to_owned(),
        "GBP" => "£".to_owned(),
        "JPY" => "¥".to_owned(),
        _ => format!("{code}\u{a0}"),
    };
    let body = format_number(amount.abs(), NumberFormat::fixed(digits));
    let is_negative = amount < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0');
    if is_negative {
        format!("-{prefix}{body}")
    } else {
        format!("{prefix}{body}")
    }
}

/// Format `value` (already a percentage) with `decimals` fraction digits.
///
/// ```
/// use dashboard_stores::format::format_percentage;
///
/// assert_eq!(format_percentage(20.1, 1), "20.1%");
/// assert_eq!(format_percentage(2.4, 0), "2%");
/// ```
pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}%")
}

/// Format a date as `"Jan 5, 2024"`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`FormatError`] if `input` matches neither form.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, FormatError> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| FormatError(input.to_owned()))
}

/// [`format_date`] for a date given as a string.
///
/// # Errors
///
/// Returns [`FormatError`] if the string is not a valid date.
pub fn format_date_str(input: &str) -> Result<String, FormatError> {
    parse_date(input).map(|d| format_date(&d))
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Unit {
    fn name(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// English relative phrase for `value` units from now (negative = past),
/// preferring words like "yesterday" where one exists.
fn relative_phrase(value: i64, unit: Unit) -> String {
    let idiom = match (unit, value) {
        (Unit::Second, 0) => Some("now"),
        (Unit::Minute, 0) => Some("this minute"),
        (Unit::Hour, 0) => Some("this hour"),
        (Unit::Day, 0) => Some("today"),
        (Unit::Day, -1) => Some("yesterday"),
        (Unit::Day, 1) => Some("tomorrow"),
        (Unit::Month, 0) => Some("this month"),
        (Unit::Month, -1) => Some("last month"),
        (Unit::Month, 1) => Some("next month"),
        (Unit::Year, 0) => Some("this year"),
        (Unit::Year, -1) => Some("last year"),
        (Unit::Year, 1) => Some("next year"),
        _ => None,
    };
    if let Some(idiom) = idiom {
        return idiom.to_owned();
    }

    let n = value.unsigned_abs();
    let plural = if n == 1 { "" } else { "s" };
    let name = unit.name();
    if value < 0 {
        format!("{n} {name}{plural} ago")
    } else {
        format!("in {n} {name}{plural}")
    }
}

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;
const MONTH: i64 = 2_592_000;
const YEAR: i64 = 31_536_000;

/// Describe `date` relative to `now`, e.g. `"5 minutes ago"` or `"yesterday"`.
///
/// Picks the largest unit below the elapsed time, with 30-day months and
/// 365-day years.
pub fn format_relative_time(date: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(*date).num_seconds();
    if diff < MINUTE {
        relative_phrase(-diff, Unit::Second)
    } else if diff < HOUR {
        relative_phrase(-(diff / MINUTE), Unit::Minute)
    } else if diff < DAY {
        relative_phrase(-(diff / HOUR), Unit::Hour)
    } else if diff < MONTH {
        relative_phrase(-(diff / DAY), Unit::Day)
    } else if diff < YEAR {
        relative_phrase(-(diff / MONTH), Unit::Month)
    } else {
        relative_phrase(-(diff / YEAR), Unit::Year)
    }
}

/// Shorten `text` to `max_len` characters, appending `"..."` if anything
/// was cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        None => text.to_owned(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}
