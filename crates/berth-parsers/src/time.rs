//! Time-limit parsing.
//!
//! Every accepted notation is normalized to whole minutes:
//! - a bare number: `120`, `120.5`
//! - unit notation in any order: `6d`, `12h`, `30m`, `90s`, `2d12h30m`, `2d 12h`
//! - scheduler clock notation: `MM`, `HH:MM`, `HH:MM:SS`, `D-HH`, `D-HH:MM`,
//!   `D-HH:MM:SS`
//!
//! A two-field clock value is read as `HH:MM`, not `MM:SS`: limits are long
//! durations. Fractions round half up to the nearest minute.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("Empty time specification")]
    Empty,
    #[error(
        "Invalid time format: '{0}'. Expected minutes (120), unit notation \
         ('6d', '12h', '30m', '90s', '2d12h30m') or clock notation \
         ('MM', 'HH:MM', 'HH:MM:SS', 'D-HH', 'D-HH:MM', 'D-HH:MM:SS')"
    )]
    Invalid(String),
}

static UNIT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*([dhms])").expect("unit token regex is valid")
});

/// Round to the nearest integer, with halves going up.
pub fn round_half_up(value: f64) -> u64 {
    (value + 0.5).floor() as u64
}

/// Convert a number of minutes to whole minutes.
///
/// Returns None for negative or non-finite values.
pub fn minutes_from_number(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(round_half_up(value))
}

/// Parse a time specification to whole minutes.
pub fn parse_time_minutes(input: &str) -> Result<u64, TimeParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let invalid = || TimeParseError::Invalid(input.to_string());

    // f64 parsing would accept "inf" and "nan", so require a digit up front
    if s.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && let Ok(value) = s.parse::<f64>()
    {
        return minutes_from_number(value).ok_or_else(invalid);
    }

    if (s.contains('-') || s.contains(':'))
        && let Some(minutes) = parse_clock_minutes(s)
    {
        return Ok(minutes);
    }

    parse_unit_minutes(s).ok_or_else(invalid)
}

/// Parse `[D-]HH[:MM[:SS]]` notation.
fn parse_clock_minutes(s: &str) -> Option<u64> {
    let (days, clock) = match s.split_once('-') {
        Some((d, rest)) => (Some(d.trim().parse::<u64>().ok()?), rest),
        None => (None, s),
    };

    let fields: Vec<&str> = clock.split(':').map(str::trim).collect();
    let (hours, minutes, seconds) = match (days, fields.as_slice()) {
        (Some(_), [h]) => (h.parse::<u64>().ok()?, 0, 0.0),
        (None, [m]) => (0, m.parse::<u64>().ok()?, 0.0),
        (_, [h, m]) => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, 0.0),
        (_, [h, m, sec]) => (
            h.parse::<u64>().ok()?,
            m.parse::<u64>().ok()?,
            sec.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)?,
        ),
        _ => return None,
    };

    let total = days.unwrap_or(0) as f64 * 1440.0
        + hours as f64 * 60.0
        + minutes as f64
        + seconds / 60.0;
    Some(round_half_up(total))
}

/// Parse unit notation such as `2d12h30m`. The whole string must be consumed.
fn parse_unit_minutes(s: &str) -> Option<u64> {
    let lower = s.to_lowercase();
    let mut total = 0.0;
    let mut cursor = 0;
    let mut matched = false;

    for caps in UNIT_TOKEN.captures_iter(&lower) {
        let whole = caps.get(0)?;
        if !lower[cursor..whole.start()].trim().is_empty() {
            return None;
        }
        cursor = whole.end();
        matched = true;

        let value: f64 = caps[1].parse().ok()?;
        total += match &caps[2] {
            "d" => value * 1440.0,
            "h" => value * 60.0,
            "m" => value,
            _ => value / 60.0,
        };
    }

    if !matched || !lower[cursor..].trim().is_empty() {
        return None;
    }
    Some(round_half_up(total))
}
