//! Time code arithmetic
//!
//! Converts between the `H+:MM:SS.mmm` text form used by every cue and a
//! floating-point number of seconds. All conversions go through whole
//! milliseconds so that `parse(format(x))` reproduces `x` to the millisecond.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SubweaveError};

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+:)?([0-5][0-9]:)?([0-5][0-9])(\.\d{1,3})?$")
        .expect("time code pattern is valid")
});

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_HOUR: u64 = 3_600_000;

/// Check whether text is a well-formed time code
pub fn is_valid(text: &str) -> bool {
    TIME_REGEX.is_match(text)
}

/// Parse a time code (`HH:MM:SS.mmm`, `MM:SS.m`, `SS`, ...) into seconds
///
/// Components are counted from the right: the last is seconds, the one
/// before it minutes, and anything before that hours. A fraction shorter
/// than three digits is right-padded with zeros.
pub fn parse(text: &str) -> Result<f64> {
    to_millis(text).map(|ms| ms as f64 / MILLIS_PER_SECOND as f64)
}

/// Parse a time code into whole milliseconds
pub fn to_millis(text: &str) -> Result<u64> {
    if !TIME_REGEX.is_match(text) {
        return Err(SubweaveError::InvalidTime(text.to_string()));
    }

    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, fraction),
        None => (text, "0"),
    };

    let mut millis_text: String = fraction.chars().take(3).collect();
    while millis_text.len() < 3 {
        millis_text.push('0');
    }

    let invalid = || SubweaveError::InvalidTime(text.to_string());
    let millis: u64 = millis_text.parse().map_err(|_| invalid())?;

    let mut parts = clock.rsplit(':');
    let seconds: u64 = parts.next().unwrap_or("0").parse().map_err(|_| invalid())?;
    let minutes: u64 = match parts.next() {
        Some(part) => part.parse().map_err(|_| invalid())?,
        None => 0,
    };
    let hours: u64 = match parts.next() {
        Some(part) => part.parse().map_err(|_| invalid())?,
        None => 0,
    };

    hours
        .checked_mul(MILLIS_PER_HOUR)
        .and_then(|h| h.checked_add(minutes * MILLIS_PER_MINUTE + seconds * MILLIS_PER_SECOND + millis))
        .ok_or_else(invalid)
}

/// Format seconds as a canonical time code (`HH:MM:SS.mmm`)
///
/// Negative input is clamped to zero. Hours are padded to two digits and
/// grow beyond that without bound.
pub fn format(seconds: f64) -> Result<String> {
    if !seconds.is_finite() {
        return Err(SubweaveError::InvalidDuration(seconds.to_string()));
    }

    let total_millis = (seconds.max(0.0) * MILLIS_PER_SECOND as f64).round() as u64;
    Ok(format_millis(total_millis))
}

/// Format a decimal seconds string (e.g. `"61.111"`) as a time code
pub fn format_text(text: &str) -> Result<String> {
    let seconds: f64 = text
        .trim()
        .parse()
        .map_err(|_| SubweaveError::InvalidDuration(text.to_string()))?;

    if !seconds.is_finite() {
        return Err(SubweaveError::InvalidDuration(text.to_string()));
    }

    format(seconds)
}

/// Format whole milliseconds as a canonical time code
pub fn format_millis(total_millis: u64) -> String {
    let hours = total_millis / MILLIS_PER_HOUR;
    let minutes = (total_millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let secs = (total_millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let millis = total_millis % MILLIS_PER_SECOND;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Re-render any accepted time code in canonical form
pub fn canonicalize(text: &str) -> Result<String> {
    to_millis(text).map(format_millis)
}
