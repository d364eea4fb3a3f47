//! Parsing for `<integer><unit>` durations such as `45s`, `30m`, `2h`, `1d`.
//!
//! A bare integer is read as seconds.

use std::time::Duration;

use thiserror::Error;

/// A duration string did not match `<integer><unit>` or a bare integer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    /// The string was not shaped like `<integer><unit>`.
    #[error(
        "'{0}' must be in the format of <integer><unit>. (e.g. 45s (seconds), 30m (minutes), 2h (hours), 1d (days))"
    )]
    Format(String),

    /// The unit suffix was not one of `s`, `m`, `h`, `d`.
    #[error("invalid time unit: {0}. Accepted units: s (seconds), m (minutes), h (hours), d (days)")]
    Unit(char),

    /// The value does not fit in a `u64` number of seconds.
    #[error("'{0}' is too large")]
    Overflow(String),
}

/// Parse a duration like `"15m"` or `"900"` into a [`Duration`].
///
/// Units are case-insensitive.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let s = input.trim().to_ascii_lowercase();

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let Some(unit) = s.chars().last() else {
        return Err(DurationParseError::Format(input.to_string()));
    };
    let digits = &s[..s.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DurationParseError::Format(input.to_string()));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| DurationParseError::Overflow(input.to_string()))?;

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        other if other.is_ascii_alphabetic() => return Err(DurationParseError::Unit(other)),
        _ => return Err(DurationParseError::Format(input.to_string())),
    };

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| DurationParseError::Overflow(input.to_string()))
}
