//! Duration Parser
//!
//! Converts lifetime expressions such as `"500ms"`, `"30s"`, `"2d"` or a raw
//! millisecond count into milliseconds.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;
const MS_PER_WEEK: f64 = 7.0 * MS_PER_DAY;

// == Lifetime ==
/// A duration as supplied by callers: either milliseconds or a text expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lifetime {
    /// Raw millisecond count
    Millis(u64),
    /// Expression with an optional `ms|s|m|h|d|w` suffix
    Text(String),
}

impl Lifetime {
    /// Resolves the lifetime to milliseconds.
    pub fn to_ms(&self) -> Result<u64> {
        match self {
            Lifetime::Millis(ms) => Ok(*ms),
            Lifetime::Text(text) => parse_duration_ms(text),
        }
    }

    /// Resolves the lifetime to a [`Duration`].
    pub fn to_duration(&self) -> Result<Duration> {
        self.to_ms().map(Duration::from_millis)
    }
}

impl From<u64> for Lifetime {
    fn from(ms: u64) -> Self {
        Lifetime::Millis(ms)
    }
}

impl From<&str> for Lifetime {
    fn from(text: &str) -> Self {
        Lifetime::Text(text.to_string())
    }
}

impl From<String> for Lifetime {
    fn from(text: String) -> Self {
        Lifetime::Text(text)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Millis(ms) => write!(f, "{}ms", ms),
            Lifetime::Text(text) => f.write_str(text),
        }
    }
}

// == Parse ==
/// Parses a duration expression into milliseconds.
///
/// Accepted forms are a bare number (milliseconds) or a number followed by one
/// of `ms`, `s`, `m`, `h`, `d`, `w`. Fractional values are rounded to the
/// nearest millisecond.
pub fn parse_duration_ms(input: &str) -> Result<u64> {
    let text = input.trim();

    let (number, multiplier) = if text.len() > 2 && text.ends_with("ms") {
        (&text[..text.len() - 2], 1.0)
    } else {
        match text.chars().last() {
            Some('s') => (&text[..text.len() - 1], MS_PER_SECOND),
            Some('m') => (&text[..text.len() - 1], MS_PER_MINUTE),
            Some('h') => (&text[..text.len() - 1], MS_PER_HOUR),
            Some('d') => (&text[..text.len() - 1], MS_PER_DAY),
            Some('w') => (&text[..text.len() - 1], MS_PER_WEEK),
            _ => (text, 1.0),
        }
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| CacheError::InvalidDuration(input.to_string()))?;

    let ms = value * multiplier;
    if !ms.is_finite() || ms < 0.0 || ms > u64::MAX as f64 {
        return Err(CacheError::InvalidDuration(input.to_string()));
    }

    Ok(ms.round() as u64)
}
