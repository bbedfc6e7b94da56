//! Human-readable duration parsing.
//!
//! Accepts a number (optionally fractional) followed by a single unit:
//! `s`, `m`, `h` or `d`. `"0"`, `"0s"` and the empty string mean "no expiry".

use thiserror::Error;

lazy_static::lazy_static! {
    static ref DURATION_REGEX: regex::Regex =
        regex::Regex::new(r"^([0-9]*\.?[0-9]+)([smhd])$").unwrap();
}

/// Error returned for unparseable duration input.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration '{0}'. Use e.g. `10m` for 10 minutes")]
pub struct DurationParseError(pub String);

/// Parses a duration such as `"10m"` or `"1.5h"` into whole seconds.
pub fn parse_duration_secs(input: &str) -> Result<i64, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "0" || trimmed == "0s" {
        return Ok(0);
    }

    let caps = DURATION_REGEX
        .captures(trimmed)
        .ok_or_else(|| DurationParseError(input.to_string()))?;

    let amount: f64 = caps[1]
        .parse()
        .map_err(|_| DurationParseError(input.to_string()))?;
    let unit = match &caps[2] {
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        "d" => 86400.0,
        _ => return Err(DurationParseError(input.to_string())),
    };

    Ok((amount * unit) as i64)
}
