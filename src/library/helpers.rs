//! Various small helper functions

use std::num::ParseIntError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Splits the input string into two parts at the first occurence of the separator
pub fn split_into_two(input: &str, separator: &'static str) -> Option<(String, String)> {
    let parts: Vec<&str> = input.splitn(2, separator).collect();

    if parts.len() != 2 {
        return None;
    }

    Some((parts[0].to_string(), parts[1].to_string()))
}

/// Parses a `key=value` pair. Useful for command line parsing
pub fn parse_field(src: &str) -> Result<(String, String), String> {
    match split_into_two(src, "=") {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(format!("expected a field in the form key=value, got {:?}", src)),
    }
}

/// Parses a Duration from a string containing milliseconds.
/// Useful for command line parsing
pub fn parse_millis(src: &str) -> Result<Duration, ParseIntError> {
    let millis = src.parse::<u64>()?;
    Ok(Duration::from_millis(millis))
}

/// Builds a default instance name from a role and the current time, e.g. `Consumer-1634567890123456789`
pub fn instance_name(role: &str) -> String {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    format!("{}-{}", role, suffix)
}
