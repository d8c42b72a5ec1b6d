//! `datasynth run --duration` values.

use anyhow::Context;
use std::time::Duration;

/// Unit suffixes and their length in milliseconds.
const UNITS: &[(&str, u64)] = &[("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

/// How long `run` keeps its providers producing before cancelling them.
///
/// A bare number counts seconds; `ms`, `s`, `m` and `h` pick the unit.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .with_context(|| format!("Invalid duration '{s}': expected a whole number"))?;
    let millis_per_unit = if unit.is_empty() {
        1_000
    } else {
        UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, millis)| *millis)
            .with_context(|| format!("Invalid duration unit '{unit}', expected ms, s, m or h"))?
    };
    let millis = value
        .checked_mul(millis_per_unit)
        .with_context(|| format!("Duration '{s}' is too long"))?;
    Ok(Duration::from_millis(millis))
}
