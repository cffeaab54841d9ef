//! Interval codec for notifier recurrence.
//!
//! The stored form is an ISO-8601 duration (`P1DT2H`, `PT1H30M`, `PT0S`).
//! Year and month designators are calendar relative and cannot be expressed
//! as a fixed [`Duration`], so they are rejected.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

use crate::error::StoreError;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;

/// Encodes a duration as a normalized ISO-8601 duration string.
pub fn to_iso8601(duration: Duration) -> String {
    let total = duration.as_secs();
    let nanos = duration.subsec_nanos();

    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours == 0 && minutes == 0 && seconds == 0 && nanos == 0 {
        if days == 0 {
            out.push_str("T0S");
        }
        return out;
    }

    out.push('T');
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || nanos > 0 {
        if nanos == 0 {
            out.push_str(&format!("{seconds}S"));
        } else {
            let frac = format!("{nanos:09}");
            out.push_str(&format!("{seconds}.{}S", frac.trim_end_matches('0')));
        }
    }
    out
}

/// Parses an ISO-8601 duration as produced by [`to_iso8601`] or by the
/// ISO-8601 interval output style of the database.
pub fn parse_iso8601(raw: &str) -> Result<Duration, StoreError> {
    let upper = raw.trim().to_ascii_uppercase();
    let body = upper
        .strip_prefix('P')
        .ok_or_else(|| StoreError::InvalidInterval(format!("missing 'P' designator in {raw:?}")))?;
    if body.is_empty() {
        return Err(StoreError::InvalidInterval(format!("empty duration {raw:?}")));
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return Err(StoreError::InvalidInterval(format!(
                    "dangling time designator in {raw:?}"
                )));
            }
            (date, Some(time))
        }
        None => (body, None),
    };

    let mut total = Duration::ZERO;
    for (value, unit) in components(date_part, raw)? {
        let secs = match unit {
            'W' => SECS_PER_WEEK,
            'D' => SECS_PER_DAY,
            'Y' | 'M' => {
                return Err(StoreError::InvalidInterval(format!(
                    "calendar-relative component '{unit}' in {raw:?}"
                )));
            }
            other => {
                return Err(StoreError::InvalidInterval(format!(
                    "unknown date designator '{other}' in {raw:?}"
                )));
            }
        };
        total = add(total, scale(value, secs, raw)?, raw)?;
    }

    if let Some(time_part) = time_part {
        for (value, unit) in components(time_part, raw)? {
            let secs = match unit {
                'H' => SECS_PER_HOUR,
                'M' => SECS_PER_MINUTE,
                'S' => 1,
                other => {
                    return Err(StoreError::InvalidInterval(format!(
                        "unknown time designator '{other}' in {raw:?}"
                    )));
                }
            };
            total = add(total, scale(value, secs, raw)?, raw)?;
        }
    }

    Ok(total)
}

/// Parses either an ISO-8601 duration or the compact unit form used in
/// hand-written import files (`90s`, `1h30m`, `2d`).
pub fn parse_interval(raw: &str) -> Result<Duration, StoreError> {
    let trimmed = raw.trim();
    if trimmed.starts_with(['P', 'p']) {
        return parse_iso8601(trimmed);
    }
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInterval("empty interval".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let mut total = Duration::ZERO;
    let mut rest = lower.as_str();
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| StoreError::InvalidInterval(format!("missing unit in {raw:?}")))?;
        let (number, tail) = rest.split_at(digits);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let secs = match unit {
            "w" => SECS_PER_WEEK,
            "d" => SECS_PER_DAY,
            "h" => SECS_PER_HOUR,
            "m" => SECS_PER_MINUTE,
            "s" => 1,
            other => {
                return Err(StoreError::InvalidInterval(format!(
                    "unknown unit {other:?} in {raw:?}"
                )));
            }
        };
        total = add(total, scale(parse_number(number, raw)?, secs, raw)?, raw)?;
        rest = next;
    }
    Ok(total)
}

fn components(part: &str, raw: &str) -> Result<Vec<(f64, char)>, StoreError> {
    let mut out = Vec::new();
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
        } else {
            out.push((parse_number(&number, raw)?, c));
            number.clear();
        }
    }
    if !number.is_empty() {
        return Err(StoreError::InvalidInterval(format!(
            "trailing number without designator in {raw:?}"
        )));
    }
    Ok(out)
}

fn parse_number(number: &str, raw: &str) -> Result<f64, StoreError> {
    if number.is_empty() {
        return Err(StoreError::InvalidInterval(format!(
            "designator without value in {raw:?}"
        )));
    }
    number
        .parse::<f64>()
        .map_err(|_| StoreError::InvalidInterval(format!("bad number {number:?} in {raw:?}")))
}

#[allow(clippy::cast_precision_loss)]
fn scale(value: f64, unit_secs: u64, raw: &str) -> Result<Duration, StoreError> {
    Duration::try_from_secs_f64(value * unit_secs as f64)
        .map_err(|e| StoreError::InvalidInterval(format!("{raw:?}: {e}")))
}

fn add(total: Duration, component: Duration, raw: &str) -> Result<Duration, StoreError> {
    total
        .checked_add(component)
        .ok_or_else(|| StoreError::InvalidInterval(format!("{raw:?} overflows")))
}

/// `#[serde(with = "crate::utils::interval")]` support: ISO-8601 on the way
/// out, ISO-8601 or compact unit form on the way in.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_iso8601(*duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_interval(&raw).map_err(serde::de::Error::custom)
}
