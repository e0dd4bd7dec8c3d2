//! Wall-clock arithmetic. Times of day are "HH:MM" strings on the surface and
//! minute offsets from local midnight inside the engine; dates are
//! "YYYY-MM-DD". There is no timezone handling.

use chrono::{Datelike, NaiveDate};

use crate::model::Minutes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    Malformed(String),
    OutOfRange(String),
}

impl std::fmt::Display for TimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeError::Malformed(s) => write!(f, "malformed time: {s:?} (expected HH:MM)"),
            TimeError::OutOfRange(s) => write!(f, "time out of range: {s:?}"),
        }
    }
}

impl std::error::Error for TimeError {}

/// Parse "HH:MM" into minutes since midnight. Accepts one or two hour digits
/// and exactly two minute digits.
pub fn time_to_minutes(s: &str) -> Result<Minutes, TimeError> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| TimeError::Malformed(s.to_string()))?;
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(h) || h.len() > 2 || !all_digits(m) || m.len() != 2 {
        return Err(TimeError::Malformed(s.to_string()));
    }
    let hours: Minutes = h.parse().map_err(|_| TimeError::Malformed(s.to_string()))?;
    let minutes: Minutes = m.parse().map_err(|_| TimeError::Malformed(s.to_string()))?;
    if hours > 23 || minutes > 59 {
        return Err(TimeError::OutOfRange(s.to_string()));
    }
    Ok(hours * 60 + minutes)
}

/// Inverse of [`time_to_minutes`]. No day rollover: 1440 renders as "24:00",
/// callers keep generation inside a single day.
pub fn minutes_to_time(n: Minutes) -> String {
    format!("{:02}:{:02}", n / 60, n % 60)
}

pub fn add_minutes(time: &str, duration: Minutes) -> Result<String, TimeError> {
    Ok(minutes_to_time(time_to_minutes(time)? + duration))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// "DD/MM/YYYY", the way dates are shown to clients.
pub fn pretty_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
