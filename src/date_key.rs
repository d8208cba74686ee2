// Canonical calendar-day keys shared by every per-date table

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Storage format for every date key: zero-padded `YYYY-MM-DD`
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Errors produced when building a DateKey
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DateKeyError {
    /// String is not in zero-padded `YYYY-MM-DD` form
    #[error("Date key '{0}' is not in YYYY-MM-DD form")]
    Malformed(String),
    /// Components do not name a real calendar day
    #[error("Date key '{0}' is not a valid calendar date")]
    InvalidDate(String),
}

fn canonical_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date key pattern"))
}

/// A local calendar day, serialized as `YYYY-MM-DD`.
///
/// There is exactly one string per day, so keys compare and hash by value
/// regardless of how the caller obtained the date. Months are always
/// one-based; calendar widgets that count months from zero must convert
/// before building a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Build a key from year, one-based month and day
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateKeyError> {
        // Four-digit years only, so the key stays fixed-width
        if !(0..=9999).contains(&year) {
            return Err(DateKeyError::InvalidDate(format!("{}-{:02}-{:02}", year, month, day)));
        }
        NaiveDate::from_ymd_opt(year, month, day)
            .map(DateKey)
            .ok_or_else(|| DateKeyError::InvalidDate(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    /// Strictly parse the canonical form; non-padded input is rejected
    pub fn parse(value: &str) -> Result<Self, DateKeyError> {
        if !canonical_shape().is_match(value) {
            return Err(DateKeyError::Malformed(value.to_string()));
        }
        NaiveDate::parse_from_str(value, DATE_KEY_FORMAT)
            .map(DateKey)
            .map_err(|_| DateKeyError::InvalidDate(value.to_string()))
    }

    /// Today's key in the local timezone
    pub fn today() -> Self {
        DateKey(chrono::Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// One-based month
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        DateKey(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateKey::parse(s)
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DateKey::parse(&value)
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
#[path = "date_key_test.rs"]
mod tests;
