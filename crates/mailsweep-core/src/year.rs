//! Target year and its search window.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

/// Invalid year input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YearError {
    /// Input is not exactly four ASCII digits.
    #[error("Invalid year {0:?}: expected four digits, e.g. 2024")]
    NotFourDigits(String),

    /// Four digits, but outside the range a mail server can search.
    #[error("Invalid year {0}: must be between 0001 and 9998")]
    OutOfRange(i32),
}

/// Half-open date range `[since, before)` covering one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    /// First day of the year (inclusive).
    pub since: NaiveDate,
    /// First day of the following year (exclusive).
    pub before: NaiveDate,
}

/// A validated four-digit calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Year {
    value: i32,
    window: YearWindow,
}

impl Year {
    /// Parses user input. Surrounding whitespace is ignored; anything but
    /// exactly four ASCII digits is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`YearError`] for malformed or unsearchable years.
    pub fn parse(input: &str) -> Result<Self, YearError> {
        let trimmed = input.trim();
        if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(YearError::NotFourDigits(trimmed.to_string()));
        }
        let value: i32 = trimmed
            .parse()
            .map_err(|_| YearError::NotFourDigits(trimmed.to_string()))?;
        Self::new(value)
    }

    /// Creates a year from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`YearError::OutOfRange`] for 0 and for 9999, whose following
    /// year cannot be expressed in an IMAP date.
    pub fn new(value: i32) -> Result<Self, YearError> {
        if !(1..=9998).contains(&value) {
            return Err(YearError::OutOfRange(value));
        }
        let since = NaiveDate::from_ymd_opt(value, 1, 1).ok_or(YearError::OutOfRange(value))?;
        let before =
            NaiveDate::from_ymd_opt(value + 1, 1, 1).ok_or(YearError::OutOfRange(value))?;
        Ok(Self {
            value,
            window: YearWindow { since, before },
        })
    }

    /// Returns the search window for this year.
    #[must_use]
    pub const fn window(self) -> YearWindow {
        self.window
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.value)
    }
}

impl FromStr for Year {
    type Err = YearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let year = Year::parse("2024").unwrap();
        assert_eq!(year.to_string(), "2024");
        assert_eq!(Year::parse(" 1999\n").unwrap().to_string(), "1999");
    }

    #[test]
    fn test_parse_rejects_non_digits() {
        assert_eq!(
            Year::parse("abc"),
            Err(YearError::NotFourDigits("abc".to_string()))
        );
        assert!(Year::parse("20a4").is_err());
        assert!(Year::parse("+024").is_err());
        assert!(Year::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(
            Year::parse("24"),
            Err(YearError::NotFourDigits("24".to_string()))
        );
        assert!(Year::parse("20245").is_err());
    }

    #[test]
    fn test_parse_rejects_unsearchable() {
        assert_eq!(Year::parse("0000"), Err(YearError::OutOfRange(0)));
        assert_eq!(Year::parse("9999"), Err(YearError::OutOfRange(9999)));
    }

    #[test]
    fn test_window_2024() {
        let window = Year::parse("2024").unwrap().window();
        assert_eq!(window.since, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(window.before, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_display_pads() {
        assert_eq!(Year::new(987).unwrap().to_string(), "0987");
    }
}
