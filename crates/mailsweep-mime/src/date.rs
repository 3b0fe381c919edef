//! Lenient parsing of the RFC 5322 `Date` header.
//!
//! Real-world mail carries dates that chrono's strict RFC 2822 parser
//! rejects: trailing zone comments, missing seconds, two-digit years, named
//! zones from the obsolete grammar. This module tries the strict parser first
//! and then falls back to a token scan.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parses a `Date` header value.
///
/// Returns `None` if no day, month and year can be recognized.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let cleaned = strip_comments(value);
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(&cleaned)
        .ok()
        .or_else(|| parse_loose(&cleaned))
}

/// Returns the year of a `Date` header value in the sender's time zone.
#[must_use]
pub fn year_of(value: &str) -> Option<i32> {
    use chrono::Datelike;
    parse_date(value).map(|date| date.year())
}

/// Removes parenthesized comments, e.g. `+0000 (UTC)`.
fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    for c in value.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Token-based fallback: finds day, month name, year, optional time and zone
/// in any reasonable order.
fn parse_loose(value: &str) -> Option<DateTime<FixedOffset>> {
    let tokens: Vec<&str> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    let month_index = tokens.iter().position(|t| month_number(t).is_some())?;
    let month = month_number(tokens[month_index])?;

    let mut day = None;
    let mut year = None;
    let mut time = None;
    let mut offset = None;

    for (index, token) in tokens.iter().enumerate() {
        if index == month_index {
            continue;
        }
        if token.contains(':') {
            time = time.or_else(|| parse_time(token));
        } else if token.bytes().all(|b| b.is_ascii_digit()) {
            let number: u32 = token.parse().ok()?;
            if token.len() <= 2
                && day.is_none()
                && index < month_index + 2
                && (1..=31).contains(&number)
            {
                day = Some(number);
            } else if year.is_none() && (token.len() == 4 || token.len() == 2) {
                year = Some(expand_year(number, token.len()));
            }
        } else if offset.is_none() && year.is_some() {
            offset = parse_zone(token);
        }
    }

    let date = NaiveDate::from_ymd_opt(year?, month, day?)?;
    let time = time.unwrap_or(NaiveTime::MIN);
    let offset = match offset {
        Some(offset) => offset,
        None => FixedOffset::east_opt(0)?,
    };
    offset.from_local_datetime(&date.and_time(time)).single()
}

fn month_number(token: &str) -> Option<u32> {
    let lower = token.to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .and_then(|index| u32::try_from(index + 1).ok())
}

/// RFC 5322 obsolete two-digit years: 00-49 are 2000s, 50-99 are 1900s.
fn expand_year(number: u32, digits: usize) -> i32 {
    let number = i32::try_from(number).unwrap_or(0);
    match digits {
        2 if number < 50 => 2000 + number,
        2 => 1900 + number,
        _ => number,
    }
}

fn parse_time(token: &str) -> Option<NaiveTime> {
    let mut fields = token.split(':').map(|f| f.parse::<u32>().ok());
    let hour = fields.next()??;
    let minute = fields.next()??;
    let second = fields.next().flatten().unwrap_or(0);
    NaiveTime::from_hms_opt(hour, minute, second.min(59))
}

fn parse_zone(token: &str) -> Option<FixedOffset> {
    let hours = |h: i32| FixedOffset::east_opt(h * 3600);
    match token.to_ascii_uppercase().as_str() {
        "UT" | "UTC" | "GMT" | "Z" => hours(0),
        "EDT" => hours(-4),
        "EST" | "CDT" => hours(-5),
        "CST" | "MDT" => hours(-6),
        "MST" | "PDT" => hours(-7),
        "PST" => hours(-8),
        numeric => {
            let (sign, digits) = match numeric.as_bytes().first()? {
                b'+' => (1, &numeric[1..]),
                b'-' => (-1, &numeric[1..]),
                _ => return None,
            };
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let hh: i32 = digits[..2].parse().ok()?;
            let mm: i32 = digits[2..].parse().ok()?;
            FixedOffset::east_opt(sign * (hh * 3600 + mm * 60))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_strict_rfc2822() {
        let date = parse_date("Tue, 2 Jan 2024 10:15:00 +0000").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.hour(), 10);
    }

    #[test]
    fn test_trailing_comment() {
        let date = parse_date("Tue, 2 Jan 2024 10:15:00 +0000 (UTC)").unwrap();
        assert_eq!(date.day(), 2);
    }

    #[test]
    fn test_year_in_sender_zone() {
        // Already 2024 in UTC, still 2023 for the sender.
        assert_eq!(year_of("Sun, 31 Dec 2023 23:30:00 -0500"), Some(2023));
    }

    #[test]
    fn test_missing_seconds_and_weekday() {
        let date = parse_date("5 Mar 2021 08:07 +0100").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2021, 3, 5));
        assert_eq!(date.minute(), 7);
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(year_of("Fri, 13 Feb 09 23:31:30 GMT"), Some(2009));
        assert_eq!(year_of("13 Feb 99 10:00:00 GMT"), Some(1999));
    }

    #[test]
    fn test_month_first_order() {
        assert_eq!(year_of("Wed Jun 30 21:49:08 1993"), Some(1993));
    }

    #[test]
    fn test_named_zone_fallback() {
        let date = parse_date("Mon, 1 Jul 2019 12:00:00 CEST").unwrap();
        assert_eq!(date.year(), 2019);
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("(only a comment)"), None);
        assert_eq!(year_of("32 Jan"), None);
    }
}
