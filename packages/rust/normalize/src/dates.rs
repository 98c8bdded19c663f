//! Windowed date extraction near lifecycle keywords.
//!
//! For a fixed keyword set, scan a bounded window after the first keyword
//! occurrence against an ordered list of date patterns and parse the first
//! match. All dates resolve to UTC midnight — the fixed timezone policy for
//! the whole pipeline.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use regex::Regex;

/// Keywords preceding a scheme start date.
pub const START_KEYWORDS: &[&str] = &["start", "from"];

/// Keywords preceding a scheme end date or deadline.
pub const END_KEYWORDS: &[&str] = &["end", "ends on", "last date", "deadline"];

/// How many bytes after a keyword are scanned for a date.
const WINDOW: usize = 120;

// Ordered date patterns, most specific first. Ordinal day suffixes
// ("31st July 2025") are accepted.
static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+(\d{2,4})\b",
    )
    .expect("valid regex")
});

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{1,2})\b(?:st|nd|rd|th)?(?:,?\s*(\d{2,4})\b)?",
    )
    .expect("valid regex")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid regex"));

/// Find the first date mentioned within [`WINDOW`] bytes after the first
/// occurrence of any keyword. Returns `None` when no keyword appears or no
/// pattern matches — never an error.
pub fn extract_date(text: &str, keywords: &[&str]) -> Option<DateTime<Utc>> {
    let lower = text.to_lowercase();
    for keyword in keywords {
        if let Some(idx) = lower.find(keyword) {
            let mut end = (idx + WINDOW).min(lower.len());
            while !lower.is_char_boundary(end) {
                end -= 1;
            }
            if let Some(date) = parse_window(&lower[idx..end]) {
                return Some(date);
            }
        }
    }
    None
}

/// Try the ordered patterns against one keyword window.
fn parse_window(window: &str) -> Option<DateTime<Utc>> {
    if let Some(caps) = DAY_MONTH_YEAR.captures(window) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = normalize_year(caps[3].parse().ok()?);
        if let Some(date) = utc_midnight(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = MONTH_DAY_YEAR.captures(window) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps
            .get(3)
            .and_then(|y| y.as_str().parse().ok())
            .map(normalize_year)
            .unwrap_or_else(|| Utc::now().year());
        if let Some(date) = utc_midnight(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = ISO_DATE.captures(window) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = utc_midnight(year, month, day) {
            return Some(date);
        }
    }

    None
}

/// Map a month name (or 3-letter prefix) to its number.
fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?;
    let n = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Two-digit years are taken as 20xx.
fn normalize_year(year: i32) -> i32 {
    if year < 100 { 2000 + year } else { year }
}

fn utc_midnight(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn deadline_with_ordinal_day() {
        let text = "Farmers may enrol online; deadline: 31st July 2025 for all districts.";
        assert_eq!(extract_date(text, END_KEYWORDS), Some(ts(2025, 7, 31)));
    }

    #[test]
    fn day_month_year_without_ordinal() {
        let text = "Applications start from 1 April 2025 across the state.";
        assert_eq!(extract_date(text, START_KEYWORDS), Some(ts(2025, 4, 1)));
    }

    #[test]
    fn month_day_year_form() {
        let text = "The last date is September 15, 2025 as notified.";
        assert_eq!(extract_date(text, END_KEYWORDS), Some(ts(2025, 9, 15)));
    }

    #[test]
    fn iso_form() {
        let text = "Portal opens from 2025-06-01 onwards.";
        assert_eq!(extract_date(text, START_KEYWORDS), Some(ts(2025, 6, 1)));
    }

    #[test]
    fn two_digit_year_is_expanded() {
        let text = "Enrolment ends on 30 Nov 25 sharp.";
        assert_eq!(extract_date(text, END_KEYWORDS), Some(ts(2025, 11, 30)));
    }

    #[test]
    fn date_outside_window_is_ignored() {
        let filler = "x".repeat(130);
        let text = format!("deadline {filler} 31st July 2025");
        assert_eq!(extract_date(&text, END_KEYWORDS), None);
    }

    #[test]
    fn no_keyword_or_no_date_yields_none() {
        assert_eq!(extract_date("nothing datelike here", END_KEYWORDS), None);
        assert_eq!(
            extract_date("deadline approaching soon, stay tuned", END_KEYWORDS),
            None
        );
        assert_eq!(extract_date("", START_KEYWORDS), None);
    }

    #[test]
    fn invalid_calendar_date_is_rejected() {
        // 31 Feb falls through the first pattern without panicking
        assert_eq!(
            extract_date("deadline 31 February 2025", END_KEYWORDS),
            None
        );
    }
}
