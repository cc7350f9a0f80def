//! Calendar-day keys and labels.

use chrono::{Datelike, NaiveDate};

/// Format used for date keys, both in storage and in the HTTP API
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` key for the calendar day of `date`.
///
/// Components are read from the value as-is, so a zoned date-time keeps its
/// own local day and the time of day never matters.
pub fn canonical_date_key<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Parse a key produced by [`canonical_date_key`]
pub fn parse_date_key(key: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
}

/// Long month name and year, e.g. "January 2026". `month_index` is 0-based.
pub fn month_label(year: i32, month_index: u32) -> Option<String> {
    month_index
        .checked_add(1)
        .and_then(|month| NaiveDate::from_ymd_opt(year, month, 1))
        .map(|first| format_month(&first))
}

fn format_month(date: &NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Shorten `name` to at most `max_len` characters, ending in "..." when cut
pub fn abbreviate(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }

    let keep = max_len.saturating_sub(3);
    let mut out: String = name.chars().take(keep).collect();
    out.push_str("...");
    out
}
