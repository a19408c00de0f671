use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Parse the timestamp formats the API emits (RFC 3339, `YYYY-MM-DD HH:MM:SS`
/// or a bare date), treating naive values as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a date string to a more readable format, or "-" when unparseable
pub fn format_date(date: Option<&str>) -> String {
    match date.and_then(parse_timestamp) {
        Some(dt) => dt.format("%b %d, %Y").to_string(),
        None => "-".to_string(),
    }
}

/// Case-insensitive ordering for names
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Case-insensitive substring test; `needle` is expected to be lowercase already
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Up to two uppercase initials from a name, falling back to the email, then "?"
pub fn initials(name: &str, email: &str) -> String {
    let base = if !name.trim().is_empty() {
        name
    } else if !email.trim().is_empty() {
        email
    } else {
        return "?".to_string();
    };
    base.split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}
