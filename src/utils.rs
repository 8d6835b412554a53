//! Date normalization and text helpers.
//!
//! This module provides the small helpers used throughout the pipeline:
//! - Operator date input normalization (three accepted textual forms)
//! - "Yesterday" computation for the scheduled trigger
//! - Code-point-safe truncation (summaries and log previews are CJK text,
//!   so byte slicing is never safe here)

use crate::error::DateError;
use chrono::{Duration, Local, NaiveDate};

/// The textual date forms accepted at the manual-trigger boundary.
const ACCEPTED_DATE_FORMATS: [&str; 3] = ["%Y/%m/%d", "%Y-%m-%d", "%Y%m%d"];

/// Normalize an operator-supplied date string to a calendar date.
///
/// Accepts `YYYY/MM/DD`, `YYYY-MM-DD`, and `YYYYMMDD`; the slash and dash
/// forms also take non-zero-padded month and day. The first form that
/// parses wins.
///
/// # Errors
///
/// Returns [`DateError`] when none of the accepted forms match.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_date("2024/3/1").unwrap().to_string(), "2024-03-01");
/// assert_eq!(normalize_date("20240301").unwrap().to_string(), "2024-03-01");
/// ```
pub fn normalize_date(input: &str) -> Result<NaiveDate, DateError> {
    let input = input.trim();
    for fmt in ACCEPTED_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return Ok(date);
        }
    }
    Err(DateError(input.to_string()))
}

/// The previous calendar day in local time, the range a scheduled crawl
/// covers.
pub fn yesterday() -> NaiveDate {
    Local::now().date_naive() - Duration::days(1)
}

/// Truncate a string to at most `max` Unicode code points.
///
/// Returns the input unchanged when it is already short enough. Cuts on
/// char boundaries only, so multi-byte text is never split mid-character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long values are cut to `max` code points with an ellipsis and a count
/// of what was dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        format!("{}…(+{} chars)", truncate_chars(s, max), total - max)
    }
}
