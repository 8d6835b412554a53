//! Listing-entry filtering: exclusion keywords and the date window.
//!
//! Every listing entry passes through two gates before anything is
//! fetched: a fixed set of noise keywords that disqualify a title
//! outright, and the inclusive date window of the current run. Entries
//! whose date label does not parse are rejected upstream and logged by
//! the controller.

use crate::models::CrawlWindow;
use chrono::NaiveDate;

/// Titles containing any of these terms are administrative or
/// waste-sector noise and never harvested.
const EXCLUDED_TITLE_TERMS: [&str; 9] = [
    "废", "污", "环境", "公示", "空气", "汇总", "解读", "秸秆", "垃圾",
];

/// Whether a title is disqualified by the exclusion-keyword set.
pub fn skip_by_keyword(title: &str) -> bool {
    EXCLUDED_TITLE_TERMS.iter().any(|term| title.contains(term))
}

/// Whether a date falls inside the window, both bounds inclusive.
pub fn in_window(date: NaiveDate, window: &CrawlWindow) -> bool {
    window.start <= date && date <= window.end
}

/// Parse a listing date label. Labels are expected in strict `YYYY-MM-DD`
/// form; anything else is a per-entry failure, not a run failure.
pub fn parse_entry_date(label: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(label.trim(), "%Y-%m-%d")
}
