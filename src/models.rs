//! Data models for harvested articles and crawl inputs.
//!
//! This module defines the data structures that move through the pipeline:
//! - [`ListingEntry`]: one row of a paginated listing page
//! - [`ArticlePage`]: a dereferenced article as the fetch layer returns it
//! - [`Article`]: the assembled record handed to the store
//! - [`CrawlWindow`]: the inclusive date range a crawl run covers

use chrono::NaiveDate;
use std::fmt;

/// One entry on a listing page: the visible title, the absolute article
/// URL, and the date label printed next to the title.
///
/// The date label is kept as raw text; parsing (and rejecting) it is the
/// filter's job. Entries whose adjacent date node is missing carry `None`
/// and are skipped downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    pub url: String,
    pub date_label: Option<String>,
}

/// A dereferenced article page: the main body text plus the tag labels
/// from the keyword region, in page order. An absent keyword region is an
/// empty list, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePage {
    pub body: String,
    pub tags: Vec<String>,
}

/// A fully assembled article record, ready for insertion.
///
/// `url` is the natural key: the store keeps at most one row per URL and
/// ignores later inserts for the same one. `province` and `city` hold at
/// most a single value each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub date: NaiveDate,
    pub province: Option<String>,
    pub city: Option<String>,
    /// Ordered tag labels; serialized comma-joined in the store.
    pub keywords: Vec<String>,
    /// Body text truncated to a fixed number of code points.
    pub summary: String,
    pub url: String,
}

/// The inclusive `[start, end]` date range of one crawl invocation.
///
/// Built once per run (manual trigger: two normalized operator dates;
/// scheduled trigger: yesterday twice) and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CrawlWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A window covering exactly one calendar day.
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }
}

impl fmt::Display for CrawlWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_day_window_has_equal_bounds() {
        let w = CrawlWindow::single_day(date(2024, 11, 15));
        assert_eq!(w.start, w.end);
        assert_eq!(w.start, date(2024, 11, 15));
    }

    #[test]
    fn window_displays_both_bounds() {
        let w = CrawlWindow::new(date(2024, 3, 2), date(2024, 3, 5));
        assert_eq!(w.to_string(), "2024-03-02 to 2024-03-05");
    }

    #[test]
    fn listing_entry_keeps_raw_date_label() {
        let entry = ListingEntry {
            title: "深圳发布新能源政策".to_string(),
            url: "https://news.example.com/html/20240301/a.shtml".to_string(),
            date_label: Some("2024-03-01".to_string()),
        };
        assert_eq!(entry.date_label.as_deref(), Some("2024-03-01"));
    }
}
