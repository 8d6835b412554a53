//! The crawl controller: page iteration and termination policy.
//!
//! Walks listing pages in strict order, filters entries, dereferences the
//! survivors one at a time through the shared fetch session, and submits
//! assembled articles to the store. Terminates when the page bound is
//! exhausted, when the listing index itself runs out, or when a
//! configured run of consecutive pages yields nothing in-window (listing
//! pages are date-ordered descending, so a long out-of-window run means
//! the rest of the index is out of the window too).
//!
//! Per-article failures never abort a page or the run: an unparseable
//! date, an unreachable body, or a store error is logged and the entry
//! skipped.

use crate::error::FetchError;
use crate::extract;
use crate::fetch::PageFetcher;
use crate::filter;
use crate::locations::LocationIndex;
use crate::models::{Article, CrawlWindow, ListingEntry};
use crate::store::ArticleStore;
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

/// Bounds for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Hard upper bound on listing pages scanned.
    pub max_pages: u32,
    /// Consecutive pages without an in-window article before stopping
    /// early.
    pub max_empty_pages: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_empty_pages: 50,
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_scanned: u32,
    /// Articles newly inserted into the store.
    pub inserted: u32,
    /// Articles resubmitted with a URL already present.
    pub duplicates: u32,
    /// Entries dropped by per-article failures (bad date label,
    /// unreachable body, store error).
    pub skipped: u32,
    /// Whether the consecutive-empty-page ceiling fired.
    pub stopped_early: bool,
}

/// Drives one crawl run over its collaborators.
///
/// Holds everything by reference: the fetch session lives exactly as
/// long as the run, and the location index and store outlive it.
pub struct CrawlController<'a, F> {
    fetcher: &'a F,
    locations: &'a LocationIndex,
    store: &'a ArticleStore,
    config: CrawlConfig,
}

impl<'a, F: PageFetcher> CrawlController<'a, F> {
    pub fn new(
        fetcher: &'a F,
        locations: &'a LocationIndex,
        store: &'a ArticleStore,
        config: CrawlConfig,
    ) -> Self {
        Self {
            fetcher,
            locations,
            store,
            config,
        }
    }

    /// Run the crawl for one date window.
    ///
    /// Never fails: every internal error is contained as a skipped entry
    /// or an empty page, and all three ways of stopping are normal.
    #[instrument(level = "info", skip_all, fields(%window))]
    pub async fn run(&self, window: CrawlWindow) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        let mut consecutive_empty = 0u32;

        for page_num in 1..=self.config.max_pages {
            let entries = match self.fetcher.listing_page(page_num).await {
                Ok(entries) => entries,
                Err(FetchError::Exhausted(_)) => {
                    info!(page = page_num, "listing index exhausted");
                    break;
                }
                Err(e) => {
                    warn!(page = page_num, error = %e, "listing page fetch failed; treating page as empty");
                    Vec::new()
                }
            };
            summary.pages_scanned += 1;

            if self.scan_page(page_num, &entries, &window, &mut summary).await {
                consecutive_empty = 0;
            } else {
                consecutive_empty += 1;
                debug!(page = page_num, consecutive_empty, "no in-window articles on page");
                if consecutive_empty >= self.config.max_empty_pages {
                    info!(
                        page = page_num,
                        consecutive_empty, "empty-page ceiling reached; stopping early"
                    );
                    summary.stopped_early = true;
                    break;
                }
            }
        }

        info!(
            pages = summary.pages_scanned,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            stopped_early = summary.stopped_early,
            "crawl finished"
        );
        summary
    }

    /// Process one page's entries. Returns whether at least one entry
    /// survived the filters and was submitted to the store.
    async fn scan_page(
        &self,
        page_num: u32,
        entries: &[ListingEntry],
        window: &CrawlWindow,
        summary: &mut CrawlSummary,
    ) -> bool {
        let mut has_matches = false;

        for entry in entries {
            if filter::skip_by_keyword(&entry.title) {
                debug!(title = %entry.title, "entry skipped by keyword");
                continue;
            }
            let Some(label) = entry.date_label.as_deref() else {
                warn!(url = %entry.url, "entry has no date label; skipping");
                summary.skipped += 1;
                continue;
            };
            let date = match filter::parse_entry_date(label) {
                Ok(date) => date,
                Err(e) => {
                    warn!(url = %entry.url, label, error = %e, "unparseable entry date; skipping");
                    summary.skipped += 1;
                    continue;
                }
            };
            if !filter::in_window(date, window) {
                continue;
            }

            match self.harvest(entry, date).await {
                Ok(inserted) => {
                    has_matches = true;
                    if inserted {
                        summary.inserted += 1;
                        info!(page = page_num, title = %entry.title, "article stored");
                    } else {
                        summary.duplicates += 1;
                        debug!(url = %entry.url, "article already present");
                    }
                }
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "article harvest failed; continuing");
                    summary.skipped += 1;
                }
            }
        }

        has_matches
    }

    /// Dereference one accepted entry, assemble the record, and submit
    /// it. Returns whether the store inserted a new row.
    async fn harvest(&self, entry: &ListingEntry, date: NaiveDate) -> anyhow::Result<bool> {
        let extraction = extract::extract(self.fetcher, &entry.url).await?;
        let (province, city) = self.locations.resolve(&entry.title);
        let article = Article {
            title: entry.title.clone(),
            date,
            province,
            city,
            keywords: extraction.keywords,
            summary: extraction.summary,
            url: entry.url.clone(),
        };
        Ok(self.store.upsert(&article).await?)
    }
}
