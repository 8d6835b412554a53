//! The page-fetch collaborator: listing pages and article pages.
//!
//! One [`HttpFetcher`] is created per crawl run and owns the HTTP session
//! for that run; every article dereference is a short-lived request that
//! completes (or fails) before the next listing entry is touched.
//!
//! # Architecture
//!
//! The module uses a trait-based design:
//! - [`PageFetcher`]: the seam the crawl controller works against
//! - [`HttpFetcher`]: production implementation over reqwest + scraper
//! - [`RetryFetch`]: decorator adding bounded backoff for transient
//!   failures
//!
//! # Page shapes
//!
//! Listing entries are `a[title]` anchors; the publish date sits in the
//! `<span>` that follows the anchor (or the anchor's parent). Article
//! bodies live under `#article_cont`, tag labels under `#key_word a`.

use crate::error::FetchError;
use crate::models::{ArticlePage, ListingEntry};
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use rand::{rng, Rng};
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

static TITLE_ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[title]").unwrap());
static ARTICLE_BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("#article_cont").unwrap());
static TAG_ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("#key_word a").unwrap());

/// Access to the paginated listing index and to individual article pages.
pub trait PageFetcher {
    /// Fetch one listing page. [`FetchError::Exhausted`] signals that the
    /// index has no page at this number, a normal end of the crawl.
    async fn listing_page(&self, page_num: u32) -> Result<Vec<ListingEntry>, FetchError>;

    /// Dereference an article URL into its body text and tag labels.
    async fn article_page(&self, url: &str) -> Result<ArticlePage, FetchError>;
}

/// Production fetcher over a single HTTP session.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    listing_base: Url,
}

impl HttpFetcher {
    /// Create the session for one crawl run.
    ///
    /// # Errors
    ///
    /// [`FetchError::Session`] when the HTTP client cannot be built; the
    /// caller aborts the run, not the process.
    pub fn new(listing_base: &str, timeout: Duration) -> Result<Self, FetchError> {
        let listing_base = Url::parse(listing_base)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Session)?;
        Ok(Self {
            client,
            listing_base,
        })
    }

    fn listing_url(&self, page_num: u32) -> String {
        format!(
            "{}/{}/",
            self.listing_base.as_str().trim_end_matches('/'),
            page_num
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn listing_page(&self, page_num: u32) -> Result<Vec<ListingEntry>, FetchError> {
        let url = self.listing_url(page_num);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::Exhausted(page_num));
        }
        let response = response
            .error_for_status()
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;
        let html = response.text().await.map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;

        let entries = parse_listing(&html, &self.listing_base);
        debug!(page = page_num, count = entries.len(), "fetched listing page");
        Ok(entries)
    }

    async fn article_page(&self, url: &str) -> Result<ArticlePage, FetchError> {
        let html = self.get_text(url).await?;
        let page = parse_article(&html, url)?;
        debug!(
            %url,
            body_chars = page.body.chars().count(),
            tags = page.tags.len(),
            preview = %truncate_for_log(&page.body, 60),
            "fetched article page"
        );
        Ok(page)
    }
}

/// Extract listing entries from a listing page document.
///
/// Anchors without an href, with an unresolvable href, or with no visible
/// title text (falling back to the `title` attribute) are dropped.
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for anchor in document.select(&TITLE_ANCHORS) {
        let mut title = anchor.text().collect::<Vec<_>>().join(" ").trim().to_string();
        if title.is_empty() {
            title = anchor
                .value()
                .attr("title")
                .unwrap_or_default()
                .trim()
                .to_string();
        }
        if title.is_empty() {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        entries.push(ListingEntry {
            title,
            url: resolved.to_string(),
            date_label: sibling_date_label(&anchor),
        });
    }

    entries
}

/// The date label printed next to a listing anchor: the first `<span>`
/// among the anchor's following siblings, then among its parent's.
fn sibling_date_label(anchor: &ElementRef) -> Option<String> {
    anchor
        .next_siblings()
        .chain(
            anchor
                .parent()
                .into_iter()
                .flat_map(|parent| parent.next_siblings()),
        )
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "span")
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|label| !label.is_empty())
}

/// Extract the body text and tag labels from an article document.
///
/// A missing content region is a per-article failure; a missing tag
/// region is an empty tag list.
pub fn parse_article(html: &str, url: &str) -> Result<ArticlePage, FetchError> {
    let document = Html::parse_document(html);
    let Some(body_el) = document.select(&ARTICLE_BODY).next() else {
        return Err(FetchError::MissingContent(url.to_string()));
    };
    let body = body_el
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let tags = document
        .select(&TAG_ANCHORS)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(ArticlePage { body, tags })
}

/// Decorator that retries transient failures with exponential backoff
/// and jitter before giving up.
///
/// The delay between attempts follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
/// Non-transient errors (exhaustion, missing content, session failures)
/// are returned immediately.
#[derive(Debug)]
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: PageFetcher> RetryFetch<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
        if delay > self.max_delay {
            delay = self.max_delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T: PageFetcher + Sync> PageFetcher for RetryFetch<T> {
    async fn listing_page(&self, page_num: u32) -> Result<Vec<ListingEntry>, FetchError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.listing_page(page_num).await {
                Ok(entries) => return Ok(entries),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        page = page_num,
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "listing fetch failed; backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn article_page(&self, url: &str) -> Result<ArticlePage, FetchError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.article_page(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        %url,
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "article fetch failed; backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
