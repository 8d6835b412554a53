//! Article content extraction: summary and keyword shaping.
//!
//! Dereferences an accepted listing entry through the page-fetch
//! collaborator and shapes the raw page into the stored fields: the body
//! truncated to a fixed number of code points, and the tag labels with
//! order-preserving dedup.

use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::models::ArticlePage;
use crate::utils::truncate_chars;
use itertools::Itertools;

/// Stored summaries keep at most this many code points of the body.
pub const SUMMARY_MAX_CHARS: usize = 300;

/// The extracted content fields of one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Fetch an article page and extract its content fields.
///
/// Failures to load the body propagate to the caller, which skips the
/// article and continues the crawl. An absent tag region is an empty
/// keyword list, not a failure.
pub async fn extract(
    fetcher: &impl PageFetcher,
    url: &str,
) -> Result<Extraction, FetchError> {
    let page = fetcher.article_page(url).await?;
    Ok(shape(page))
}

/// Truncation is a hard code-point bound; no word or sentence boundary
/// handling.
fn shape(page: ArticlePage) -> Extraction {
    let summary = truncate_chars(page.body.trim(), SUMMARY_MAX_CHARS);
    let keywords = page
        .tags
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .unique()
        .collect();
    Extraction { summary, keywords }
}
