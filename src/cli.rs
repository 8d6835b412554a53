//! Command-line interface definitions.
//!
//! All runtime configuration arrives through these flags or their
//! environment-variable fallbacks; there is no config file.

use clap::Parser;

/// Command-line arguments for the news harvester.
///
/// # Examples
///
/// ```sh
/// # Default paths, default listing index
/// bjx_policy_news
///
/// # Separate database and a lower page bound for a quick run
/// bjx_policy_news -d /tmp/news.db --max-pages 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the SQLite article database
    #[arg(short, long, env = "NEWS_DB_PATH", default_value = "news_data.db")]
    pub db_path: String,

    /// Path to the province/city reference CSV
    #[arg(
        short,
        long,
        env = "PROVINCE_CITY_MAPPING",
        default_value = "province_city_mapping.csv"
    )]
    pub mapping_path: String,

    /// Base URL of the paginated listing index
    #[arg(long, default_value = "https://news.bjx.com.cn/zc")]
    pub listing_url: String,

    /// Hard upper bound on listing pages scanned per run
    #[arg(long, default_value_t = 100)]
    pub max_pages: u32,

    /// Consecutive pages without in-window articles before stopping early
    #[arg(long, default_value_t = 50)]
    pub max_empty_pages: u32,

    /// Per-request fetch timeout in seconds
    #[arg(long, default_value_t = 50)]
    pub fetch_timeout_secs: u64,

    /// Local wall-clock time (HH:MM) of the daily scheduled crawl
    #[arg(long, default_value = "08:30")]
    pub schedule_at: String,
}
