//! # BJX Policy News
//!
//! Harvests policy news articles from the Beijixing paginated listing
//! index into a local SQLite archive, keyed by article URL.
//!
//! ## Features
//!
//! - Walks listing pages within an operator-supplied date window and
//!   stops early once a long run of pages falls outside it
//! - Filters administrative/waste-sector noise titles by keyword
//! - Resolves a (province, city) pair from each title against a
//!   reference table
//! - Extracts a bounded summary and the page's keyword tags
//! - Stores each article at most once; re-crawls are deduplicated by URL
//!
//! ## Usage
//!
//! ```sh
//! bjx_policy_news -d news_data.db -m province_city_mapping.csv
//! ```
//!
//! The process then accepts `run` (manual crawl over a prompted date
//! range), a handful of record-management commands (`recent`, `show`,
//! `search`, `province`, `delete`, `clear`), and `exit`. A background
//! task additionally crawls the previous calendar day once per day at
//! the configured local time.

use chrono::{Local, NaiveTime};
use clap::Parser;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod crawler;
mod error;
mod extract;
mod fetch;
mod filter;
mod locations;
mod models;
mod schedule;
mod store;
mod utils;

use cli::Cli;
use crawler::{CrawlConfig, CrawlController};
use fetch::{HttpFetcher, RetryFetch};
use locations::LocationIndex;
use models::CrawlWindow;
use store::{ArticleStore, Column, Direction, Predicate, Sort, StoredArticle};

/// How many rows the `recent` command prints.
const RECENT_LIMIT: usize = 10;

/// Long-lived collaborators shared by the command loop and the scheduler.
struct App {
    store: ArticleStore,
    locations: LocationIndex,
    /// Held for the whole of a crawl run; at most one crawl is active.
    crawl_lock: Mutex<()>,
    listing_url: String,
    fetch_timeout: Duration,
    crawl_config: CrawlConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("policy news harvester starting up");

    let args = Cli::parse();
    let schedule_at = schedule::parse_schedule_time(&args.schedule_at)?;

    let locations = LocationIndex::from_csv_path(&args.mapping_path).await?;
    info!(
        path = %args.mapping_path,
        provinces = locations.province_count(),
        cities = locations.city_count(),
        "Loaded location reference table"
    );

    let store = ArticleStore::open(&args.db_path).await?;
    info!(path = %args.db_path, articles = store.count().await?, "Article store ready");

    let app = Arc::new(App {
        store,
        locations,
        crawl_lock: Mutex::new(()),
        listing_url: args.listing_url,
        fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
        crawl_config: CrawlConfig {
            max_pages: args.max_pages,
            max_empty_pages: args.max_empty_pages,
        },
    });

    tokio::spawn(daily_schedule(schedule_at, Arc::clone(&app)));

    command_loop(&app).await;
    Ok(())
}

/// Fire a crawl for the previous calendar day once per day at `at`.
async fn daily_schedule(at: NaiveTime, app: Arc<App>) {
    loop {
        let wait = schedule::next_wait(Local::now().naive_local(), at);
        info!(wait_secs = wait.as_secs(), at = %at, "Next scheduled crawl");
        tokio::time::sleep(wait).await;

        let day = utils::yesterday();
        info!(date = %day, "Scheduled crawl starting");
        run_crawl(&app, CrawlWindow::single_day(day)).await;
    }
}

/// Run one crawl under the single-run lock.
///
/// The fetch session is created here and dropped at the end of the run;
/// failing to create it aborts this run only.
async fn run_crawl(app: &App, window: CrawlWindow) {
    let _running = app.crawl_lock.lock().await;
    let start = std::time::Instant::now();

    let fetcher = match HttpFetcher::new(&app.listing_url, app.fetch_timeout) {
        Ok(fetcher) => RetryFetch::new(fetcher, 2, Duration::from_secs(1)),
        Err(e) => {
            error!(error = %e, "Could not create fetch session; aborting this run");
            return;
        }
    };

    let controller = CrawlController::new(
        &fetcher,
        &app.locations,
        &app.store,
        app.crawl_config.clone(),
    );
    let summary = controller.run(window).await;

    let elapsed = start.elapsed();
    info!(
        %window,
        secs = elapsed.as_secs(),
        pages = summary.pages_scanned,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        skipped = summary.skipped,
        stopped_early = summary.stopped_early,
        "Crawl run complete"
    );
}

const COMMAND_HELP: &str = "Commands: run | recent | show <start> <end> | search <term> \
| province <name> | delete <id...> | clear | exit";

/// The foreground operator loop. Unrecognized input reprompts without
/// side effects; EOF on stdin behaves like `exit`.
async fn command_loop(app: &Arc<App>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Ready. {COMMAND_HELP}");

    loop {
        let Some(line) = read_line(&mut lines, ">> ").await else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        match command.to_lowercase().as_str() {
            "run" => manual_crawl(app, &mut lines).await,
            "recent" => show_recent(app).await,
            "show" => show_window(app, rest).await,
            "search" => search_titles(app, rest).await,
            "province" => show_province(app, rest).await,
            "delete" => delete_rows(app, rest).await,
            "clear" => clear_store(app).await,
            "exit" => {
                println!("Exiting.");
                break;
            }
            "" => {}
            other => {
                println!("Unknown command '{other}'. {COMMAND_HELP}");
            }
        }
    }
}

/// Prompt for a window and crawl it. A malformed date cancels the
/// request before anything runs.
async fn manual_crawl(app: &App, lines: &mut Lines<BufReader<Stdin>>) {
    let window = match prompt_window(lines).await {
        Ok(window) => window,
        Err(e) => {
            println!("{e}");
            return;
        }
    };

    println!("Manual crawl starting for {window}.");
    run_crawl(app, window).await;
    println!("Manual crawl finished.");
}

async fn prompt_window(
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<CrawlWindow, error::DateError> {
    let prompt = "Start date (yyyy/mm/dd, yyyy-mm-dd, or yyyymmdd): ";
    let raw = read_line(lines, prompt).await.unwrap_or_default();
    let start = utils::normalize_date(&raw)?;

    let prompt = "End date (yyyy/mm/dd, yyyy-mm-dd, or yyyymmdd): ";
    let raw = read_line(lines, prompt).await.unwrap_or_default();
    let end = utils::normalize_date(&raw)?;

    Ok(CrawlWindow::new(start, end))
}

/// Print the newest stored rows as JSON lines.
async fn show_recent(app: &App) {
    let sort = Sort {
        column: Column::Date,
        direction: Direction::Descending,
    };
    match app.store.query(&[], Some(sort)).await {
        Ok(rows) => print_rows(rows.iter().take(RECENT_LIMIT)),
        Err(e) => println!("Query failed: {e}"),
    }
}

/// Print every stored row dated inside an inclusive range.
async fn show_window(app: &App, args: &str) {
    let mut parts = args.split_whitespace();
    let (Some(start), Some(end)) = (parts.next(), parts.next()) else {
        println!("Usage: show <start> <end>");
        return;
    };
    let window = match (utils::normalize_date(start), utils::normalize_date(end)) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => {
            println!("{e}");
            return;
        }
    };

    let predicates = [
        Predicate::Ge(Column::Date, window.0.to_string()),
        Predicate::Le(Column::Date, window.1.to_string()),
    ];
    let sort = Sort {
        column: Column::Date,
        direction: Direction::Ascending,
    };
    match app.store.query(&predicates, Some(sort)).await {
        Ok(rows) => print_rows(rows.iter()),
        Err(e) => println!("Query failed: {e}"),
    }
}

/// Print rows whose title contains the given term.
async fn search_titles(app: &App, term: &str) {
    let term = term.trim();
    if term.is_empty() {
        println!("Usage: search <term>");
        return;
    }
    let predicates = [Predicate::Contains(Column::Title, term.to_string())];
    match app.store.query(&predicates, None).await {
        Ok(rows) => print_rows(rows.iter()),
        Err(e) => println!("Query failed: {e}"),
    }
}

/// Print rows resolved to the given province.
async fn show_province(app: &App, name: &str) {
    let name = name.trim();
    if name.is_empty() {
        println!("Usage: province <name>");
        return;
    }
    let predicates = [Predicate::Eq(Column::Province, name.to_string())];
    match app.store.query(&predicates, None).await {
        Ok(rows) => print_rows(rows.iter()),
        Err(e) => println!("Query failed: {e}"),
    }
}

/// Delete rows by id.
async fn delete_rows(app: &App, args: &str) {
    let ids: Result<Vec<i64>, _> = args.split_whitespace().map(str::parse).collect();
    match ids {
        Ok(ids) if ids.is_empty() => println!("Usage: delete <id...>"),
        Ok(ids) => match app.store.delete(&ids).await {
            Ok(removed) => println!("Deleted {removed} row(s)."),
            Err(e) => println!("Delete failed: {e}"),
        },
        Err(_) => println!("Ids must be integers. Usage: delete <id...>"),
    }
}

/// Remove every stored row.
async fn clear_store(app: &App) {
    match app.store.delete_all().await {
        Ok(removed) => println!("Cleared {removed} row(s)."),
        Err(e) => println!("Clear failed: {e}"),
    }
}

fn print_rows<'a>(rows: impl Iterator<Item = &'a StoredArticle>) {
    let mut printed = 0usize;
    for row in rows {
        match serde_json::to_string(row) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!(error = %e, "could not serialize row"),
        }
        printed += 1;
    }
    if printed == 0 {
        println!("No matching rows.");
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
    lines.next_line().await.ok().flatten()
}
