//! # Perspective News
//!
//! A news ingestion and enrichment pipeline that harvests RSS/Atom feeds,
//! scrapes the linked articles, enriches each one through a generative model
//! (summaries, bias label, topic tags, keywords) and ranks related coverage
//! so readers see the same story from other viewpoints.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... perspective_news harvest
//! perspective_news related https://www.bbc.co.uk/news/articles/abc
//! ```
//!
//! ## Architecture
//!
//! 1. **Harvest**: fetch every configured feed, keep recent entries, store
//!    them as pending articles
//! 2. **Drain**: scrape, look up the source's baseline bias and analyze
//!    pending articles in parallel under a concurrency bound and per-item
//!    timeout
//! 3. **Backfill**: sequentially re-run analysis for failed or stale records
//! 4. **Read side**: recent feed, dates, search and related-article ranking
//!
//! With `--dry-run` every command works on an in-memory copy of the store,
//! so a harvest or backfill can be tried without changing stored articles.

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analyzer;
mod api;
mod bias;
mod catalog;
mod cli;
mod config;
mod error;
mod models;
mod queue;
mod scrapers;
mod search;
mod similarity;
mod store;
mod utils;

use analyzer::Analyzer;
use api::GeminiClient;
use catalog::Catalog;
use cli::{Cli, Command};
use config::AppConfig;
use queue::QueueCoordinator;
use scrapers::{ContentScraper, FeedHarvester};
use search::QueryTranslator;
use similarity::SimilarityRanker;
use store::{ArticleQuery, ArticleStore, JsonStore, MemoryStore};

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute one subcommand against `store`.
async fn run<S: ArticleStore + 'static>(
    command: Command,
    store: Arc<S>,
    client: Option<GeminiClient>,
    config: &AppConfig,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Harvest => {
            let harvester = FeedHarvester::new(config.feeds.clone())?;
            let drafts = harvester.harvest().await;

            let queue = Arc::new(QueueCoordinator::new(
                store,
                Analyzer::new(client),
                ContentScraper::new()?,
                config.queue_settings(),
            ));
            let enqueued = queue.enqueue(&drafts).await;

            // The drain runs on its own task; wait for it before the process exits.
            let handle = queue.clone().spawn_drain(config.queue.cycle_concurrency);
            info!("Harvest complete; background drain started");
            let drained = handle.await?;

            print_json(&serde_json::json!({
                "harvested": drafts.len(),
                "enqueued": enqueued,
                "drain": drained,
            }))?;
        }
        Command::Drain => {
            let queue = QueueCoordinator::new(
                store,
                Analyzer::new(client),
                ContentScraper::new()?,
                config.queue_settings(),
            );
            print_json(&queue.drain(config.queue.drain_concurrency).await)?;
        }
        Command::Backfill { limit } => {
            let queue = QueueCoordinator::new(
                store,
                Analyzer::new(client),
                ContentScraper::new()?,
                config.queue_settings(),
            );
            print_json(&queue.backfill(limit).await)?;
        }
        Command::Related { url, count } => {
            let ranker = SimilarityRanker::new(store);
            print_json(&ranker.related(&url, count).await)?;
        }
        Command::Feed { date } => {
            print_json(&Catalog::new(store).recent_feed(date).await)?;
        }
        Command::Dates => {
            print_json(&Catalog::new(store).available_dates().await)?;
        }
        Command::Search { query } => {
            let filters = QueryTranslator::new(client).translate(&query).await;
            let articles = Catalog::new(store).search(&filters).await;
            print_json(&serde_json::json!({
                "filters": filters,
                "articles": articles,
            }))?;
        }
        Command::Status => {
            print_json(&Catalog::new(store).status_report().await)?;
        }
    }
    Ok(())
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    debug!(?args.config, ?args.data_dir, command = ?args.command, "Parsed CLI arguments");

    let config = config::load_config(args.config.as_deref()).await?;
    let data_dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
    let disk = JsonStore::open(&data_dir).await?;
    let client = GeminiClient::from_key(args.api_key(), &config.model, &config.api_base_url);
    info!(%data_dir, credential = client.is_some(), dry_run = args.dry_run, "Perspective News starting up");

    if args.dry_run {
        let snapshot = disk.query(&ArticleQuery::new()).await?;
        let store = Arc::new(MemoryStore::with_articles(snapshot));
        info!(articles = store.len().await, "Dry run: working on an in-memory copy of the store");
        run(args.command, store.clone(), client, &config).await?;
        info!(articles = store.len().await, "Dry run finished; nothing written to disk");
    } else {
        run(args.command, Arc::new(disk), client, &config).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
