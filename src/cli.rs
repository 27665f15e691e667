//! Command-line interface definitions for Perspective News.
//!
//! This module defines the CLI arguments, options and subcommands using the
//! `clap` crate. Global options can also be provided via environment
//! variables.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Command-line arguments for the Perspective News pipeline.
///
/// # Examples
///
/// ```sh
/// # Harvest feeds and analyze everything that was queued
/// GEMINI_API_KEY=... perspective_news harvest
///
/// # Harvest and analyze without touching the stored articles
/// perspective_news --dry-run harvest
///
/// # Re-run analysis for stale or failed articles, at most 20
/// perspective_news --data-dir ./data backfill --limit 20
///
/// # Articles covering the same story from other outlets
/// perspective_news related https://www.bbc.co.uk/news/articles/abc --count 3
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Article store directory (overrides `data_dir` from the config file)
    #[arg(short, long, env = "NEWS_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Work on an in-memory copy of the article store; nothing is written back
    #[arg(long)]
    pub dry_run: bool,

    /// Gemini API key; analysis and search translation are disabled without it
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The API key, ignoring an empty value.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fetch all feeds, store new articles as pending, then drain the queue
    Harvest,
    /// Analyze pending and failed articles
    Drain,
    /// Re-analyze pending, failed and incompletely enriched articles
    Backfill {
        /// Process at most this many articles
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Articles related to URL, ranked to favour other viewpoints
    Related {
        url: String,
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,
    },
    /// Newest articles, optionally for one UTC day (YYYY-MM-DD)
    Feed {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Days that have articles, newest first
    Dates,
    /// Natural-language search
    Search { query: String },
    /// Article counts by processing status
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "perspective_news",
            "--config",
            "./config.yaml",
            "--data-dir",
            "./data",
            "--gemini-api-key",
            "secret",
            "drain",
        ]);

        assert_eq!(cli.config.as_deref(), Some("./config.yaml"));
        assert_eq!(cli.data_dir.as_deref(), Some("./data"));
        assert_eq!(cli.api_key(), Some("secret"));
        assert_eq!(cli.command, Command::Drain);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_dry_run_flag() {
        let cli = Cli::parse_from(&["perspective_news", "--dry-run", "harvest"]);
        assert!(cli.dry_run);
        assert_eq!(cli.command, Command::Harvest);
    }

    #[test]
    fn test_cli_subcommand_args() {
        let cli = Cli::parse_from(&[
            "perspective_news",
            "related",
            "https://apnews.com/article/x",
            "-n",
            "5",
        ]);
        assert_eq!(
            cli.command,
            Command::Related {
                url: "https://apnews.com/article/x".to_string(),
                count: 5
            }
        );

        let cli = Cli::parse_from(&["perspective_news", "feed", "--date", "2025-05-06"]);
        assert_eq!(
            cli.command,
            Command::Feed {
                date: NaiveDate::from_ymd_opt(2025, 5, 6)
            }
        );

        let cli = Cli::parse_from(&["perspective_news", "backfill"]);
        assert_eq!(cli.command, Command::Backfill { limit: None });
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let cli = Cli::parse_from(&["perspective_news", "--gemini-api-key", "  ", "status"]);
        assert_eq!(cli.api_key(), None);
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let parsed = Cli::try_parse_from(&["perspective_news", "feed", "--date", "May 6"]);
        assert!(parsed.is_err());
    }
}
