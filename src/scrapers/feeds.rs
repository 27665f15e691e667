//! RSS / Atom feed harvesting.
//!
//! The harvester walks the configured categories in order, fetches each feed
//! source, and turns recent entries into pending [`Article`] drafts.
//!
//! # Acceptance Rules
//!
//! - The entry needs a parseable published (or, failing that, updated) date
//! - The date must be no older than [`RECENCY_WINDOW_HOURS`] before the
//!   harvest started; the boundary itself is accepted
//! - Link and title must be non-empty
//! - At most [`MAX_PER_CATEGORY`] entries are accepted per category, across
//!   all of that category's sources
//! - A URL already accepted earlier in the same run is skipped
//!
//! A source that cannot be fetched or parsed is logged and skipped; it never
//! aborts the rest of the harvest.

use crate::config::FeedCategory;
use crate::error::FeedError;
use crate::models::Article;
use crate::scrapers::{browser_client, strip_markup};
use crate::utils::normalize_whitespace;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Entries published earlier than this many hours before the harvest are dropped.
pub const RECENCY_WINDOW_HOURS: i64 = 48;

/// Maximum number of accepted entries per category in one harvest.
pub const MAX_PER_CATEGORY: usize = 12;

const FEED_TIMEOUT: StdDuration = StdDuration::from_secs(15);

/// A feed entry reduced to the fields a draft article needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Description / summary with markup removed.
    pub summary: Option<String>,
    /// Published time, or the update time when no publish time was given,
    /// at second resolution.
    pub published_at: Option<DateTime<Utc>>,
}

/// The article page: an alternate (or untyped) link, then any link, then an
/// entry id that is itself a web URL (RSS permalink guids).
fn article_link(entry: &Entry) -> String {
    entry
        .links
        .iter()
        .find(|link| matches!(link.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .map(|link| link.href.trim().to_string())
        .or_else(|| {
            Url::parse(entry.id.trim())
                .ok()
                .filter(|url| matches!(url.scheme(), "http" | "https"))
                .map(String::from)
        })
        .unwrap_or_default()
}

impl From<Entry> for FeedEntry {
    fn from(entry: Entry) -> Self {
        let link = article_link(&entry);
        Self {
            title: entry
                .title
                .map(|t| normalize_whitespace(&t.content))
                .unwrap_or_default(),
            link,
            summary: entry
                .summary
                .map(|t| strip_markup(&t.content))
                .filter(|text| !text.is_empty()),
            published_at: entry
                .published
                .or(entry.updated)
                .map(|at| at.trunc_subsecs(0)),
        }
    }
}

/// Parse an RSS 0.9x/1.0/2.0, Atom or JSON Feed document into entries.
pub fn parse_feed(body: &[u8]) -> Result<Vec<FeedEntry>, FeedError> {
    let feed = parser::parse(body)?;
    Ok(feed.entries.into_iter().map(FeedEntry::from).collect())
}

/// Accumulates accepted drafts across every source of one harvest.
#[derive(Debug)]
pub struct HarvestRun {
    harvested_at: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    seen: HashSet<String>,
    articles: Vec<Article>,
}

impl HarvestRun {
    pub fn new(harvested_at: DateTime<Utc>) -> Self {
        Self {
            harvested_at,
            cutoff: harvested_at - Duration::hours(RECENCY_WINDOW_HOURS),
            seen: HashSet::new(),
            articles: Vec::new(),
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Accept entries for `category` until `accepted` reaches the category cap.
    pub fn admit(&mut self, category: &str, entries: Vec<FeedEntry>, accepted: &mut usize) {
        for entry in entries {
            if *accepted >= MAX_PER_CATEGORY {
                break;
            }

            let Some(published_at) = entry.published_at else {
                debug!(title = %entry.title, "Skipping entry without a parseable date");
                continue;
            };
            if published_at < self.cutoff {
                continue;
            }

            let url = entry.link.trim();
            let headline = entry.title.trim();
            if url.is_empty() || headline.is_empty() {
                continue;
            }
            if !self.seen.insert(url.to_string()) {
                debug!(%url, "Skipping entry already harvested in this run");
                continue;
            }

            self.articles.push(Article::draft(
                url,
                headline,
                entry.summary,
                category,
                published_at,
                self.harvested_at,
            ));
            *accepted += 1;
        }
    }

    pub fn into_articles(self) -> Vec<Article> {
        self.articles
    }
}

/// Fetches configured feeds and produces pending article drafts.
#[derive(Debug, Clone)]
pub struct FeedHarvester {
    client: Client,
    feeds: Vec<FeedCategory>,
}

impl FeedHarvester {
    pub fn new(feeds: Vec<FeedCategory>) -> Result<Self, FeedError> {
        Ok(Self {
            client: browser_client(FEED_TIMEOUT)?,
            feeds,
        })
    }

    /// Run one harvest across every configured category.
    #[instrument(level = "info", skip_all, fields(categories = self.feeds.len()))]
    pub async fn harvest(&self) -> Vec<Article> {
        let mut run = HarvestRun::new(Utc::now());
        info!(cutoff = %run.cutoff(), "Fetching articles published after cutoff");

        for feed in &self.feeds {
            let mut accepted = 0usize;
            for source in &feed.sources {
                if accepted >= MAX_PER_CATEGORY {
                    break;
                }
                match self.fetch_entries(source).await {
                    Ok(entries) => {
                        debug!(%source, entries = entries.len(), "Parsed feed");
                        run.admit(&feed.category, entries, &mut accepted);
                    }
                    Err(e) => {
                        warn!(%source, error = %e, "Feed fetch failed; skipping source");
                    }
                }
            }
            info!(category = %feed.category, accepted, "Harvested category");
        }

        let articles = run.into_articles();
        info!(count = articles.len(), "Harvest complete");
        articles
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_entries(&self, source: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let response = self.client.get(source).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        parse_feed(&body)
    }
}
