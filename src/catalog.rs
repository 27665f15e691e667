//! Read-side views over the article store: the recent feed, the dates that
//! have articles, filtered search and a status summary.

use crate::models::{Article, ProcessingStatus};
use crate::search::SearchFilters;
use crate::store::{ArticleQuery, ArticleStore};
use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

pub const FEED_LIMIT: usize = 50;
pub const DATE_SCAN_LIMIT: usize = 500;
pub const SEARCH_LIMIT: usize = 20;

/// Article counts by lifecycle state and enrichment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub total: usize,
    pub pending: usize,
    pub processed: usize,
    pub failed: usize,
    pub with_keywords: usize,
    pub without_keywords: usize,
}

impl StatusReport {
    pub fn tally<'a>(articles: impl IntoIterator<Item = &'a Article>) -> Self {
        articles.into_iter().fold(Self::default(), |mut r, a| {
            r.total += 1;
            match a.processing_status {
                ProcessingStatus::Pending => r.pending += 1,
                ProcessingStatus::Processed => r.processed += 1,
                ProcessingStatus::Failed => r.failed += 1,
            }
            if a.keywords.is_empty() {
                r.without_keywords += 1;
            } else {
                r.with_keywords += 1;
            }
            r
        })
    }
}

/// First and last instant of a UTC calendar day.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start + chrono::Duration::days(1) - chrono::Duration::nanoseconds(1);
    (start, end)
}

/// Query views used by the CLI front end.
#[derive(Debug)]
pub struct Catalog<S> {
    store: Arc<S>,
}

impl<S: ArticleStore> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn query_or_empty(&self, query: &ArticleQuery) -> Vec<Article> {
        self.store.query(query).await.unwrap_or_else(|e| {
            error!(error = %e, "Article query failed");
            Vec::new()
        })
    }

    /// Newest articles, optionally restricted to one UTC day.
    #[instrument(level = "info", skip_all, fields(date = ?date))]
    pub async fn recent_feed(&self, date: Option<NaiveDate>) -> Vec<Article> {
        let mut query = ArticleQuery::new().newest_first().limit(FEED_LIMIT);
        if let Some(date) = date {
            let (start, end) = day_bounds(date);
            query = query.created_between(start, end);
        }
        let articles = self.query_or_empty(&query).await;
        info!(count = articles.len(), "Feed assembled");
        articles
    }

    /// Distinct `YYYY-MM-DD` publication dates among the newest articles,
    /// newest first.
    pub async fn available_dates(&self) -> Vec<String> {
        let timestamps = self
            .store
            .recent_timestamps(DATE_SCAN_LIMIT)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Could not list article dates");
                Vec::new()
            });

        timestamps
            .into_iter()
            .map(|t| t.date_naive())
            .unique()
            .sorted_by(|a, b| b.cmp(a))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect()
    }

    /// Articles matching `filters`. Topic tags take precedence over keywords
    /// when both are present.
    #[instrument(level = "info", skip_all)]
    pub async fn search(&self, filters: &SearchFilters) -> Vec<Article> {
        let mut query = ArticleQuery::new().newest_first().limit(SEARCH_LIMIT);
        if let Some(label) = filters.bias_label {
            query = query.bias_label(label);
        }
        if !filters.topic_tags.is_empty() {
            query = query.any_topic_tags(&filters.topic_tags);
        } else if !filters.keywords.is_empty() {
            query = query.any_keywords(&filters.keywords);
        }
        let articles = self.query_or_empty(&query).await;
        info!(count = articles.len(), "Search complete");
        articles
    }

    pub async fn status_report(&self) -> StatusReport {
        let articles = self.query_or_empty(&ArticleQuery::new()).await;
        StatusReport::tally(&articles)
    }
}
