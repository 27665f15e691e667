//! Document store contract and backends.
//!
//! Articles are stored one document per URL, keyed by [`article_key`].
//! Reads go through [`ArticleQuery`], a small filter language covering what
//! the pipeline needs: any-of status, bias equality, any-of tags or keywords,
//! one `created_at` range, newest-first ordering and a limit.
//!
//! # Backends
//!
//! - [`MemoryStore`]: ordered in-process map, used by tests and dry runs
//! - [`JsonStore`]: one JSON file per article under a data directory
//!
//! Both return [`StoreError`] on failure. Callers in the pipeline log the
//! error and continue with an empty result.

pub mod json;
pub mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{Article, BiasLabel, ProcessingStatus};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Storage key for an article URL: the percent-encoded URL.
pub fn article_key(url: &str) -> String {
    urlencoding::encode(url).into_owned()
}

/// Filter, ordering and limit for [`ArticleStore::query`].
///
/// Empty lists mean "no constraint". Results keep the backend's key order
/// unless [`newest_first`](Self::newest_first) is set; that sort is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleQuery {
    pub statuses: Vec<ProcessingStatus>,
    pub bias_label: Option<BiasLabel>,
    pub any_topic_tags: Vec<String>,
    pub any_keywords: Vec<String>,
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub newest_first: bool,
    pub limit: Option<usize>,
}

impl ArticleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(mut self, statuses: &[ProcessingStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn bias_label(mut self, label: BiasLabel) -> Self {
        self.bias_label = Some(label);
        self
    }

    pub fn any_topic_tags(mut self, tags: &[String]) -> Self {
        self.any_topic_tags = tags.to_vec();
        self
    }

    pub fn any_keywords(mut self, keywords: &[String]) -> Self {
        self.any_keywords = keywords.to_vec();
        self
    }

    /// Inclusive on both ends.
    pub fn created_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.created_between = Some((start, end));
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when `article` passes every filter of this query.
    pub fn matches(&self, article: &Article) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&article.processing_status) {
            return false;
        }
        if self.bias_label.is_some_and(|b| b != article.bias_label) {
            return false;
        }
        if !self.any_topic_tags.is_empty()
            && !article.topic_tags.iter().any(|t| self.any_topic_tags.contains(t))
        {
            return false;
        }
        if !self.any_keywords.is_empty()
            && !article.keywords.iter().any(|k| self.any_keywords.contains(k))
        {
            return false;
        }
        if let Some((start, end)) = self.created_between {
            if article.created_at < start || article.created_at > end {
                return false;
            }
        }
        true
    }

    /// Filter, order and limit documents given in key order.
    pub fn apply(&self, documents: impl IntoIterator<Item = Article>) -> Vec<Article> {
        let mut hits: Vec<Article> = documents.into_iter().filter(|a| self.matches(a)).collect();
        if self.newest_first {
            hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        if let Some(limit) = self.limit {
            hits.truncate(limit);
        }
        hits
    }
}

/// Contract for article persistence.
pub trait ArticleStore: Send + Sync {
    /// Fetch the article stored under `url`, if any.
    fn get(&self, url: &str) -> impl Future<Output = Result<Option<Article>, StoreError>> + Send;

    /// Insert or replace the document for `article.url`.
    fn save(&self, article: &Article) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn query(
        &self,
        query: &ArticleQuery,
    ) -> impl Future<Output = Result<Vec<Article>, StoreError>> + Send;

    /// `created_at` of the newest `limit` articles, newest first.
    fn recent_timestamps(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DateTime<Utc>>, StoreError>> + Send {
        async move {
            let query = ArticleQuery::new().newest_first().limit(limit);
            let articles = self.query(&query).await?;
            Ok(articles.into_iter().map(|a| a.created_at).collect())
        }
    }
}
