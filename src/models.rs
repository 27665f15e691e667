//! Data models for harvested and enriched news articles.
//!
//! This module defines the record that flows through the whole pipeline:
//! - [`Article`]: the unit of work and the storage record
//! - [`BiasLabel`]: the political-lean label assigned during analysis
//! - [`ProcessingStatus`]: where an article sits in the enrichment lifecycle
//!
//! Enum fields serialize as their human-readable labels (`"Lean Left"`,
//! `"pending"`) so stored documents stay readable and compatible with records
//! written by earlier versions of the service.

use crate::utils::domain_of;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How long a harvested article is kept before it becomes eligible for cleanup.
pub const RETENTION_DAYS: i64 = 7;

/// Summary text used when the feed entry carries no description.
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable";

/// A `detailed_summary` shorter than this counts as missing enrichment.
pub const MIN_DETAILED_SUMMARY_CHARS: usize = 10;

/// Political-lean label attached to an article.
///
/// The analysis step must return one of these labels verbatim; anything else
/// is rejected rather than coerced to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BiasLabel {
    #[serde(rename = "Left")]
    Left,
    #[serde(rename = "Lean Left")]
    LeanLeft,
    #[serde(rename = "Center")]
    Center,
    #[serde(rename = "Lean Right")]
    LeanRight,
    #[serde(rename = "Right")]
    Right,
    #[default]
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl BiasLabel {
    /// The label exactly as it is stored and as the model is asked to emit it.
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasLabel::Left => "Left",
            BiasLabel::LeanLeft => "Lean Left",
            BiasLabel::Center => "Center",
            BiasLabel::LeanRight => "Lean Right",
            BiasLabel::Right => "Right",
            BiasLabel::NotAvailable => "N/A",
        }
    }
}

impl fmt::Display for BiasLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an article's enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processed,
    Failed,
}

/// Records written before the status field existed were always analyzed
/// inline, so a missing status reads as `Processed`.
fn legacy_status() -> ProcessingStatus {
    ProcessingStatus::Processed
}

/// A news article, from harvested draft to fully analyzed record.
///
/// # Lifecycle
///
/// 1. Created by the feed harvester with status [`ProcessingStatus::Pending`],
///    the harvesting category as its only tag and the feed description as
///    `summary`.
/// 2. Picked up by the queue, scraped, and sent through the analyzer, which
///    moves it to `Processed` (fields filled) or `Failed` (fields untouched).
/// 3. Re-selected by backfill while it is `Failed`, still `Pending`, or
///    missing enrichment fields.
///
/// Fields added after the first schema version carry `#[serde(default)]` so
/// older documents still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Canonical article URL; the storage key is derived from it.
    pub url: String,
    /// Headline, possibly rewritten by the analysis step.
    pub headline: String,
    /// Plain-text summary. Holds the feed description until analysis
    /// replaces it with the TL;DR.
    pub summary: String,
    /// Two or three sentence summary produced by analysis.
    #[serde(default)]
    pub tldr_summary: Option<String>,
    /// Multi-section Markdown summary produced by analysis.
    #[serde(default)]
    pub detailed_summary: Option<String>,
    #[serde(default)]
    pub bias_label: BiasLabel,
    /// Harvesting category followed by any tags added during analysis.
    #[serde(default)]
    pub topic_tags: Vec<String>,
    /// Named entities and key terms extracted during analysis.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "legacy_status")]
    pub processing_status: ProcessingStatus,
    /// Publication time reported by the feed, at second resolution.
    pub created_at: DateTime<Utc>,
    /// Harvest time plus [`RETENTION_DAYS`].
    pub expire_at: DateTime<Utc>,
}

impl Article {
    /// Build a pending draft for a freshly harvested feed entry.
    pub fn draft(
        url: impl Into<String>,
        headline: impl Into<String>,
        summary: Option<String>,
        category: &str,
        published_at: DateTime<Utc>,
        harvested_at: DateTime<Utc>,
    ) -> Self {
        let summary = summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string());

        Self {
            url: url.into(),
            headline: headline.into(),
            summary,
            tldr_summary: None,
            detailed_summary: None,
            bias_label: BiasLabel::NotAvailable,
            topic_tags: vec![category.to_string()],
            keywords: Vec::new(),
            processing_status: ProcessingStatus::Pending,
            created_at: published_at,
            expire_at: harvested_at + Duration::days(RETENTION_DAYS),
        }
    }

    /// Source domain with any leading `www.` removed.
    pub fn domain(&self) -> Option<String> {
        domain_of(&self.url)
    }

    /// True when the record predates keyword extraction or structured
    /// summaries, or when analysis left them empty.
    pub fn missing_enrichment(&self) -> bool {
        let detailed_missing = self
            .detailed_summary
            .as_deref()
            .is_none_or(|s| s.trim().chars().count() < MIN_DETAILED_SUMMARY_CHARS);
        detailed_missing || self.keywords.is_empty()
    }

    /// True when the record should be picked up by a backfill pass.
    pub fn needs_backfill(&self) -> bool {
        self.processing_status != ProcessingStatus::Processed || self.missing_enrichment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Article {
        let published = Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap();
        let harvested = Utc.with_ymd_and_hms(2025, 5, 6, 16, 0, 0).unwrap();
        Article::draft(
            "https://www.example.com/story",
            "Headline",
            Some("Feed blurb".to_string()),
            "Politics",
            published,
            harvested,
        )
    }

    #[test]
    fn test_draft_defaults() {
        let article = sample();
        assert_eq!(article.processing_status, ProcessingStatus::Pending);
        assert_eq!(article.topic_tags, vec!["Politics".to_string()]);
        assert_eq!(article.bias_label, BiasLabel::NotAvailable);
        assert!(article.keywords.is_empty());
        assert_eq!(
            article.expire_at,
            Utc.with_ymd_and_hms(2025, 5, 13, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_draft_without_summary_uses_placeholder() {
        let now = Utc::now();
        let article = Article::draft("https://a.com/1", "H", Some("  ".into()), "Sports", now, now);
        assert_eq!(article.summary, SUMMARY_UNAVAILABLE);
    }

    #[test]
    fn test_bias_label_serializes_as_label() {
        let json = serde_json::to_string(&BiasLabel::LeanLeft).unwrap();
        assert_eq!(json, "\"Lean Left\"");
        let json = serde_json::to_string(&BiasLabel::NotAvailable).unwrap();
        assert_eq!(json, "\"N/A\"");
    }

    #[test]
    fn test_bias_label_rejects_unknown_value() {
        let parsed: Result<BiasLabel, _> = serde_json::from_str("\"Far Left\"");
        assert!(parsed.is_err());
        let parsed: Result<BiasLabel, _> = serde_json::from_str("\"center\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ProcessingStatus::Processed).unwrap();
        assert_eq!(json, "\"processed\"");
    }

    #[test]
    fn test_legacy_record_decodes_as_processed() {
        let json = r#"{
            "url": "https://example.com/old",
            "headline": "Old story",
            "summary": "Old summary",
            "bias_label": "Center",
            "created_at": "2025-05-01T10:00:00Z",
            "expire_at": "2025-05-08T10:00:00Z"
        }"#;

        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.processing_status, ProcessingStatus::Processed);
        assert!(article.keywords.is_empty());
        assert!(article.missing_enrichment());
        assert!(article.needs_backfill());
    }

    #[test]
    fn test_missing_enrichment() {
        let mut article = sample();
        article.processing_status = ProcessingStatus::Processed;
        article.keywords = vec!["NATO".to_string()];
        article.detailed_summary = Some("short".to_string());
        assert!(article.missing_enrichment());

        article.detailed_summary = Some("**What Happened**: plenty of detail".to_string());
        assert!(!article.missing_enrichment());
        assert!(!article.needs_backfill());

        article.keywords.clear();
        assert!(article.needs_backfill());
    }

    #[test]
    fn test_failed_article_needs_backfill() {
        let mut article = sample();
        article.processing_status = ProcessingStatus::Failed;
        article.keywords = vec!["a".to_string()];
        article.detailed_summary = Some("a long enough summary".to_string());
        assert!(article.needs_backfill());
    }

    #[test]
    fn test_domain_strips_www() {
        assert_eq!(sample().domain(), Some("example.com".to_string()));
    }
}
