//! Related-article ranking that favours other viewpoints.
//!
//! Candidates share keywords or topic tags with the reference article but
//! never come from the reference's own domain. Ranking rewards a different
//! bias label more than any single shared term, so the top results are
//! coverage of the same story from elsewhere on the spectrum.

use crate::models::Article;
use crate::store::{ArticleQuery, ArticleStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Any-of queries use at most this many terms.
pub const MAX_QUERY_TERMS: usize = 10;

pub const BIAS_DIFFERENCE_WEIGHT: u32 = 10;
pub const SHARED_KEYWORD_WEIGHT: u32 = 5;
pub const SHARED_TAG_WEIGHT: u32 = 1;

fn shared(a: &[String], b: &[String]) -> u32 {
    let a: HashSet<&String> = a.iter().collect();
    let b: HashSet<&String> = b.iter().collect();
    a.intersection(&b).count() as u32
}

/// Score `candidate` against `reference`.
pub fn diversity_score(reference: &Article, candidate: &Article) -> u32 {
    let mut score = 0;
    if candidate.bias_label != reference.bias_label {
        score += BIAS_DIFFERENCE_WEIGHT;
    }
    score += SHARED_KEYWORD_WEIGHT * shared(&reference.keywords, &candidate.keywords);
    score += SHARED_TAG_WEIGHT * shared(&reference.topic_tags, &candidate.topic_tags);
    score
}

/// Drop the reference, same-domain candidates and duplicates, then order by
/// descending score. Ties keep candidate order.
pub fn rank(reference: &Article, candidates: Vec<Article>, count: usize) -> Vec<Article> {
    let reference_domain = reference.domain();
    let mut seen = HashSet::new();

    let mut scored: Vec<(u32, Article)> = candidates
        .into_iter()
        .filter(|c| c.url != reference.url)
        .filter(|c| reference_domain.is_none() || c.domain() != reference_domain)
        .filter(|c| seen.insert(c.url.clone()))
        .map(|c| (diversity_score(reference, &c), c))
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(count).map(|(_, a)| a).collect()
}

/// Finds articles related to a reference article.
#[derive(Debug)]
pub struct SimilarityRanker<S> {
    store: Arc<S>,
}

impl<S: ArticleStore> SimilarityRanker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn query_or_empty(&self, query: &ArticleQuery) -> Vec<Article> {
        self.store.query(query).await.unwrap_or_else(|e| {
            error!(error = %e, "Related-article query failed");
            Vec::new()
        })
    }

    /// Up to `count` articles related to the article stored under `url`.
    #[instrument(level = "info", skip_all, fields(%url, count = count))]
    pub async fn related(&self, url: &str, count: usize) -> Vec<Article> {
        let reference = match self.store.get(url).await {
            Ok(Some(article)) => article,
            Ok(None) => {
                debug!("Reference article not found");
                return Vec::new();
            }
            Err(e) => {
                error!(error = %e, "Reference lookup failed");
                return Vec::new();
            }
        };

        let reference_domain = reference.domain();
        let usable = |c: &Article| {
            c.url != reference.url
                && (reference_domain.is_none() || c.domain() != reference_domain)
        };

        let mut candidates = Vec::new();
        if !reference.keywords.is_empty() {
            let terms: Vec<String> = reference.keywords.iter().take(MAX_QUERY_TERMS).cloned().collect();
            candidates = self.query_or_empty(&ArticleQuery::new().any_keywords(&terms)).await;
        }

        let usable_count = candidates
            .iter()
            .filter(|&c| usable(c))
            .map(|c| c.url.as_str())
            .collect::<HashSet<_>>()
            .len();
        if usable_count < count && !reference.topic_tags.is_empty() {
            let terms: Vec<String> = reference.topic_tags.iter().take(MAX_QUERY_TERMS).cloned().collect();
            candidates.extend(self.query_or_empty(&ArticleQuery::new().any_topic_tags(&terms)).await);
        }

        debug!(candidates = candidates.len(), "Ranking related candidates");
        rank(&reference, candidates, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BiasLabel, ProcessingStatus};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn article(url: &str, bias: BiasLabel, keywords: &[&str], tags: &[&str]) -> Article {
        let now = Utc::now();
        let mut a = Article::draft(url, "Headline", None, "Politics", now, now);
        a.bias_label = bias;
        a.keywords = keywords.iter().map(|s| s.to_string()).collect();
        a.topic_tags = tags.iter().map(|s| s.to_string()).collect();
        a.processing_status = ProcessingStatus::Processed;
        a
    }

    #[test]
    fn test_score_weights() {
        let reference = article("https://a.com/r", BiasLabel::Center, &["EU", "Trade"], &["Politics", "Economy"]);
        let candidate = article("https://b.com/c", BiasLabel::Right, &["EU", "Trade", "X"], &["Politics"]);
        assert_eq!(diversity_score(&reference, &candidate), 10 + 5 * 2 + 1);

        let same_bias = article("https://b.com/d", BiasLabel::Center, &["EU"], &[]);
        assert_eq!(diversity_score(&reference, &same_bias), 5);
    }

    #[test]
    fn test_different_bias_ranks_strictly_higher() {
        let reference = article("https://a.com/r", BiasLabel::Center, &["EU"], &["Politics"]);
        let same = article("https://b.com/1", BiasLabel::Center, &["EU"], &["Politics"]);
        let other = article("https://c.com/2", BiasLabel::Left, &["EU"], &["Politics"]);

        let ranked = rank(&reference, vec![same.clone(), other.clone()], 2);
        assert_eq!(ranked[0].url, other.url);
        assert!(diversity_score(&reference, &other) > diversity_score(&reference, &same));
    }

    #[test]
    fn test_rank_excludes_same_domain_reference_and_duplicates() {
        let reference = article("https://www.a.com/r", BiasLabel::Center, &["EU"], &[]);
        let candidates = vec![
            reference.clone(),
            article("https://a.com/sibling", BiasLabel::Left, &["EU"], &[]),
            article("https://b.com/1", BiasLabel::Left, &["EU"], &[]),
            article("https://b.com/1", BiasLabel::Left, &["EU"], &[]),
        ];
        let ranked = rank(&reference, candidates, 10);
        let urls: Vec<_> = ranked.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com/1"]);
    }

    #[test]
    fn test_rank_ties_keep_order() {
        let reference = article("https://a.com/r", BiasLabel::Center, &["EU"], &[]);
        let candidates = vec![
            article("https://b.com/1", BiasLabel::Left, &["EU"], &[]),
            article("https://c.com/2", BiasLabel::Right, &["EU"], &[]),
            article("https://d.com/3", BiasLabel::Center, &[], &[]),
        ];
        let ranked = rank(&reference, candidates, 2);
        let urls: Vec<_> = ranked.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com/1", "https://c.com/2"]);
    }

    #[tokio::test]
    async fn test_related_supplements_with_tags() {
        let reference = article("https://a.com/r", BiasLabel::Center, &["EU"], &["Politics"]);
        let store = Arc::new(MemoryStore::with_articles([
            reference.clone(),
            article("https://b.com/kw", BiasLabel::Center, &["EU"], &[]),
            article("https://c.com/tag", BiasLabel::Left, &[], &["Politics"]),
            article("https://a.com/same-domain", BiasLabel::Left, &["EU"], &["Politics"]),
            article("https://d.com/unrelated", BiasLabel::Left, &["Mars"], &["Science"]),
        ]));
        let ranker = SimilarityRanker::new(store);

        let related = ranker.related(&reference.url, 5).await;
        let urls: Vec<_> = related.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://c.com/tag", "https://b.com/kw"]);
    }

    #[tokio::test]
    async fn test_related_skips_tag_query_when_keywords_suffice() {
        let reference = article("https://a.com/r", BiasLabel::Center, &["EU"], &["Politics"]);
        let store = Arc::new(MemoryStore::with_articles([
            reference.clone(),
            article("https://b.com/kw", BiasLabel::Center, &["EU"], &[]),
            article("https://c.com/tag", BiasLabel::Left, &[], &["Politics"]),
        ]));
        let ranker = SimilarityRanker::new(store);

        let related = ranker.related(&reference.url, 1).await;
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].url, "https://b.com/kw");
    }

    #[tokio::test]
    async fn test_missing_reference_is_empty() {
        let ranker = SimilarityRanker::new(Arc::new(MemoryStore::new()));
        assert!(ranker.related("https://nowhere.com/x", 5).await.is_empty());
    }
}
