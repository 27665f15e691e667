//! In-process article store.

use super::{ArticleQuery, ArticleStore, article_key};
use crate::error::StoreError;
use crate::models::Article;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Articles held in a map ordered by [`article_key`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Article>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `articles`.
    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let documents = articles
            .into_iter()
            .map(|a| (article_key(&a.url), a))
            .collect();
        Self {
            documents: RwLock::new(documents),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

impl ArticleStore for MemoryStore {
    async fn get(&self, url: &str) -> Result<Option<Article>, StoreError> {
        Ok(self.documents.read().await.get(&article_key(url)).cloned())
    }

    async fn save(&self, article: &Article) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert(article_key(&article.url), article.clone());
        Ok(())
    }

    async fn query(&self, query: &ArticleQuery) -> Result<Vec<Article>, StoreError> {
        let documents = self.documents.read().await;
        Ok(query.apply(documents.values().cloned()))
    }
}
