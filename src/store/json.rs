//! Directory-of-JSON-documents article store.
//!
//! Each article lives in `{root}/{article_key}.json`. Keys longer than
//! [`MAX_KEY_FILE_BYTES`] are shortened to a prefix plus a hash of the full
//! key; the stored `url` is checked on read so a shortened name can never
//! return the wrong article.
//!
//! Writes go to a hidden temporary file that is then renamed over the
//! document, so a reader never sees a half-written article.

use super::{ArticleQuery, ArticleStore, article_key};
use crate::error::StoreError;
use crate::models::Article;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Longest key used verbatim as a file name.
pub const MAX_KEY_FILE_BYTES: usize = 200;

const SHORT_KEY_PREFIX_BYTES: usize = 160;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// File name for an article key. Keys are percent-encoded and therefore
/// ASCII, so byte slicing is safe.
fn file_name(key: &str) -> String {
    if key.len() <= MAX_KEY_FILE_BYTES {
        format!("{key}.json")
    } else {
        format!(
            "{}~{:016x}.json",
            &key[..SHORT_KEY_PREFIX_BYTES],
            fnv1a(key.as_bytes())
        )
    }
}

/// Article store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Open (creating if needed) the store rooted at `root`.
    #[instrument(level = "info", skip_all, fields(root = %root.as_ref().display()))]
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        debug!("Article store ready");
        Ok(Self { root })
    }

    #[cfg(test)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(file_name(&article_key(url)))
    }

    async fn read_document(path: &Path) -> Result<Option<Article>, StoreError> {
        match fs::read_to_string(path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ArticleStore for JsonStore {
    async fn get(&self, url: &str) -> Result<Option<Article>, StoreError> {
        let article = Self::read_document(&self.path_for(url)).await?;
        Ok(article.filter(|a| a.url == url))
    }

    async fn save(&self, article: &Article) -> Result<(), StoreError> {
        let path = self.path_for(&article.url);
        let name = file_name(&article_key(&article.url));
        let tmp = self.root.join(format!(".{name}.tmp"));

        let json = serde_json::to_string_pretty(article)?;
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    async fn query(&self, query: &ArticleQuery) -> Result<Vec<Article>, StoreError> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || !name.ends_with(".json") {
                continue;
            }
            paths.push(entry.path());
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read_document(&path).await {
                Ok(Some(article)) => documents.push(article),
                Ok(None) => {}
                Err(StoreError::Serialization(e)) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable article document");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(documents = documents.len(), "Scanned article documents");
        Ok(query.apply(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessingStatus;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn article(url: &str, hour: u32) -> Article {
        let at = Utc.with_ymd_and_hms(2025, 5, 6, hour, 0, 0).unwrap();
        Article::draft(url, "Headline", Some("Blurb".into()), "Politics", at, at)
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path().join("articles")).await.unwrap();

        let a = article("https://www.bbc.co.uk/news/1", 10);
        store.save(&a).await.unwrap();

        assert_eq!(store.get(&a.url).await.unwrap(), Some(a.clone()));
        assert!(store.get("https://www.bbc.co.uk/news/2").await.unwrap().is_none());

        let written = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_long_url_uses_hashed_name() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        let base = format!("https://example.com/{}", "a".repeat(300));
        let first = article(&format!("{base}/1"), 1);
        let second = article(&format!("{base}/2"), 2);
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        assert_eq!(store.get(&first.url).await.unwrap().unwrap().url, first.url);
        assert_eq!(store.get(&second.url).await.unwrap().unwrap().url, second.url);
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_query_skips_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        store.save(&article("https://a.com/1", 1)).await.unwrap();
        let mut processed = article("https://a.com/2", 2);
        processed.processing_status = ProcessingStatus::Processed;
        store.save(&processed).await.unwrap();
        std::fs::write(dir.path().join("garbage.json"), "{not json").unwrap();

        let all = store.query(&ArticleQuery::new().newest_first()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].url, "https://a.com/2");

        let pending = store
            .query(&ArticleQuery::new().statuses(&[ProcessingStatus::Pending]))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_file_name_bounds() {
        assert_eq!(file_name("abc"), "abc.json");
        let long = "x".repeat(MAX_KEY_FILE_BYTES + 1);
        let name = file_name(&long);
        assert_eq!(name.len(), SHORT_KEY_PREFIX_BYTES + 1 + 16 + ".json".len());
        assert_ne!(file_name(&format!("{long}1")), file_name(&format!("{long}2")));
    }
}
