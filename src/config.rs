//! YAML configuration for feeds, the model endpoint and queue tuning.
//!
//! Every field has a default, so the application runs without a config file.
//! A file only needs the keys it wants to override:
//!
//! ```yaml
//! model: gemini-1.5-flash
//! data_dir: /var/lib/perspective_news
//! feeds:
//!   - category: Politics
//!     sources:
//!       - http://feeds.bbci.co.uk/news/politics/rss.xml
//! queue:
//!   item_timeout_secs: 60
//! ```

use crate::error::ConfigError;
use crate::queue::QueueSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// One harvesting category and its feed sources, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedCategory {
    pub category: String,
    pub sources: Vec<String>,
}

impl FeedCategory {
    pub fn new(category: &str, sources: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Queue tuning as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Articles selected per drain batch.
    pub batch_size: usize,
    /// Concurrent analyses for an explicitly triggered drain.
    pub drain_concurrency: usize,
    /// Concurrent analyses for the drain that follows a harvest.
    pub cycle_concurrency: usize,
    pub item_timeout_secs: u64,
    pub backfill_timeout_secs: u64,
    pub backfill_delay_secs: u64,
    /// How many of the newest articles backfill inspects for stale enrichment.
    pub backfill_window: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            drain_concurrency: 3,
            cycle_concurrency: 5,
            item_timeout_secs: 45,
            backfill_timeout_secs: 30,
            backfill_delay_secs: 2,
            backfill_window: 100,
        }
    }
}

impl From<&QueueConfig> for QueueSettings {
    fn from(c: &QueueConfig) -> Self {
        QueueSettings {
            batch_size: c.batch_size.max(1),
            item_timeout: Duration::from_secs(c.item_timeout_secs),
            backfill_timeout: Duration::from_secs(c.backfill_timeout_secs),
            backfill_delay: Duration::from_secs(c.backfill_delay_secs),
            backfill_window: c.backfill_window,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub feeds: Vec<FeedCategory>,
    /// Gemini model used for analysis and query translation.
    pub model: String,
    pub api_base_url: String,
    /// Directory holding one JSON document per article.
    pub data_dir: String,
    pub queue: QueueConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            model: "gemini-1.5-flash".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            data_dir: "./data/articles".to_string(),
            queue: QueueConfig::default(),
        }
    }
}

fn default_feeds() -> Vec<FeedCategory> {
    vec![
        FeedCategory::new(
            "Politics",
            &[
                "http://feeds.bbci.co.uk/news/politics/rss.xml",
                "https://rss.nytimes.com/services/xml/rss/nyt/Politics.xml",
            ],
        ),
        FeedCategory::new(
            "International",
            &[
                "http://feeds.bbci.co.uk/news/world/rss.xml",
                "https://www.aljazeera.com/xml/rss/all.xml",
            ],
        ),
        FeedCategory::new(
            "Entertainment",
            &[
                "https://www.eonline.com/news/rss.xml",
                "https://rss.nytimes.com/services/xml/rss/nyt/Movies.xml",
            ],
        ),
        FeedCategory::new(
            "Sports",
            &[
                "https://www.espn.com/espn/rss/news",
                "http://feeds.bbci.co.uk/sport/rss.xml",
            ],
        ),
    ]
}

impl AppConfig {
    /// Parse a YAML document; missing keys fall back to defaults.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings::from(&self.queue)
    }
}

/// Load configuration from `path`, or return the defaults when no path is given.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        info!("No config file given; using defaults");
        return Ok(AppConfig::default());
    };

    let text = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    let config = AppConfig::from_yaml(&text)?;
    info!(
        categories = config.feeds.len(),
        model = %config.model,
        data_dir = %config.data_dir,
        "Loaded configuration"
    );
    Ok(config)
}
