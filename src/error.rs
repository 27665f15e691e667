//! Error types for each stage of the pipeline.
//!
//! Each stage gets its own enum so callers can tell a feed outage from an
//! enrichment failure or a store failure. None of these are fatal to a run:
//! the harvester skips failing sources, the analyzer turns [`AnalysisError`]
//! into a `Failed` article, and the queue degrades [`StoreError`] to empty
//! results after logging it.

use thiserror::Error;

/// Failure while fetching or parsing a single feed source.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP status {0}")]
    Status(u16),

    #[error("unreadable feed document: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Failure while enriching an article through the text-generation service.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("text-generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("text-generation service returned no candidate text")]
    EmptyResponse,

    #[error("response is not a valid analysis object: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure inside a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure while loading the YAML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
