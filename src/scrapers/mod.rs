//! Network-facing collectors: feed harvesting and article page scraping.
//!
//! Two collectors live here, one per pipeline stage:
//!
//! | Stage | Module | Input | Output |
//! |-------|--------|-------|--------|
//! | Harvest | [`feeds`] | category → feed URLs | pending [`Article`](crate::models::Article) drafts |
//! | Scrape | [`content`] | article URL + feed summary | plain text for analysis |
//!
//! # Common Patterns
//!
//! Both collectors:
//! - Share one `reqwest` client configuration with a browser-like
//!   `User-Agent` and a bounded timeout ([`browser_client`])
//! - Treat every network or parse failure as recoverable: a failing feed is
//!   skipped, a failing page falls back to the feed-provided summary
//! - Strip markup with the `scraper` crate rather than regexes

pub mod content;
pub mod feeds;

pub use content::{ContentScraper, TextSource};
pub use feeds::FeedHarvester;

use crate::utils::normalize_whitespace;
use reqwest::Client;
use scraper::Html;
use std::time::Duration;

/// Many publishers serve a stub page or a 403 to unknown user agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Build an HTTP client that identifies as a desktop browser.
pub fn browser_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Reduce an HTML fragment (such as a feed description) to plain text.
pub fn strip_markup(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text = html.root_element().text().collect::<Vec<_>>().join(" ");
    normalize_whitespace(&text)
}
