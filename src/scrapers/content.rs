//! Article page scraping with a paywall / anti-bot fallback.
//!
//! The scraper downloads the article page, keeps only paragraph text outside
//! navigation and boilerplate, and decides whether that text is usable.
//! Pages that are too short or that read like a paywall or a bot challenge
//! are discarded in favour of the summary the feed already provided.

use crate::scrapers::browser_client;
use crate::utils::{normalize_whitespace, truncate_chars};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Scraped text is cut to this many characters.
pub const MAX_SCRAPED_CHARS: usize = 5000;

/// Scraped text shorter than this is treated as a blocked page.
pub const MIN_SCRAPED_CHARS: usize = 200;

const PAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Phrases that mark a paywall, consent wall or bot challenge.
pub const BLOCKING_PHRASES: &[&str] = &[
    "enable javascript",
    "disable ad blocker",
    "turn off your ad blocker",
    "subscribe to read",
    "subscription required",
    "sign in to continue",
    "you have reached your limit",
    "access to this content is restricted",
    "please enable cookies",
];

const EXCLUDED_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));

/// Supplies the text an article is analyzed from.
///
/// [`ContentScraper`] is the production implementation; the queue only
/// depends on this trait so it can run without network access.
pub trait TextSource: Send + Sync {
    /// Best available text for `url`, or `fallback` when nothing better exists.
    fn article_text(&self, url: &str, fallback: &str) -> impl Future<Output = String> + Send;
}

fn is_excluded(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|el| EXCLUDED_TAGS.contains(&el.name()))
}

fn paragraph_text(paragraph: ElementRef<'_>) -> String {
    let text = paragraph
        .descendants()
        .filter(|node| !node.ancestors().any(|a| is_excluded(a.value())))
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect::<Vec<_>>()
        .join("");
    normalize_whitespace(&text)
}

/// Concatenate the paragraph text of a page, skipping script, style,
/// navigation, header and footer content, and cut it to
/// [`MAX_SCRAPED_CHARS`].
pub fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let text = document
        .select(&PARAGRAPH)
        .filter(|p| !p.ancestors().any(|a| is_excluded(a.value())))
        .map(paragraph_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&text, MAX_SCRAPED_CHARS).to_string()
}

/// True when scraped text is too short or looks like a paywall or bot wall.
pub fn is_blocked(text: &str) -> bool {
    if text.chars().count() < MIN_SCRAPED_CHARS {
        return true;
    }
    let lower = text.to_lowercase();
    BLOCKING_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Pick the scraped text unless it is blocked, in which case the fallback
/// is returned unchanged.
pub fn choose_text(scraped: String, fallback: &str) -> String {
    if is_blocked(&scraped) {
        fallback.to_string()
    } else {
        scraped
    }
}

/// Fetches article pages over HTTP.
#[derive(Debug, Clone)]
pub struct ContentScraper {
    client: Client,
}

impl ContentScraper {
    pub fn new() -> reqwest::Result<Self> {
        Ok(Self {
            client: browser_client(PAGE_TIMEOUT)?,
        })
    }

    async fn fetch_page(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

impl TextSource for ContentScraper {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn article_text(&self, url: &str, fallback: &str) -> String {
        match self.fetch_page(url).await {
            Ok(html) => {
                let scraped = extract_article_text(&html);
                debug!(
                    chars = scraped.chars().count(),
                    blocked = is_blocked(&scraped),
                    "Scraped article page"
                );
                choose_text(scraped, fallback)
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed; using feed summary");
                fallback.to_string()
            }
        }
    }
}
