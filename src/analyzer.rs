//! Article enrichment through the text-generation service.
//!
//! One analysis is a single round trip: build a prompt from the article text
//! and the baseline bias, ask the model for a strict JSON object, decode it
//! into [`AnalysisPayload`] and fold the result into the [`Article`].
//!
//! The outcome is always terminal: the returned article is either
//! [`ProcessingStatus::Processed`] with every enrichment field filled, or
//! [`ProcessingStatus::Failed`] with its previous content untouched.

use crate::api::TextGenerator;
use crate::error::AnalysisError;
use crate::models::{Article, BiasLabel, ProcessingStatus};
use crate::utils::{strip_code_fences, truncate_chars, truncate_for_log};
use itertools::Itertools;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

/// Article text sent to the model is cut to this many characters.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Written into every summary field when no credential is configured.
pub const NO_KEY_PLACEHOLDER: &str = "Summary unavailable (No API Key)";

/// The JSON object the model is asked to return.
///
/// `bias_label` must be one of the exact labels; any other value fails the
/// decode and therefore the analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub headline: Option<String>,
    pub tldr: String,
    pub detailed_summary: String,
    pub bias_label: BiasLabel,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Decode a raw model answer, tolerating a surrounding code fence.
pub fn decode_analysis(raw: &str) -> Result<AnalysisPayload, AnalysisError> {
    Ok(serde_json::from_str(strip_code_fences(raw))?)
}

/// Build the analysis prompt.
pub fn build_prompt(text: &str, baseline: &str, domain: &str) -> String {
    format!(
        r#"Analyze the following news article and return a structured summary.

Source domain: {domain}
Known baseline bias of this source: {baseline}
(The baseline is context only. Judge the article itself.)

Article text:
{text}

Respond with a single JSON object and nothing else, using exactly these fields:
- "headline": a neutral headline, or the original one if it is already neutral
- "tldr": a 2-3 sentence summary, at most 50 words
- "detailed_summary": Markdown with three sections, "**What Happened**", "**Impact/Reactions**" and "**Conclusion**", 150-200 words in total
- "bias_label": exactly one of "Left", "Lean Left", "Center", "Lean Right", "Right"
- "topic_tags": 3-5 short topic tags
- "keywords": 5-10 named entities or key terms
"#,
        text = truncate_chars(text, MAX_PROMPT_CHARS),
    )
}

/// Merge the payload into `article` and mark it processed.
fn apply_payload(article: &mut Article, payload: AnalysisPayload) {
    if let Some(headline) = payload.headline.filter(|h| !h.trim().is_empty()) {
        article.headline = headline;
    }
    article.summary = payload.tldr.clone();
    article.tldr_summary = Some(payload.tldr);
    article.detailed_summary = Some(payload.detailed_summary);
    article.bias_label = payload.bias_label;

    let existing = std::mem::take(&mut article.topic_tags);
    article.topic_tags = existing
        .into_iter()
        .chain(payload.topic_tags)
        .filter(|t| !t.trim().is_empty())
        .unique()
        .collect();
    article.keywords = payload
        .keywords
        .into_iter()
        .filter(|k| !k.trim().is_empty())
        .unique()
        .collect();
    article.processing_status = ProcessingStatus::Processed;
}

/// Enriches articles through an optional text generator.
///
/// `None` means no credential is configured: every analysis fails
/// immediately without touching the network.
#[derive(Debug, Clone)]
pub struct Analyzer<G> {
    generator: Option<G>,
}

impl<G: TextGenerator> Analyzer<G> {
    pub fn new(generator: Option<G>) -> Self {
        Self { generator }
    }

    #[cfg(test)]
    pub fn generator(&self) -> Option<&G> {
        self.generator.as_ref()
    }

    /// Analyze `article` from `text`, with `baseline` as the source's prior
    /// bias label.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub async fn analyze(&self, mut article: Article, text: &str, baseline: &str) -> Article {
        let Some(generator) = &self.generator else {
            warn!("No text-generation credential configured; marking article failed");
            article.summary = NO_KEY_PLACEHOLDER.to_string();
            article.tldr_summary = Some(NO_KEY_PLACEHOLDER.to_string());
            article.detailed_summary = Some(NO_KEY_PLACEHOLDER.to_string());
            article.processing_status = ProcessingStatus::Failed;
            return article;
        };

        let domain = article.domain().unwrap_or_default();
        let prompt = build_prompt(text, baseline, &domain);

        let outcome = match generator.generate(&prompt).await {
            Ok(raw) => decode_analysis(&raw).inspect_err(|e| {
                error!(error = %e, response = %truncate_for_log(&raw, 500), "Analysis response rejected");
            }),
            Err(e) => {
                error!(error = %e, "Text generation failed");
                Err(e)
            }
        };

        match outcome {
            Ok(payload) => {
                apply_payload(&mut article, payload);
                info!(
                    bias = %article.bias_label,
                    tags = article.topic_tags.len(),
                    keywords = article.keywords.len(),
                    "Article analyzed"
                );
            }
            Err(_) => article.processing_status = ProcessingStatus::Failed,
        }
        article
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Generator that answers every prompt with a fixed text, or fails.
    pub(crate) struct StubGenerator {
        answer: Option<String>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        pub(crate) fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                answer: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone().ok_or(AnalysisError::EmptyResponse)
        }
    }

    pub(crate) const VALID_ANSWER: &str = r#"{"headline":"H","tldr":"t","detailed_summary":"**What Happened**: d","bias_label":"Center","topic_tags":["x"],"keywords":["a","b"]}"#;

    fn pending() -> Article {
        let at = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        Article::draft(
            "https://www.reuters.com/world/story",
            "Original headline",
            Some("Feed summary".to_string()),
            "International",
            at,
            at,
        )
    }

    #[tokio::test]
    async fn test_valid_answer_processes_article() {
        let analyzer = Analyzer::new(Some(StubGenerator::answering(VALID_ANSWER)));
        let article = analyzer.analyze(pending(), "Body text", "Center").await;

        assert_eq!(article.processing_status, ProcessingStatus::Processed);
        assert_eq!(article.headline, "H");
        assert_eq!(article.summary, "t");
        assert_eq!(article.tldr_summary.as_deref(), Some("t"));
        assert_eq!(article.detailed_summary.as_deref(), Some("**What Happened**: d"));
        assert_eq!(article.bias_label, BiasLabel::Center);
        assert_eq!(article.keywords, vec!["a", "b"]);
        assert_eq!(article.topic_tags, vec!["International", "x"]);
    }

    #[tokio::test]
    async fn test_non_json_answer_fails_and_keeps_fields() {
        let analyzer = Analyzer::new(Some(StubGenerator::answering("I cannot help with that.")));
        let article = analyzer.analyze(pending(), "Body text", "Center").await;

        assert_eq!(article.processing_status, ProcessingStatus::Failed);
        assert_eq!(article.headline, "Original headline");
        assert_eq!(article.summary, "Feed summary");
        assert_eq!(article.topic_tags, vec!["International"]);
        assert!(article.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_bias_label_fails() {
        let answer = VALID_ANSWER.replace("\"Center\"", "\"Far Left\"");
        let analyzer = Analyzer::new(Some(StubGenerator::answering(&answer)));
        let article = analyzer.analyze(pending(), "Body text", "Center").await;

        assert_eq!(article.processing_status, ProcessingStatus::Failed);
        assert_eq!(article.bias_label, BiasLabel::NotAvailable);
    }

    #[tokio::test]
    async fn test_transport_error_fails() {
        let analyzer = Analyzer::new(Some(StubGenerator::failing()));
        let article = analyzer.analyze(pending(), "Body text", "Center").await;
        assert_eq!(article.processing_status, ProcessingStatus::Failed);
        assert_eq!(article.summary, "Feed summary");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_with_placeholder() {
        let analyzer: Analyzer<StubGenerator> = Analyzer::new(None);
        assert!(analyzer.generator().is_none());

        let article = analyzer.analyze(pending(), "Body text", "Center").await;
        assert_eq!(article.processing_status, ProcessingStatus::Failed);
        assert_eq!(article.summary, NO_KEY_PLACEHOLDER);
        assert_eq!(article.tldr_summary.as_deref(), Some(NO_KEY_PLACEHOLDER));
        assert_eq!(article.detailed_summary.as_deref(), Some(NO_KEY_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_fenced_answer_and_tag_merge() {
        let answer = r#"```json
{"tldr":"t","detailed_summary":"d","bias_label":"Lean Right","topic_tags":["International","Trade","Trade"],"keywords":["EU","EU","Tariffs"]}
```"#;
        let analyzer = Analyzer::new(Some(StubGenerator::answering(answer)));
        let article = analyzer.analyze(pending(), "Body text", "Center").await;

        assert_eq!(article.processing_status, ProcessingStatus::Processed);
        assert_eq!(article.headline, "Original headline");
        assert_eq!(article.bias_label, BiasLabel::LeanRight);
        assert_eq!(article.topic_tags, vec!["International", "Trade"]);
        assert_eq!(article.keywords, vec!["EU", "Tariffs"]);
    }

    #[tokio::test]
    async fn test_prompt_carries_context_and_truncates_text() {
        let stub = StubGenerator::answering(VALID_ANSWER);
        let analyzer = Analyzer::new(Some(stub));
        let text = "é".repeat(MAX_PROMPT_CHARS + 100);
        analyzer.analyze(pending(), &text, "Center").await;

        let prompts = analyzer.generator.as_ref().unwrap().prompts.lock().unwrap();
        let prompt = &prompts[0];
        assert!(prompt.contains("Source domain: reuters.com"));
        assert!(prompt.contains("baseline bias of this source: Center"));
        assert_eq!(prompt.matches('é').count(), MAX_PROMPT_CHARS);
    }

    #[test]
    fn test_decode_requires_summary_fields() {
        assert!(decode_analysis(r#"{"bias_label":"Center"}"#).is_err());
        let payload = decode_analysis(VALID_ANSWER).unwrap();
        assert_eq!(payload.headline.as_deref(), Some("H"));
    }
}
