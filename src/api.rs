//! Text-generation service client.
//!
//! This module provides the interface the analyzer and the query translator
//! use to talk to a generative model, plus a client for the Gemini
//! `generateContent` REST endpoint.
//!
//! # Architecture
//!
//! - [`TextGenerator`]: core trait, one prompt in, raw model text out
//! - [`GeminiClient`]: HTTP implementation, constructed once at startup and
//!   handed to every component that needs it
//!
//! # Failure Policy
//!
//! The client makes exactly one attempt per call. A failed analysis marks the
//! article `Failed` and the backfill pass picks it up later, so retrying here
//! would only hold a concurrency slot longer. Callers bound each call with
//! their own timeout; dropping the returned future abandons the request.

use crate::error::AnalysisError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Trait for async text generation.
///
/// Implementors send a prompt to a model and return its raw text answer.
/// Parsing that answer is the caller's job.
pub trait TextGenerator: Send + Sync {
    /// Send `prompt` to the model and return the generated text.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, AnalysisError> {
        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(AnalysisError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client for `model`, authenticated with `api_key`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = GeminiClient::new(key, "gemini-1.5-flash", "https://generativelanguage.googleapis.com");
    /// ```
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client only when a non-empty credential is available.
    pub fn from_key(api_key: Option<&str>, model: &str, base_url: &str) -> Option<Self> {
        api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| Self::new(k, model, base_url))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl TextGenerator for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let t0 = Instant::now();
        let body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis(),
                status = status.as_u16(),
                "Text generation request rejected"
            );
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: crate::utils::truncate_for_log(&body, 300),
            });
        }

        let text = response.json::<GenerateResponse>().await?.into_text()?;
        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            chars = text.len(),
            "Text generation succeeded"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 12}
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_empty_response_is_an_error() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(matches!(response.into_text(), Err(AnalysisError::EmptyResponse)));
    }

    #[test]
    fn test_from_key_requires_non_empty_key() {
        let base = "https://generativelanguage.googleapis.com/";
        assert!(GeminiClient::from_key(None, "m", base).is_none());
        assert!(GeminiClient::from_key(Some("  "), "m", base).is_none());

        let client = GeminiClient::from_key(Some("key"), "gemini-1.5-flash", base).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("key\""));
    }
}
