//! Natural-language search translation.
//!
//! A free-text query ("left-leaning coverage of the trade talks") is turned
//! into structured [`SearchFilters`] by one text-generation call. The filters
//! are then run against the store by [`Catalog::search`](crate::catalog::Catalog::search).

use crate::api::TextGenerator;
use crate::error::AnalysisError;
use crate::models::BiasLabel;
use crate::utils::{strip_code_fences, truncate_for_log};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Structured filters derived from a search query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub keywords: Vec<String>,
    pub topic_tags: Vec<String>,
    pub bias_label: Option<BiasLabel>,
}

impl SearchFilters {
    /// Filters that match the raw query text as a single keyword.
    pub fn literal(query: &str) -> Self {
        Self {
            keywords: vec![query.trim().to_string()],
            ..Self::default()
        }
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        r#"Translate the following news search query into structured filters.
Query: "{query}"

Available fields:
- keywords: list of names or key terms
- topic_tags: list of topics, e.g. "Politics", "International", "Sports"
- bias_label: one of "Left", "Lean Left", "Center", "Lean Right", "Right", or null

Respond with one JSON object and nothing else:
{{"keywords": ["..."], "topic_tags": ["..."], "bias_label": null}}
"#
    )
}

/// Decode the model's answer into filters.
pub fn decode_filters(raw: &str) -> Result<SearchFilters, AnalysisError> {
    Ok(serde_json::from_str(strip_code_fences(raw))?)
}

/// Turns free-text queries into [`SearchFilters`].
#[derive(Debug, Clone)]
pub struct QueryTranslator<G> {
    generator: Option<G>,
}

impl<G: TextGenerator> QueryTranslator<G> {
    pub fn new(generator: Option<G>) -> Self {
        Self { generator }
    }

    /// Without a credential the filters are empty. When the call or the
    /// decode fails, the query itself becomes the only keyword.
    #[instrument(level = "info", skip_all, fields(%query))]
    pub async fn translate(&self, query: &str) -> SearchFilters {
        let Some(generator) = &self.generator else {
            warn!("No text-generation credential configured; search filters are empty");
            return SearchFilters::default();
        };

        let result = match generator.generate(&build_prompt(query)).await {
            Ok(raw) => decode_filters(&raw).inspect_err(|_| {
                warn!(response = %truncate_for_log(&raw, 300), "Unparseable filter response");
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(filters) => {
                info!(
                    keywords = filters.keywords.len(),
                    topic_tags = filters.topic_tags.len(),
                    bias = ?filters.bias_label,
                    "Query translated"
                );
                filters
            }
            Err(e) => {
                warn!(error = %e, "Query translation failed; searching the raw query");
                SearchFilters::literal(query)
            }
        }
    }
}
