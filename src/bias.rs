//! Baseline bias lookup by source domain.
//!
//! The baseline is a prior handed to the model as context, not the final
//! label: the model may disagree after reading the article.

use crate::utils::domain_of;

/// Returned when neither an exact nor a substring match exists.
pub const UNKNOWN_BIAS: &str = "Unknown";

/// Known outlets and their commonly cited lean. Order matters for the
/// substring fallback: the first key contained in the domain wins.
pub const DOMAIN_BIAS: &[(&str, &str)] = &[
    ("cnn.com", "Lean Left"),
    ("msnbc.com", "Left"),
    ("huffpost.com", "Left"),
    ("nytimes.com", "Lean Left"),
    ("washingtonpost.com", "Lean Left"),
    ("theguardian.com", "Lean Left"),
    ("nbcnews.com", "Lean Left"),
    ("npr.org", "Lean Left"),
    ("aljazeera.com", "Lean Left"),
    ("eonline.com", "Lean Left"),
    ("bbc.co.uk", "Center"),
    ("bbc.com", "Center"),
    ("reuters.com", "Center"),
    ("apnews.com", "Center"),
    ("axios.com", "Center"),
    ("thehill.com", "Center"),
    ("espn.com", "Center"),
    ("wsj.com", "Lean Right"),
    ("nypost.com", "Lean Right"),
    ("washingtontimes.com", "Lean Right"),
    ("foxnews.com", "Right"),
    ("breitbart.com", "Right"),
    ("dailywire.com", "Right"),
];

/// Maps article URLs to a baseline bias label.
#[derive(Debug, Clone, Copy)]
pub struct BiasResolver {
    table: &'static [(&'static str, &'static str)],
}

impl Default for BiasResolver {
    fn default() -> Self {
        Self::new(DOMAIN_BIAS)
    }
}

impl BiasResolver {
    pub fn new(table: &'static [(&'static str, &'static str)]) -> Self {
        Self { table }
    }

    /// Baseline label for `url`: exact domain match first, then the first
    /// table key that is a substring of the domain (so `edition.cnn.com`
    /// resolves through `cnn.com`), else [`UNKNOWN_BIAS`].
    pub fn resolve(&self, url: &str) -> &'static str {
        let Some(domain) = domain_of(url) else {
            return UNKNOWN_BIAS;
        };

        self.table
            .iter()
            .find(|(key, _)| *key == domain)
            .or_else(|| self.table.iter().find(|(key, _)| domain.contains(key)))
            .map(|(_, label)| *label)
            .unwrap_or(UNKNOWN_BIAS)
    }
}
