//! Evidence items: search hits trimmed down for the grounding prompt.

use serde::{Deserialize, Serialize};

use vinoscope_core::{RecognizedLabel, SearchHit, Source};

/// Retailers and price aggregators the search is restricted to.
pub const RETAILER_DOMAINS: &[&str] = &[
    "wine-searcher.com",
    "vivino.com",
    "wine.com",
    "totalwine.com",
    "klwines.com",
    "bbr.com",
];

/// Results requested from the search provider.
pub const MAX_SEARCH_RESULTS: usize = 6;
pub const MAX_TITLE_CHARS: usize = 140;
pub const MAX_SNIPPET_CHARS: usize = 500;

/// One piece of web evidence handed to the grounding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl Evidence {
    /// Normalize a raw hit. Hits without a URL cannot be cited and are dropped.
    pub fn from_hit(hit: SearchHit) -> Option<Self> {
        let url = hit.url.trim().to_string();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            title: truncate_chars(hit.title.trim(), MAX_TITLE_CHARS),
            url,
            snippet: truncate_chars(hit.content.trim(), MAX_SNIPPET_CHARS),
        })
    }

    pub fn to_source(&self) -> Source {
        Source {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Normalize a batch of hits, keeping provider order.
pub fn normalize_hits(hits: Vec<SearchHit>) -> Vec<Evidence> {
    hits.into_iter().filter_map(Evidence::from_hit).collect()
}

/// Build the price-intent query for a recognized label.
///
/// Returns `None` when the label has nothing to search for.
pub fn build_price_query(label: &RecognizedLabel) -> Option<String> {
    let fields = label.identifying_fields();
    if fields.is_empty() {
        return None;
    }
    let sites = RETAILER_DOMAINS
        .iter()
        .map(|d| format!("site:{d}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    Some(format!("{} price ({sites})", fields.join(" ")))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
