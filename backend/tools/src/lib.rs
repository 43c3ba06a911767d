//! Web tooling for Vinoscope: the search provider and evidence normalization.

pub mod evidence;
pub mod web;

pub use evidence::{build_price_query, normalize_hits, Evidence, MAX_SEARCH_RESULTS};
pub use web::TavilySearch;
