use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::loose_text;

/// Trait for hosted language-model providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "mock").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    ///
    /// Non-2xx replies should be reported as [`crate::UpstreamError`] so the
    /// status survives into the HTTP response.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// An image inlined into a model request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Images sent alongside `user_prompt`. Empty for text-only passes.
    pub images: Vec<ImageAttachment>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// Trait for web-search providers used to gather pricing evidence.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    /// Ask the provider for its slower, more thorough search mode.
    pub deep: bool,
}

/// One raw result from a search provider.
///
/// Null or non-string fields decode as empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default, deserialize_with = "loose_text")]
    pub title: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub url: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_fields_in_a_hit_decode_as_empty() {
        let hit: SearchHit = serde_json::from_value(json!({
            "title": null,
            "url": "https://www.vivino.com/w/1",
            "content": 42
        }))
        .unwrap();
        assert_eq!(hit.title, "");
        assert_eq!(hit.url, "https://www.vivino.com/w/1");
        assert_eq!(hit.content, "42");
    }
}
