//! Web search for pricing evidence.
//!
//! Backed by the Tavily search API. One call per analysis; results are
//! never cached on either side.
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use vinoscope_core::{SearchHit, SearchProvider, SearchRequest, UpstreamError};

const PROVIDER: &str = "tavily";

/// Tavily web-search provider.
pub struct TavilySearch {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavilySearch {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.tavily.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<Value>,
}

impl TavilyResponse {
    /// Decode each result on its own so one malformed entry only loses itself.
    fn into_hits(self) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let start = Instant::now();
        let body = TavilyRequest {
            query: &request.query,
            max_results: request.max_results,
            search_depth: if request.deep { "advanced" } else { "basic" },
            include_answer: false,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Cache-Control", "no-store")
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(PROVIDER, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::http(PROVIDER, status.as_u16(), error_body).into());
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::http(PROVIDER, status.as_u16(), format!("malformed response: {e}")))?;

        let hits = parsed.into_hits();
        debug!(
            hits = hits.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request() -> SearchRequest {
        SearchRequest {
            query: "Ridge Monte Bello 2019 price".into(),
            max_results: 6,
            deep: true,
        }
    }

    #[tokio::test]
    async fn sends_deep_search_and_parses_results() {
        let router = Router::new().route(
            "/search",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "results": [{
                        "title": format!("{} / {}", body["search_depth"].as_str().unwrap_or(""), body["max_results"]),
                        "url": "https://www.vivino.com/ridge",
                        "content": body["query"],
                        "score": 0.92
                    }]
                }))
            }),
        );
        let base = spawn(router).await;
        let search = TavilySearch::new(Client::new(), "tvly-test").with_base_url(base);

        let hits = search.search(&request()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "advanced / 6");
        assert_eq!(hits[0].content, "Ridge Monte Bello 2019 price");
    }

    #[tokio::test]
    async fn non_ok_status_is_an_upstream_error() {
        let router = Router::new().route(
            "/search",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn(router).await;
        let search = TavilySearch::new(Client::new(), "tvly-test").with_base_url(base);

        let err = search.search(&request()).await.unwrap_err();
        let upstream = err.downcast_ref::<UpstreamError>().unwrap();
        assert_eq!(upstream.status, Some(429));
        assert_eq!(upstream.message, "slow down");
    }

    #[tokio::test]
    async fn one_bad_result_does_not_discard_the_rest() {
        let router = Router::new().route(
            "/search",
            post(|| async {
                Json(json!({
                    "results": [
                        { "title": null, "url": "https://www.vivino.com/w/1", "content": "From $40" },
                        "garbage",
                        { "title": "K&L", "url": "https://www.klwines.com/p/2", "content": null }
                    ]
                }))
            }),
        );
        let base = spawn(router).await;
        let search = TavilySearch::new(Client::new(), "tvly-test").with_base_url(base);

        let hits = search.search(&request()).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "");
        assert_eq!(hits[0].url, "https://www.vivino.com/w/1");
        assert_eq!(hits[1].title, "K&L");
        assert_eq!(hits[1].content, "");
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let router = Router::new().route("/search", post(|| async { "<html>oops</html>" }));
        let base = spawn(router).await;
        let search = TavilySearch::new(Client::new(), "tvly-test").with_base_url(base);

        assert!(search.search(&request()).await.is_err());
    }
}
