// Tavily search client
// POST /search with the key in the body; results carry title, url, content.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{SearchError, SearchHit, SearchProvider};
use crate::config::SearchConfig;

pub const TAVILY_API_BASE: &str = "https://api.tavily.com";

pub struct TavilyClient {
    client: Client,
    api_key: String,
    api_base: String,
    max_results: usize,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_api_base(api_key, TAVILY_API_BASE)
    }

    pub fn new_with_api_base(api_key: String, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            max_results: 5,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        if config.tavily_api_key.is_empty() {
            return None;
        }
        Some(Self::new(config.tavily_api_key.clone()).with_max_results(config.max_results))
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.max(1);
        self
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching via Tavily");

        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
            search_depth: "basic",
        };

        let response = self
            .client
            .post(format!("{}/search", self.api_base))
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!("Tavily returned {}: {}", status, text)));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        let hits: Vec<SearchHit> = parsed
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| SearchHit {
                title: if r.title.is_empty() { "Untitled".to_string() } else { r.title },
                snippet: r.content,
                url: r.url,
            })
            .collect();

        if hits.is_empty() {
            return Err(SearchError::NoResults);
        }

        info!(count = hits.len(), "Tavily search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_maps_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"api_key":"tv-key","query":"remote work statistics"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":[
                    {"title":"Remote work report","url":"https://r.example","content":"58% of workers can work remotely"},
                    {"title":"","url":"https://s.example","content":"Second"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = TavilyClient::new_with_api_base("tv-key".to_string(), &server.url());
        let hits = client.search("remote work statistics").await.unwrap();

        mock.assert_async().await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].snippet, "58% of workers can work remotely");
        assert_eq!(hits[1].title, "Untitled");
    }

    #[tokio::test]
    async fn test_empty_results_is_no_results() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(200)
            .with_body(r#"{"results":[]}"#)
            .create_async()
            .await;

        let client = TavilyClient::new_with_api_base("tv-key".to_string(), &server.url());
        assert!(matches!(client.search("nothing").await, Err(SearchError::NoResults)));
    }

    #[tokio::test]
    async fn test_http_error_is_request_failed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = TavilyClient::new_with_api_base("bad".to_string(), &server.url());
        assert!(matches!(client.search("q").await, Err(SearchError::RequestFailed(_))));
    }
}
