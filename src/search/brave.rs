// Brave Search client
// GET /res/v1/web/search, key in the X-Subscription-Token header.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{SearchError, SearchHit, SearchProvider};
use crate::config::SearchConfig;

pub const BRAVE_API_BASE: &str = "https://api.search.brave.com";

pub struct BraveClient {
    client: Client,
    api_key: String,
    api_base: String,
    max_results: usize,
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

impl BraveClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_api_base(api_key, BRAVE_API_BASE)
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
        if config.brave_api_key.is_empty() {
            return None;
        }
        Some(Self::new(config.brave_api_key.clone()).with_max_results(config.max_results))
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.clamp(1, 20);
        self
    }
}

#[async_trait]
impl SearchProvider for BraveClient {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching via Brave");

        let count = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/res/v1/web/search", self.api_base))
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!("Brave returned {}: {}", status, text)));
        }

        let parsed: BraveResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        let hits: Vec<SearchHit> = parsed
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(self.max_results)
            .map(|r| SearchHit {
                title: r.title,
                snippet: r.description,
                url: r.url,
            })
            .collect();

        if hits.is_empty() {
            return Err(SearchError::NoResults);
        }

        info!(count = hits.len(), "Brave search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_search_sends_token_and_maps_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/res/v1/web/search")
            .match_header("x-subscription-token", "brave-key")
            .match_query(Matcher::UrlEncoded("q".into(), "hybrid work".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"web":{"results":[
                    {"title":"Hybrid work trends","url":"https://h.example","description":"Most firms now run hybrid"}
                ]}}"#,
            )
            .create_async()
            .await;

        let client = BraveClient::new_with_api_base("brave-key".to_string(), &server.url());
        let hits = client.search("hybrid work").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            hits,
            vec![SearchHit {
                title: "Hybrid work trends".to_string(),
                snippet: "Most firms now run hybrid".to_string(),
                url: "https://h.example".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_web_section_is_no_results() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/res/v1/web/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"query":{"original":"x"}}"#)
            .create_async()
            .await;

        let client = BraveClient::new_with_api_base("brave-key".to_string(), &server.url());
        assert!(matches!(client.search("x").await, Err(SearchError::NoResults)));
    }
}
