//! SerpAPI Client
//!
//! Google web search through SerpAPI. Organic results are mapped onto
//! [`SearchHit`]; knowledge-graph descriptions and answer boxes are folded in
//! first because they tend to carry the crisp facts and figures a slide needs.

use async_trait::async_trait;
use serde_json::Value;
use serpapi_search_rust::serp_api_search::SerpApiSearch;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{SearchError, SearchHit, SearchProvider};
use crate::config::SearchConfig;

pub struct SerpApiClient {
    api_key: String,
    max_results: usize,
}

impl SerpApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            max_results: 5,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        if config.serpapi_key.is_empty() {
            return None;
        }
        Some(Self::new(config.serpapi_key.clone()).with_max_results(config.max_results))
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.max(1);
        self
    }

    fn parse_results(&self, results: &Value) -> Result<Vec<SearchHit>, SearchError> {
        let mut hits = Vec::new();

        if let Some(answer) = results.get("answer_box") {
            let snippet = answer
                .get("answer")
                .or_else(|| answer.get("snippet"))
                .and_then(|v| v.as_str());
            if let Some(snippet) = snippet {
                hits.push(SearchHit {
                    title: str_field(answer, "title").unwrap_or_else(|| "Answer".to_string()),
                    snippet: snippet.to_string(),
                    url: str_field(answer, "link").unwrap_or_default(),
                });
            }
        }

        if let Some(graph) = results.get("knowledge_graph") {
            if let Some(description) = str_field(graph, "description") {
                hits.push(SearchHit {
                    title: str_field(graph, "title").unwrap_or_else(|| "Knowledge graph".to_string()),
                    snippet: description,
                    url: str_field(graph, "website").unwrap_or_default(),
                });
            }
        }

        let organic = results
            .get("organic_results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SearchError::ParseError("Expected array of organic results".to_string()))?;

        for result in organic {
            if hits.len() >= self.max_results {
                break;
            }
            hits.push(SearchHit {
                title: str_field(result, "title").unwrap_or_else(|| "Untitled".to_string()),
                snippet: str_field(result, "snippet").unwrap_or_default(),
                url: str_field(result, "link").unwrap_or_default(),
            });
        }

        if hits.is_empty() {
            return Err(SearchError::NoResults);
        }
        hits.truncate(self.max_results);
        Ok(hits)
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching Google via SerpAPI");

        let mut params = HashMap::<String, String>::new();
        params.insert("engine".to_string(), "google".to_string());
        params.insert("q".to_string(), query.to_string());
        params.insert("hl".to_string(), "en".to_string());
        params.insert("num".to_string(), self.max_results.to_string());

        let search = SerpApiSearch::google(params, self.api_key.clone());
        let results = search
            .json()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        debug!("Raw SerpAPI response received");

        let hits = self.parse_results(&results)?;
        info!(count = hits.len(), "SerpAPI search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_results_prefers_answer_box_then_organic() {
        let client = SerpApiClient::new("key".to_string()).with_max_results(3);
        let raw = json!({
            "answer_box": {"title": "Remote work share", "answer": "28% of workdays are remote"},
            "organic_results": [
                {"title": "Study A", "snippet": "Productivity up 13%", "link": "https://a.example"},
                {"title": "Study B", "snippet": "Hybrid is common", "link": "https://b.example"},
                {"title": "Study C", "snippet": "ignored", "link": "https://c.example"}
            ]
        });

        let hits = client.parse_results(&raw).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].snippet, "28% of workdays are remote");
        assert_eq!(hits[1].title, "Study A");
        assert_eq!(hits[2].url, "https://b.example");
    }

    #[test]
    fn test_parse_results_without_organic_is_parse_error() {
        let client = SerpApiClient::new("key".to_string());
        assert!(matches!(
            client.parse_results(&json!({"search_metadata": {}})),
            Err(SearchError::ParseError(_))
        ));
        assert!(matches!(
            client.parse_results(&json!({"organic_results": []})),
            Err(SearchError::NoResults)
        ));
    }
}
