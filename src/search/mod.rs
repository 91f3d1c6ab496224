//! Search Module
//!
//! Web search backends used by the research agent. Several providers are
//! interchangeable; the first one with a configured credential is used:
//!
//! 1. SerpAPI (Google engine)
//! 2. Tavily
//! 3. Brave Search
//!
//! With none configured, research falls back to a labelled placeholder result.

pub mod serpapi;
pub mod tavily;
pub mod brave;

pub use serpapi::SerpApiClient;
pub use tavily::TavilyClient;
pub use brave::BraveClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::SearchConfig;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search API key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),

    #[error("No results found for query")]
    NoResults,
}

/// One search result, normalised across providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logs and source labels
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

/// First configured provider wins
pub fn select_provider(config: &SearchConfig) -> Option<Arc<dyn SearchProvider>> {
    let provider: Option<Arc<dyn SearchProvider>> = if let Some(client) = SerpApiClient::from_config(config) {
        Some(Arc::new(client))
    } else if let Some(client) = TavilyClient::from_config(config) {
        Some(Arc::new(client))
    } else {
        BraveClient::from_config(config).map(|client| Arc::new(client) as Arc<dyn SearchProvider>)
    };

    match &provider {
        Some(p) => info!(provider = p.name(), "Search provider selected"),
        None => info!("No search provider configured"),
    }
    provider
}
