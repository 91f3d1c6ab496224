//! Research Agent
//!
//! Gathers supporting facts for the generator:
//! 1. the model proposes a couple of web queries,
//! 2. each query goes to the configured [`SearchProvider`],
//! 3. the model condenses the hits into a summary and data points.
//!
//! Research is an enrichment step. Every failure here is logged and
//! degraded to a fallback; [`ResearchAgent::research`] itself never fails.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{AgentSettings, Metered};
use crate::llm::structured::{lenient_string, lenient_string_list};
use crate::llm::{parse_or_default, LLM};
use crate::search::{SearchHit, SearchProvider};
use crate::utils::text::{bullet_list, truncate_chars};

/// Queries actually executed per session
pub const MAX_RESEARCH_QUERIES: usize = 2;

const RESEARCH_SYSTEM: &str = "You are a meticulous research assistant preparing material for a presentation. Prefer recent, concrete, verifiable facts. Respond with JSON only.";

/// Condensed research handed to the generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchFindings {
    pub queries: Vec<String>,
    pub summary: String,
    pub data_points: Vec<String>,
    pub sources: Vec<String>,
}

impl ResearchFindings {
    /// Reference text for slide prompts
    pub fn to_prompt_context(&self) -> String {
        let mut output = format!("Research summary:\n{}\n", self.summary);
        if !self.data_points.is_empty() {
            output.push_str("\nKey data points:\n");
            output.push_str(&bullet_list(&self.data_points, ""));
            output.push('\n');
        }
        if !self.sources.is_empty() {
            output.push_str("\nSources:\n");
            output.push_str(&bullet_list(&self.sources, ""));
            output.push('\n');
        }
        output
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQueries {
    #[serde(deserialize_with = "lenient_string_list")]
    queries: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawFindings {
    #[serde(deserialize_with = "lenient_string")]
    summary: Option<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    data_points: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    sources: Vec<String>,
}

pub struct ResearchAgent {
    llm: Arc<LLM>,
    settings: AgentSettings,
    provider: Option<Arc<dyn SearchProvider>>,
}

impl ResearchAgent {
    pub fn new(llm: Arc<LLM>, settings: AgentSettings, provider: Option<Arc<dyn SearchProvider>>) -> Self {
        Self {
            llm,
            settings,
            provider,
        }
    }

    pub async fn research(&self, topic: &str) -> Metered<ResearchFindings> {
        info!(topic = %topic, provider = ?self.provider.as_ref().map(|p| p.name()), "Starting research");

        let mut tokens = 0u32;

        let queries = self.propose_queries(topic, &mut tokens).await;
        let hits = self.run_queries(&queries).await;
        let findings = self.synthesize(topic, queries, &hits, &mut tokens).await;

        info!(
            hits = hits.len(),
            data_points = findings.data_points.len(),
            tokens,
            "Research complete"
        );

        Metered::new(findings, tokens)
    }

    async fn propose_queries(&self, topic: &str, tokens: &mut u32) -> Vec<String> {
        let prompt = Self::create_query_prompt(topic);
        let options = self.settings.options(0.3, 512, RESEARCH_SYSTEM);

        let proposed = match self.llm.complete(&prompt, &options).await {
            Ok(completion) => {
                *tokens = tokens.saturating_add(completion.tokens_used);
                parse_or_default(&completion.text, RawQueries::default()).queries
            }
            Err(e) => {
                warn!(error = %e, "Query proposal failed, searching the topic directly");
                Vec::new()
            }
        };

        let mut queries: Vec<String> = proposed
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(MAX_RESEARCH_QUERIES)
            .collect();
        if queries.is_empty() {
            queries.push(topic.to_string());
        }
        queries
    }

    async fn run_queries(&self, queries: &[String]) -> Vec<SearchHit> {
        let Some(provider) = &self.provider else {
            warn!("No search provider configured, using placeholder research");
            return vec![Self::placeholder_hit(&queries.join("; "))];
        };

        let mut hits = Vec::new();
        for query in queries {
            match provider.search(query).await {
                Ok(found) => hits.extend(found),
                Err(e) => warn!(error = %e, query = %query, provider = provider.name(), "Search failed, skipping query"),
            }
        }
        hits
    }

    fn placeholder_hit(query: &str) -> SearchHit {
        SearchHit {
            title: "Placeholder research (no search provider configured)".to_string(),
            snippet: format!(
                "Live web search is unavailable. Rely on well-established general knowledge about: {}",
                query
            ),
            url: String::new(),
        }
    }

    async fn synthesize(
        &self,
        topic: &str,
        queries: Vec<String>,
        hits: &[SearchHit],
        tokens: &mut u32,
    ) -> ResearchFindings {
        let fallback = Self::fallback_findings(queries.clone(), hits);
        if hits.is_empty() {
            return fallback;
        }

        let prompt = Self::create_synthesis_prompt(topic, hits);
        let options = self.settings.options(0.3, 1024, RESEARCH_SYSTEM);

        let raw = match self.llm.complete(&prompt, &options).await {
            Ok(completion) => {
                *tokens = tokens.saturating_add(completion.tokens_used);
                parse_or_default(&completion.text, RawFindings::default())
            }
            Err(e) => {
                warn!(error = %e, "Research synthesis failed, using raw snippets");
                return fallback;
            }
        };

        match raw.summary {
            Some(summary) => ResearchFindings {
                queries,
                summary,
                data_points: raw.data_points,
                sources: if raw.sources.is_empty() {
                    fallback.sources
                } else {
                    raw.sources
                },
            },
            None => fallback,
        }
    }

    /// Summary stitched together from the snippets themselves
    fn fallback_findings(queries: Vec<String>, hits: &[SearchHit]) -> ResearchFindings {
        let summary = if hits.is_empty() {
            "No research results were found.".to_string()
        } else {
            hits.iter()
                .filter(|h| !h.snippet.is_empty())
                .map(|h| format!("{}: {}", h.title, h.snippet))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let sources = hits
            .iter()
            .filter(|h| !h.url.is_empty())
            .map(|h| format!("{} ({})", h.title, h.url))
            .collect();

        ResearchFindings {
            queries,
            summary,
            data_points: Vec::new(),
            sources,
        }
    }

    fn create_query_prompt(topic: &str) -> String {
        format!(r#"Propose web search queries that would surface current facts, statistics and examples for a presentation.

TOPIC:
{topic}

OUTPUT FORMAT (respond with ONLY valid JSON):
{{
  "queries": ["query 1", "query 2"]
}}"#,
            topic = topic
        )
    }

    fn create_synthesis_prompt(topic: &str, hits: &[SearchHit]) -> String {
        let results = hits
            .iter()
            .enumerate()
            .map(|(i, h)| {
                format!(
                    "[{}] {}\n{}\n{}",
                    i + 1,
                    h.title,
                    truncate_chars(&h.snippet, 400),
                    h.url
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(r#"Summarize these search results into research notes for a presentation about "{topic}".

SEARCH RESULTS:
{results}

OUTPUT FORMAT (respond with ONLY valid JSON):
{{
  "summary": "Two or three paragraphs of the most relevant findings",
  "dataPoints": ["Concrete statistic or fact with its figure"],
  "sources": ["Source title (url)"]
}}"#,
            topic = topic,
            results = results
        )
    }
}
