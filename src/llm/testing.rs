// Scripted in-memory adapter for driving agents in unit tests

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use std::sync::Mutex;

/// Replies with the first rule whose needle appears in the user prompt.
/// Unmatched prompts get `{}` so every agent falls back to its defaults.
pub struct ScriptedAdapter {
    rules: Vec<(String, String)>,
    failing_needles: Vec<String>,
    usage: u32,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            failing_needles: Vec::new(),
            usage: 100,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rule(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), reply.to_string()));
        self
    }

    /// Calls whose prompt contains `needle` fail like a provider outage
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing_needles.push(needle.to_string());
        self
    }

    pub fn with_usage(mut self, tokens: u32) -> Self {
        self.usage = tokens;
        self
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn prompt_of(request: &LLMRequest) -> String {
        request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of recorded prompts containing `needle`
    pub fn count_matching(&self, needle: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| Self::prompt_of(r).contains(needle))
            .count()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let prompt = Self::prompt_of(request);

        if self.failing_needles.iter().any(|n| prompt.contains(n.as_str())) {
            return Err(AppError::LLMApi("scripted provider outage".to_string()));
        }

        let content = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| "{}".to_string());

        Ok(LLMResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: TokenUsage {
                prompt_tokens: self.usage / 2,
                completion_tokens: self.usage - self.usage / 2,
                total_tokens: self.usage,
            },
        })
    }
}
