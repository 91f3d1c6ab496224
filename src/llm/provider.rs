use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMMessage, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for LLM provider (renamed to avoid conflict with LLMProvider enum in types.rs)
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl LLMProviderConfig {
    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        let api_key = config.active_api_key().ok_or_else(|| {
            AppError::Config(format!("No API key configured for provider '{}'", config.provider))
        })?;
        Ok(Self {
            name: config.provider.clone(),
            api_key,
            base_url: config.openai_base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

/// Per-call generation options
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub system_instruction: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_mode: bool,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            temperature: 0.7,
            max_tokens: 2048,
            json_mode: true,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Raw model text plus the tokens charged for it
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

/// Rough token estimate for providers that report no usage
pub fn estimate_tokens(prompt: &str, completion: &str) -> u32 {
    let chars = prompt.chars().count().saturating_add(completion.chars().count());
    u32::try_from(chars / 4).unwrap_or(u32::MAX)
}

/// Model gateway shared by every agent of a session
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let kind = LLMProvider::from_id(&provider.name)
            .ok_or_else(|| AppError::Config(format!("Unsupported provider: {}", provider.name)))?;

        let adapter: Arc<dyn LLMAdapter> = match kind {
            LLMProvider::OpenAI => {
                let base = provider
                    .base_url
                    .as_deref()
                    .unwrap_or(crate::llm::openai::OPENAI_API_BASE);
                Arc::new(crate::llm::openai::OpenAIAdapter::new_with_api_base(
                    &provider.api_key,
                    base,
                    provider.timeout,
                )?)
            }
            LLMProvider::Anthropic => Arc::new(crate::llm::anthropic::AnthropicAdapter::new(
                &provider.api_key,
                provider.timeout,
            )?),
            LLMProvider::Groq => Arc::new(crate::llm::groq::GroqAdapter::new(&provider.api_key, provider.timeout)?),
            LLMProvider::OpenRouter => Arc::new(crate::llm::openrouter::OpenRouterAdapter::new(
                &provider.api_key,
                provider.timeout,
            )?),
        };

        Ok(Self {
            adapter,
            provider_name: provider.name,
        })
    }

    /// Wrap an existing adapter, e.g. a scripted one in tests
    pub fn from_adapter(adapter: Arc<dyn LLMAdapter>, provider_name: impl Into<String>) -> Self {
        Self {
            adapter,
            provider_name: provider_name.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    /// Single prompt in, text and token usage out
    pub async fn complete(&self, prompt: &str, options: &CompletionOptions) -> AppResult<Completion> {
        let request = LLMRequest {
            model: options.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: Some(options.max_tokens),
            temperature: Some(options.temperature),
            system_instruction: options.system_instruction.clone(),
            json_mode: options.json_mode,
        };

        let response = self.create_chat_completion(&request).await?;
        let tokens_used = if response.usage.total_tokens > 0 {
            response.usage.total_tokens
        } else {
            estimate_tokens(prompt, &response.content)
        };

        debug!(
            provider = %self.provider_name,
            model = %options.model,
            tokens = tokens_used,
            "Completion received"
        );

        Ok(Completion {
            text: response.content,
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedAdapter;
    use std::sync::Arc;

    #[test]
    fn test_unsupported_provider_is_config_error() {
        let result = LLM::new(LLMProviderConfig {
            name: "glm".to_string(),
            api_key: "k".to_string(),
            base_url: None,
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_complete_estimates_missing_usage() {
        let adapter = Arc::new(ScriptedAdapter::new().with_usage(0).rule("hello", "{\"ok\":true}"));
        let llm = LLM::from_adapter(adapter.clone(), "scripted");

        let completion = llm
            .complete("hello there, model", &CompletionOptions::new("test-model"))
            .await
            .unwrap();

        assert_eq!(completion.text, "{\"ok\":true}");
        assert_eq!(completion.tokens_used, estimate_tokens("hello there, model", "{\"ok\":true}"));
        assert_eq!(adapter.requests()[0].model, "test-model");
        assert!(adapter.requests()[0].json_mode);
    }
}
