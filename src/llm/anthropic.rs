// Anthropic Messages API adapter
// API Reference: https://docs.anthropic.com/en/api/messages
//
// The Messages API has no response_format switch, so JSON mode is expressed
// as an extra system instruction.

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const JSON_ONLY_INSTRUCTION: &str = "Respond with a single valid JSON object and nothing else.";

pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    api_base: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

#[derive(Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: &str, timeout: Duration) -> AppResult<Self> {
        Self::new_with_api_base(api_key, ANTHROPIC_API_BASE, timeout)
    }

    pub fn new_with_api_base(api_key: &str, api_base: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn build_request(request: &LLMRequest) -> MessagesRequest {
        // System messages travel in the top-level field, never in the list
        let mut system_parts: Vec<String> = request.system_instruction.iter().cloned().collect();
        system_parts.extend(
            request
                .messages
                .iter()
                .filter(|m| m.role == "system")
                .map(|m| m.content.clone()),
        );
        if request.json_mode {
            system_parts.push(JSON_ONLY_INSTRUCTION.to_string());
        }

        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| AnthropicMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();

        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl LLMAdapter for AnthropicAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = format!("{}/messages", self.api_base);
        let body = Self::build_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<AnthropicErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "Anthropic API error ({}): {} ({})",
                    status, parsed.error.message, parsed.error.error_type
                )));
            }
            return Err(AppError::LLMApi(format!("Anthropic API error ({}): {}", status, error_text)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse Anthropic response: {}", e)))?;

        let content = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens.saturating_add(u.output_tokens),
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content,
            finish_reason: parsed.stop_reason.unwrap_or_else(|| "end_turn".to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LLMMessage;

    #[test]
    fn test_json_mode_goes_into_system_prompt() {
        let request = LLMRequest {
            model: "claude-3-5-haiku-latest".to_string(),
            messages: vec![LLMMessage::system("Be terse"), LLMMessage::user("Score this")],
            max_tokens: None,
            temperature: Some(0.3),
            system_instruction: Some("You are a critic".to_string()),
            json_mode: true,
        };

        let body = AnthropicAdapter::build_request(&request);
        let system = body.system.unwrap();
        assert!(system.starts_with("You are a critic"));
        assert!(system.contains("Be terse"));
        assert!(system.ends_with(JSON_ONLY_INSTRUCTION));
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_messages_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "ant-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(
                r#"{"content":[{"type":"text","text":"{\"score\": 8}"}],
                    "stop_reason":"end_turn","usage":{"input_tokens":30,"output_tokens":5}}"#,
            )
            .create_async()
            .await;

        let adapter = AnthropicAdapter::new_with_api_base("ant-key", &server.url(), Duration::from_secs(5)).unwrap();
        let request = LLMRequest {
            model: "claude-3-5-haiku-latest".to_string(),
            messages: vec![LLMMessage::user("Score this")],
            max_tokens: Some(100),
            temperature: None,
            system_instruction: None,
            json_mode: true,
        };
        let response = adapter.create_chat_completion(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "{\"score\": 8}");
        assert_eq!(response.usage.total_tokens, 35);
    }
}
