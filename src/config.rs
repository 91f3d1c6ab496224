use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::models::QualityLevel;
use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub thinking: ThinkingConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub model: String,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: String,
    pub groq_api_key: String,
    pub openrouter_api_key: String,
    pub timeout_secs: u64,
}

impl LLMConfig {
    /// API key for the configured provider, if one is set
    pub fn active_api_key(&self) -> Option<String> {
        let key = match LLMProvider::from_id(&self.provider)? {
            LLMProvider::OpenAI => &self.openai_api_key,
            LLMProvider::Anthropic => &self.anthropic_api_key,
            LLMProvider::Groq => &self.groq_api_key,
            LLMProvider::OpenRouter => &self.openrouter_api_key,
        };
        if key.is_empty() {
            None
        } else {
            Some(key.clone())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub serpapi_key: String,
    pub tavily_api_key: String,
    pub brave_api_key: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThinkingConfig {
    pub default_quality: QualityLevel,
    pub enable_research: bool,
    pub job_max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub projects_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let default_quality = env::var("DEFAULT_QUALITY_LEVEL").unwrap_or_else(|_| "standard".to_string());

        Ok(Self {
            llm: LLMConfig {
                provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                openai_base_url: env::var("OPENAI_BASE_URL").ok(),
                anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
                groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
                openrouter_api_key: env::var("OPENROUTER_API_KEY").unwrap_or_default(),
                timeout_secs: env::var("LLM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()?,
            },
            search: SearchConfig {
                serpapi_key: env::var("SERPAPI_API_KEY").unwrap_or_default(),
                tavily_api_key: env::var("TAVILY_API_KEY").unwrap_or_default(),
                brave_api_key: env::var("BRAVE_API_KEY").unwrap_or_default(),
                max_results: env::var("SEARCH_MAX_RESULTS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
            },
            thinking: ThinkingConfig {
                default_quality: QualityLevel::from_id(&default_quality).ok_or_else(|| {
                    anyhow::anyhow!("Unknown DEFAULT_QUALITY_LEVEL: {}", default_quality)
                })?,
                enable_research: env::var("ENABLE_RESEARCH")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
                job_max_attempts: env::var("JOB_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()?,
            },
            logging: LoggingConfig {
                filter: env::var("LOG_FILTER").unwrap_or_else(|_| "oxidized_deck=info".to_string()),
                log_dir: env::var("LOG_DIR").ok().map(PathBuf::from),
            },
            storage: StorageConfig {
                projects_dir: env::var("PROJECTS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./projects")),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(provider: &str) -> LLMConfig {
        LLMConfig {
            provider: provider.to_string(),
            model: "gpt-4o-mini".to_string(),
            openai_api_key: "sk-openai".to_string(),
            openai_base_url: None,
            anthropic_api_key: String::new(),
            groq_api_key: "gsk-groq".to_string(),
            openrouter_api_key: String::new(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_active_api_key_follows_provider() {
        assert_eq!(llm_config("openai").active_api_key(), Some("sk-openai".to_string()));
        assert_eq!(llm_config("groq").active_api_key(), Some("gsk-groq".to_string()));
        assert_eq!(llm_config("anthropic").active_api_key(), None);
        assert_eq!(llm_config("unknown").active_api_key(), None);
    }
}
