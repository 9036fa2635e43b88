pub mod anthropic;
pub mod json;
pub mod openai;
pub mod prompts;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

pub use json::parse_json_from_text;

// ── Types ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct AiError(pub String);

pub const DEFAULT_SYSTEM: &str = "You are a helpful, accurate writing model.";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A text-completion backend.
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError>;
}

// ── Provider selection ────────────────────────────────

/// Build the configured provider. `Ok(None)` means no provider is selected
/// and callers should use their template fallbacks.
pub fn provider_from_config(cfg: &LlmConfig) -> Result<Option<Box<dyn LlmProvider>>, AiError> {
    match cfg.provider.trim() {
        "openai" => {
            if cfg.openai_api_key.is_empty() {
                return Err(AiError("OPENAI_API_KEY not set".into()));
            }
            Ok(Some(Box::new(openai::OpenAiProvider::new(
                &cfg.openai_api_key,
                &cfg.openai_model,
                &cfg.openai_base_url,
            ))))
        }
        "anthropic" => {
            if cfg.anthropic_api_key.is_empty() {
                return Err(AiError("ANTHROPIC_API_KEY not set".into()));
            }
            Ok(Some(Box::new(anthropic::AnthropicProvider::new(
                &cfg.anthropic_api_key,
                &cfg.anthropic_model,
            ))))
        }
        "" => Ok(None),
        other => {
            log::warn!("Unknown LLM provider '{}', using templates", other);
            Ok(None)
        }
    }
}

fn http_client() -> Result<reqwest::blocking::Client, AiError> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AiError(format!("HTTP client error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_provider_selected() {
        assert!(provider_from_config(&LlmConfig::default()).unwrap().is_none());
    }

    #[test]
    fn unknown_provider_falls_back() {
        let cfg = LlmConfig {
            provider: "ollama".into(),
            ..LlmConfig::default()
        };
        assert!(provider_from_config(&cfg).unwrap().is_none());
    }

    #[test]
    fn missing_key_is_an_error() {
        let cfg = LlmConfig {
            provider: "openai".into(),
            ..LlmConfig::default()
        };
        let err = provider_from_config(&cfg).err().unwrap();
        assert_eq!(err.0, "OPENAI_API_KEY not set");
    }

    #[test]
    fn selects_anthropic() {
        let cfg = LlmConfig {
            provider: "anthropic".into(),
            anthropic_api_key: "sk-test".into(),
            ..LlmConfig::default()
        };
        let p = provider_from_config(&cfg).unwrap().unwrap();
        assert_eq!(p.name(), "anthropic");
    }
}
