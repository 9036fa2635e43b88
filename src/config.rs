use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::seo::LinkPolicy;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "seo-engine.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub link_policy: LinkPolicyDefaults,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai`, `anthropic`, or empty for template-only generation.
    pub provider: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            provider: String::new(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: String::new(),
            anthropic_api_key: String::new(),
            anthropic_model: "claude-3-5-sonnet-20240620".to_string(),
        }
    }
}

/// Server-side defaults used when a request's `brand.link_policy` omits a field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkPolicyDefaults {
    pub max_internal: i64,
    pub utm: bool,
    pub utm_campaign: Option<String>,
}

impl Default for LinkPolicyDefaults {
    fn default() -> Self {
        let policy = LinkPolicy::default();
        LinkPolicyDefaults {
            max_internal: policy.cap,
            utm: policy.utm,
            utm_campaign: policy.utm_campaign,
        }
    }
}

impl Config {
    /// Load the TOML file named by `SEO_ENGINE_CONFIG` (or `seo-engine.toml`
    /// if present), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SEO_ENGINE_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let p = PathBuf::from(CONFIG_FILE);
                p.exists().then_some(p)
            });

        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from environment variables. Empty values are ignored.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 6] = [
            ("LLM_PROVIDER", &mut self.llm.provider),
            ("OPENAI_API_KEY", &mut self.llm.openai_api_key),
            ("LLM_OPENAI_MODEL", &mut self.llm.openai_model),
            ("LLM_OPENAI_BASE_URL", &mut self.llm.openai_base_url),
            ("ANTHROPIC_API_KEY", &mut self.llm.anthropic_api_key),
            ("LLM_ANTHROPIC_MODEL", &mut self.llm.anthropic_model),
        ];
        for (key, field) in overrides {
            if let Some(v) = get(key).filter(|v| !v.trim().is_empty()) {
                *field = v.trim().to_string();
            }
        }
        self.llm.provider = self.llm.provider.to_lowercase();
    }
}
