use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::clients::llm::{LlmProvider, LlmSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub llm: LlmSettings,
    pub max_resolution_retries: u32,
    pub request_explanations: bool,
    /// Idle games older than this are dropped by the sweeper.
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider: LlmProvider = parse_or(&lookup, "LLM_PROVIDER", LlmProvider::OpenAi)?;
        let llm = LlmSettings {
            provider,
            api_key: lookup("LLM_API_KEY").filter(|k| !k.trim().is_empty()),
            model: lookup("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            base_url: lookup("LLM_BASE_URL")
                .unwrap_or_else(|| provider.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", 512)?,
            timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 30)?),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8000)?,
            llm,
            max_resolution_retries: parse_or(&lookup, "MAX_RESOLUTION_RETRIES", 1)?,
            request_explanations: parse_or(&lookup, "REQUEST_EXPLANATIONS", true)?,
            session_ttl: Duration::from_secs(parse_or(&lookup, "SESSION_TTL_SECS", 86_400)?),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}
