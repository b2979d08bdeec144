use anyhow::{Result, anyhow};
use std::env;

const DEFAULT_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models/";
const DEFAULT_HOSTED_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WEB_BIND_ADDR: &str = "127.0.0.1:5000";

pub const INFERENCE_TOKEN_VAR: &str = "HUGGINGFACE_API_KEY";
pub const HOSTED_KEY_VAR: &str = "GROQ_API_KEY";
const HOSTED_KEY_FALLBACK_VAR: &str = "API_KEY";

#[derive(Clone)]
pub struct Config {
    pub inference_token: String,
    pub inference_base_url: String,
    pub hosted_api_key: String,
    pub hosted_base_url: String,
    pub ollama_base_url: String,
    pub model_timeout_secs: u64,
    pub web_bind_addr: String,
}

// Secrets stay out of Debug output so the config can be logged.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("inference_token", &"<redacted>")
            .field("inference_base_url", &self.inference_base_url)
            .field("hosted_api_key", &"<redacted>")
            .field("hosted_base_url", &self.hosted_base_url)
            .field("ollama_base_url", &self.ollama_base_url)
            .field("model_timeout_secs", &self.model_timeout_secs)
            .field("web_bind_addr", &self.web_bind_addr)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Result<Self> {
        let inference_token = parse_secret(get_var(INFERENCE_TOKEN_VAR).as_deref())
            .ok_or_else(|| missing_secret(INFERENCE_TOKEN_VAR))?;
        let hosted_api_key = parse_secret(get_var(HOSTED_KEY_VAR).as_deref())
            .or_else(|| parse_secret(get_var(HOSTED_KEY_FALLBACK_VAR).as_deref()))
            .ok_or_else(|| missing_secret(HOSTED_KEY_VAR))?;

        Ok(Self {
            inference_token,
            inference_base_url: inference_base_url(get_var("INFERENCE_BASE_URL")),
            hosted_api_key,
            hosted_base_url: get_var("HOSTED_BASE_URL")
                .unwrap_or_else(|| DEFAULT_HOSTED_BASE_URL.to_string()),
            ollama_base_url: get_var("OLLAMA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            model_timeout_secs: parse_model_timeout_secs(
                get_var("MODEL_TIMEOUT_SECS").as_deref(),
            ),
            web_bind_addr: get_var("WEB_BIND_ADDR")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_WEB_BIND_ADDR.to_string()),
        })
    }
}

fn missing_secret(var: &str) -> anyhow::Error {
    anyhow!(
        "{} is not set. Add it to the environment or a .env file before starting.",
        var
    )
}

/// Model paths are appended directly to this URL, so it always ends in '/'.
fn inference_base_url(raw: Option<String>) -> String {
    let mut url = raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_INFERENCE_BASE_URL.to_string());
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn parse_secret(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_model_timeout_secs(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_MODEL_TIMEOUT_SECS)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        inference_token: "hf-test".to_string(),
        inference_base_url: DEFAULT_INFERENCE_BASE_URL.to_string(),
        hosted_api_key: "groq-test".to_string(),
        hosted_base_url: DEFAULT_HOSTED_BASE_URL.to_string(),
        ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
        web_bind_addr: DEFAULT_WEB_BIND_ADDR.to_string(),
    }
}
