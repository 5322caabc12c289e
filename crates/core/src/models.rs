//! # Themify Models
//!
//! Completion-service configuration shared by every agent. One model
//! deployment serves all seven agents; they differ only in prompt and tools.
//!
//! ## Environment
//!
//! - Azure OpenAI: `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_API_INSTANCE_NAME`
//!   (or `AZURE_OPENAI_API_BASE_PATH`), `AZURE_OPENAI_API_DEPLOYMENT_NAME`,
//!   `AZURE_OPENAI_API_VERSION`
//! - OpenAI-compatible fallback: `OPENAI_API_KEY`, optional `OPENAI_BASE_URL`
//!   and `THEMIFY_MODEL`
//! - `THEMIFY_MAX_RETRIES` (default 2)

use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BASE_MS: u64 = 500;

/// Supported completion providers. Both speak the chat-completions wire format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "azure_openai")]
    AzureOpenAI,
    #[serde(rename = "openai")]
    OpenAI,
}

impl LlmProvider {
    /// Display name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::AzureOpenAI => "Azure OpenAI",
            LlmProvider::OpenAI => "OpenAI",
        }
    }
}

/// Configuration for the shared completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (OpenAI) or deployment name (Azure)
    pub model: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    /// Azure resource name, used when `base_url` is absent
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Azure `api-version` query parameter
    #[serde(default)]
    pub api_version: Option<String>,
    /// Base URL override. For Azure this is the `.../openai/deployments` prefix.
    #[serde(default)]
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

impl ModelConfig {
    pub fn azure(
        api_key: impl Into<String>,
        instance_name: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::AzureOpenAI,
            model: deployment.into(),
            api_key: api_key.into(),
            instance_name: Some(instance_name.into()),
            api_version: Some(api_version.into()),
            base_url: None,
            temperature: 0.0,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
        }
    }

    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: model.into(),
            api_key: api_key.into(),
            instance_name: None,
            api_version: None,
            base_url: None,
            temperature: 0.0,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
        }
    }

    /// Set base URL (OpenAI-compatible endpoints, or an Azure base path)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_base_ms(mut self, ms: u64) -> Self {
        self.retry_base_ms = ms;
        self
    }

    /// Build from environment variables; `None` when no provider is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ModelConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = if let Some(api_key) = get("AZURE_OPENAI_API_KEY") {
            let deployment = get("AZURE_OPENAI_API_DEPLOYMENT_NAME")?;
            let version = get("AZURE_OPENAI_API_VERSION")?;
            let base_path = get("AZURE_OPENAI_API_BASE_PATH");
            let instance = get("AZURE_OPENAI_API_INSTANCE_NAME");
            if base_path.is_none() && instance.is_none() {
                return None;
            }
            let mut config =
                Self::azure(api_key, instance.unwrap_or_default(), deployment, version);
            config.base_url = base_path;
            config
        } else {
            let api_key = get("OPENAI_API_KEY")?;
            let model = get("THEMIFY_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            let mut config = Self::openai(api_key, model);
            config.base_url = get("OPENAI_BASE_URL");
            config
        };

        let retries = get("THEMIFY_MAX_RETRIES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);
        Some(config.with_max_retries(retries))
    }

    /// Full chat-completions endpoint for this configuration
    pub fn chat_completions_url(&self) -> String {
        match self.provider {
            LlmProvider::AzureOpenAI => {
                let base = match &self.base_url {
                    Some(url) => url.trim_end_matches('/').to_string(),
                    None => format!(
                        "https://{}.openai.azure.com/openai/deployments",
                        self.instance_name.as_deref().unwrap_or_default()
                    ),
                };
                format!(
                    "{}/{}/chat/completions?api-version={}",
                    base,
                    self.model,
                    self.api_version.as_deref().unwrap_or_default()
                )
            }
            LlmProvider::OpenAI => format!(
                "{}/chat/completions",
                self.base_url
                    .as_deref()
                    .unwrap_or(DEFAULT_OPENAI_BASE_URL)
                    .trim_end_matches('/')
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_azure_from_env() {
        let config = ModelConfig::from_lookup(lookup(&[
            ("AZURE_OPENAI_API_KEY", "k"),
            ("AZURE_OPENAI_API_INSTANCE_NAME", "themify"),
            ("AZURE_OPENAI_API_DEPLOYMENT_NAME", "gpt-4o"),
            ("AZURE_OPENAI_API_VERSION", "2024-08-01-preview"),
        ]))
        .unwrap();

        assert_eq!(config.provider, LlmProvider::AzureOpenAI);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_retries, 2);
        assert_eq!(
            config.chat_completions_url(),
            "https://themify.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
    }

    #[test]
    fn test_azure_base_path_override() {
        let config = ModelConfig::from_lookup(lookup(&[
            ("AZURE_OPENAI_API_KEY", "k"),
            ("AZURE_OPENAI_API_BASE_PATH", "https://proxy.local/openai/deployments/"),
            ("AZURE_OPENAI_API_DEPLOYMENT_NAME", "d"),
            ("AZURE_OPENAI_API_VERSION", "v1"),
        ]))
        .unwrap();
        assert_eq!(
            config.chat_completions_url(),
            "https://proxy.local/openai/deployments/d/chat/completions?api-version=v1"
        );
    }

    #[test]
    fn test_incomplete_azure_is_unconfigured() {
        assert!(ModelConfig::from_lookup(lookup(&[("AZURE_OPENAI_API_KEY", "k")])).is_none());
        assert!(ModelConfig::from_lookup(lookup(&[])).is_none());
    }

    #[test]
    fn test_openai_fallback() {
        let config = ModelConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("THEMIFY_MAX_RETRIES", "5"),
        ]))
        .unwrap();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.max_retries, 5);
        assert_eq!(
            config.chat_completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_model_config_serialization_hides_key() {
        let config = ModelConfig::openai("secret", "gpt-4o");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("openai"));
        assert!(json.contains("gpt-4o"));
        assert!(!json.contains("secret"));
    }
}
