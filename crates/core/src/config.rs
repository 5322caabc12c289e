//! # Configuration
//!
//! Environment-driven settings. The server loads `.env` first, then reads:
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `AZURE_OPENAI_API_*` / `OPENAI_*` | completion service (see [`ModelConfig`]) |
//! | `HUGGINGFACE_API_KEY`, `THEMIFY_STT_MODEL` | speech-to-text |
//! | `THEMIFY_PROJECT_ROOT` | host project root (default: current directory) |
//! | `THEMIFY_MAX_RETRIES` | completion retries (default 2) |
//! | `TAVILY_API_KEY` | web search key; recognized, not used by any agent |
//!
//! Missing credentials disable the feature that needs them, never startup.

use crate::models::ModelConfig;
use crate::speech::SpeechConfig;
use crate::tools::ProjectLayout;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_root: PathBuf,
    pub layout: ProjectLayout,
    /// `None` disables every agent
    pub model: Option<ModelConfig>,
    /// `None` disables transcription
    pub speech: Option<SpeechConfig>,
    pub web_search_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            project_root: get("THEMIFY_PROJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            layout: ProjectLayout::default(),
            model: ModelConfig::from_lookup(&lookup),
            speech: SpeechConfig::from_lookup(&lookup),
            web_search_key: get("TAVILY_API_KEY"),
        }
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// One line per feature for the startup log
    pub fn feature_summary(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("agents", self.model.is_some()),
            ("transcription", self.speech.is_some()),
            ("web_search", self.web_search_key.is_some()),
        ]
    }
}
