//! # Speech to Text
//!
//! Transcribes recorded audio through a Hugging Face automatic speech
//! recognition endpoint. The audio bytes are posted as-is; the endpoint
//! answers `{ "text": ... }`.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STT_MODEL: &str = "openai/whisper-large-v3";
pub const DEFAULT_STT_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl SpeechConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_STT_MODEL.to_string(),
            base_url: DEFAULT_STT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// `None` when `HUGGINGFACE_API_KEY` is absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::new(get("HUGGINGFACE_API_KEY")?);
        if let Some(model) = get("THEMIFY_STT_MODEL") {
            config.model = model;
        }
        Some(config)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech-to-text is not configured")]
    NotConfigured,

    #[error("No audio uploaded")]
    EmptyAudio,

    #[error("Transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcription service returned {status}: {message}")]
    Upstream { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

pub struct SpeechToText {
    config: SpeechConfig,
    client: reqwest::Client,
}

impl SpeechToText {
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    #[tracing::instrument(skip_all, fields(bytes = audio.len(), model = %self.config.model))]
    pub async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<String, SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(audio)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Transcription failed");
            return Err(SpeechError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TranscriptionResponse = response.json().await?;
        tracing::info!(chars = parsed.text.len(), "Transcribed audio");
        Ok(parsed.text)
    }
}
