//! # Request Types
//!
//! The JSON bodies accepted by the chat and file-context endpoints, and the
//! classification of a chat body into exactly one generation mode.

use crate::skills::llm_helpers::ChatMessage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Author of a chat turn as the browser names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Ai,
}

/// One turn of a client transcript. Generated artifacts use the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub id: u64,
    pub role: TurnRole,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_loading: Option<bool>,
}

impl ChatTurn {
    pub fn new(id: u64, role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            is_loading: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.unwrap_or(false)
    }

    /// The model-facing form of this turn
    pub fn to_message(&self) -> ChatMessage {
        match self.role {
            TurnRole::User => ChatMessage::user(&self.content),
            TurnRole::Ai => ChatMessage::assistant(&self.content),
        }
    }
}

/// Opaque `data-block-id` value; only ever compared for equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whole-component feedback on the latest artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub message: String,
    pub code: ChatTurn,
}

/// Feedback on one element picked in the preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GranularFeedback {
    pub message: String,
    pub data_block_id: BlockId,
}

/// Raw `/api/chat` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ChatTurn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granular_feedback: Option<GranularFeedback>,
}

/// Raw `/api/file-context` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContextRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ChatTurn>>,
}

/// A chat body reduced to the one mode it asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Architect { content: String },
    CoderInitial { history: Vec<ChatTurn> },
    CoderFeedback { feedback: Feedback },
    CoderGranularFeedback { granular: GranularFeedback },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("llmType is required (\"architect\" or \"coder\")")]
    MissingLlmType,

    #[error("Unknown llmType '{0}'")]
    UnknownLlmType(String),

    #[error("Architect requests need non-empty content")]
    MissingContent,

    #[error("Coder requests need exactly one of history, feedback or granularFeedback (got {0})")]
    AmbiguousCoderVariant(usize),
}

impl GenerationRequest {
    pub fn classify(request: ChatRequest) -> Result<Self, ClassifyError> {
        let llm_type = request.llm_type.ok_or(ClassifyError::MissingLlmType)?;

        match llm_type.as_str() {
            "architect" => match request.content {
                Some(content) if !content.trim().is_empty() => {
                    Ok(GenerationRequest::Architect { content })
                }
                _ => Err(ClassifyError::MissingContent),
            },
            "coder" => {
                let present = [
                    request.history.is_some(),
                    request.feedback.is_some(),
                    request.granular_feedback.is_some(),
                ]
                .into_iter()
                .filter(|set| *set)
                .count();
                if present != 1 {
                    return Err(ClassifyError::AmbiguousCoderVariant(present));
                }

                if let Some(history) = request.history {
                    Ok(GenerationRequest::CoderInitial { history })
                } else if let Some(feedback) = request.feedback {
                    Ok(GenerationRequest::CoderFeedback { feedback })
                } else if let Some(granular) = request.granular_feedback {
                    Ok(GenerationRequest::CoderGranularFeedback { granular })
                } else {
                    Err(ClassifyError::AmbiguousCoderVariant(0))
                }
            }
            other => Err(ClassifyError::UnknownLlmType(other.to_string())),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            GenerationRequest::Architect { .. } => "architect",
            GenerationRequest::CoderInitial { .. } => "coder-initial",
            GenerationRequest::CoderFeedback { .. } => "coder-feedback",
            GenerationRequest::CoderGranularFeedback { .. } => "coder-granular-feedback",
        }
    }

    /// Whether this mode writes to the project tree
    pub fn mutates_files(&self) -> bool {
        !matches!(self, GenerationRequest::Architect { .. })
    }
}
