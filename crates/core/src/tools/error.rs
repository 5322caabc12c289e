//! # Tool Errors
//!
//! Failure kinds surfaced by the project tools. Agents see these as
//! `Error: ...` observations, the coordinator sees them as typed values.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("IOFailure: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("RendererShapeViolation: {0}")]
    RendererShapeViolation(String),

    #[error("MissingTarget: {0}")]
    MissingTarget(String),

    #[error("Path escapes project sandbox: {0}")]
    PathEscape(String),

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{0}' is not available to this agent")]
    NotPermitted(String),

    #[error("Failed to parse TSX: {0}")]
    Parse(String),
}

impl ToolError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn invalid(tool: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}
