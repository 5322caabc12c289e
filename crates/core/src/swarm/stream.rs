//! # Stream Protocol
//!
//! Newline-delimited JSON frames carried by streaming chat responses, and the
//! incremental decoder clients use to read them.
//!
//! ## Wire format
//!
//! ```text
//! {"type":"token_delta","content":"Hel"}\n
//! {"type":"token_delta","content":"lo"}\n
//! {"type":"error","message":"..."}\n
//! ```
//!
//! Non-streaming responses are a single JSON string (the final text).

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One frame of a streamed agent response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// Incremental model output
    TokenDelta { content: String },
    /// Complete artifact, sent once when a producer has one
    FinalArtifact { content: String },
    /// Output of a tool the agent invoked
    ToolObservation { tool: String, content: String },
    /// Failure after the stream started; the stream ends after it
    Error { message: String },
}

impl StreamFrame {
    pub fn token(content: impl Into<String>) -> Self {
        StreamFrame::TokenDelta {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamFrame::Error {
            message: message.into(),
        }
    }
}

pub type FrameStream = BoxStream<'static, StreamFrame>;

/// Serialise a frame as one NDJSON line (trailing newline included).
pub fn encode_frame(frame: &StreamFrame) -> String {
    match serde_json::to_string(frame) {
        Ok(mut line) => {
            line.push('\n');
            line
        }
        Err(e) => format!(
            "{{\"type\":\"error\",\"message\":\"frame encoding failed: {}\"}}\n",
            e.to_string().replace('"', "'")
        ),
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed frame: {reason} (line: {line})")]
    Malformed { line: String, reason: String },

    #[error("Malformed response body: {0}")]
    Body(String),
}

/// Incremental NDJSON frame decoder. Bytes may arrive split anywhere,
/// including inside a multi-byte character; partial lines stay buffered.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every complete frame it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamFrame, DecodeError>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = decode_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Decode a trailing line that arrived without its newline.
    pub fn finish(&mut self) -> Option<Result<StreamFrame, DecodeError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    pub fn has_pending(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<StreamFrame, DecodeError>> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<StreamFrame>(line).map_err(|e| DecodeError::Malformed {
            line: line.to_string(),
            reason: e.to_string(),
        }),
    )
}

/// Decode a non-streaming response body: one JSON string.
pub fn decode_artifact_body(body: &[u8]) -> Result<String, DecodeError> {
    serde_json::from_slice::<String>(body).map_err(|e| DecodeError::Body(e.to_string()))
}
