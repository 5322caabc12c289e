//! # Pipeline Events
//!
//! Trace events emitted while the coordinator runs an agent chain. The server
//! logs them; tests subscribe to assert on the hand-offs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of pipeline event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEventKind {
    /// A request was classified and dispatched
    RequestDispatched,
    /// Agent started working
    AgentStarted,
    /// Agent reached its final message
    AgentCompleted,
    /// Agent run aborted (model failure or turn limit)
    AgentFailed,
    /// A tool call returned output
    ToolInvoked,
    /// A tool call returned an error observation
    ToolFailed,
    /// A component artifact was handed back to the client
    ArtifactProduced,
}

/// An event in the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Request-local sequence number
    pub request: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: PipelineEventKind,
    /// Agent or mode that produced this event
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PipelineEvent {
    pub fn new(request: u64, kind: PipelineEventKind, source: &str) -> Self {
        Self {
            request,
            timestamp: Utc::now(),
            kind,
            source: source.to_string(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = PipelineEvent::new(3, PipelineEventKind::ToolInvoked, "file-builder")
            .with_detail("save_component");

        assert_eq!(event.source, "file-builder");
        assert_eq!(event.detail.as_deref(), Some("save_component"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "tool_invoked");
    }
}
