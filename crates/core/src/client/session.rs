//! # Chat Session
//!
//! Client-side state for one user: the architect transcript, the generated
//! component transcript, and which requests are in flight.
//!
//! ## Modes
//!
//! ```text
//! Architect ──start_coding──► Coder ──begin_inspection──► GranularCoder
//!                               ▲                               │
//!                               └──── submit / cancel ──────────┘
//! ```
//!
//! Architect replies stream into a placeholder turn that only grows; coder
//! requests answer with one artifact. Failures land in the transcript as AI
//! turns so the user sees them in context.

use crate::client::transport::{ChatTransport, TransportError};
use crate::skills::architect_skill::ArchitectSkill;
use crate::swarm::requests::{ChatRequest, ChatTurn, Feedback, GranularFeedback, TurnRole};
use crate::swarm::stream::{decode_artifact_body, DecodeError, FrameDecoder, StreamFrame};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

pub const GREETING: &str =
    "Hello! My name is Themify, how can I help you to build what you want today?";
pub const CODE_UPDATED: &str = "Code has been updated!";
pub const EMPTY_STREAM_FALLBACK: &str = "Done. - There might be an error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Architect,
    Coder,
    /// Inspector armed; the next submission is granular feedback
    GranularCoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Architect,
    Coder,
    Feedback,
    GranularFeedback,
}

impl RequestKind {
    fn mutates_files(&self) -> bool {
        !matches!(self, RequestKind::Architect)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A {0:?} request is already in flight")]
    Busy(RequestKind),

    #[error("Cannot {action} in {mode:?} mode")]
    WrongMode { action: &'static str, mode: ChatMode },

    #[error("The architect has not asked to start coding yet")]
    NotReady,

    #[error("No generated component to give feedback on")]
    NoArtifact,

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Per-request in-flight flags, shareable with whatever renders the session
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    kinds: Arc<Mutex<HashSet<RequestKind>>>,
}

impl InFlight {
    pub fn contains(&self, kind: RequestKind) -> bool {
        self.lock().contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<RequestKind>> {
        self.kinds.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim `kind`. File-mutating requests also exclude each other.
    fn begin(&self, kind: RequestKind) -> Result<FlightGuard, SessionError> {
        let mut kinds = self.lock();
        let clash = kinds
            .iter()
            .find(|held| **held == kind || (held.mutates_files() && kind.mutates_files()))
            .copied();
        if let Some(held) = clash {
            return Err(SessionError::Busy(held));
        }
        kinds.insert(kind);
        Ok(FlightGuard {
            flags: self.clone(),
            kind,
        })
    }
}

/// Clears its flag when dropped, including when the request future is
/// cancelled.
struct FlightGuard {
    flags: InFlight,
    kind: RequestKind,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flags.lock().remove(&self.kind);
    }
}

pub struct ChatSession<T: ChatTransport> {
    transport: T,
    messages: Vec<ChatTurn>,
    generations: Vec<ChatTurn>,
    mode: ChatMode,
    in_flight: InFlight,
    next_id: u64,
    view: watch::Sender<Vec<ChatTurn>>,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        let greeting = ChatTurn::new(1, TurnRole::Ai, GREETING);
        let (view, _) = watch::channel(vec![greeting.clone()]);
        Self {
            transport,
            messages: vec![greeting],
            generations: Vec::new(),
            mode: ChatMode::Architect,
            in_flight: InFlight::default(),
            next_id: 2,
            view,
        }
    }

    pub fn messages(&self) -> &[ChatTurn] {
        &self.messages
    }

    pub fn generations(&self) -> &[ChatTurn] {
        &self.generations
    }

    /// The live artifact
    pub fn latest_generation(&self) -> Option<&ChatTurn> {
        self.generations.last()
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    /// Transcript snapshots, republished on every change
    pub fn watch(&self) -> watch::Receiver<Vec<ChatTurn>> {
        self.view.subscribe()
    }

    fn publish(&self) {
        self.view.send_replace(self.messages.clone());
    }

    fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatTurn::new(id, role, content));
        self.publish();
        self.messages.len() - 1
    }

    fn push_generation(&mut self, artifact: String) {
        let id = self.next_id;
        self.next_id += 1;
        self.generations.push(ChatTurn::new(id, TurnRole::Ai, artifact));
    }

    fn require_mode(&self, expected: ChatMode, action: &'static str) -> Result<(), SessionError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(SessionError::WrongMode {
                action,
                mode: self.mode,
            })
        }
    }

    /// Whether the architect has asked the user to start coding
    pub fn can_start_coding(&self) -> bool {
        self.mode == ChatMode::Architect
            && self
                .messages
                .iter()
                .rev()
                .find(|turn| turn.role == TurnRole::Ai && !turn.is_loading())
                .is_some_and(|turn| ArchitectSkill::is_plan_complete(&turn.content))
    }

    /// Send a message to the architect and stream the reply into a new turn.
    /// Returns the finished reply.
    pub async fn submit_architect_message(&mut self, text: &str) -> Result<String, SessionError> {
        self.require_mode(ChatMode::Architect, "talk to the architect")?;
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let _flight = self.in_flight.begin(RequestKind::Architect)?;

        self.push_turn(TurnRole::User, text);
        let slot = self.push_turn(TurnRole::Ai, "");
        self.messages[slot].is_loading = Some(true);
        self.publish();

        let request = ChatRequest {
            content: Some(text.to_string()),
            llm_type: Some("architect".to_string()),
            ..Default::default()
        };
        let mut body = match self.transport.stream_chat(&request).await {
            Ok(body) => body,
            Err(e) => {
                self.finish_turn(slot, Some(e.to_string()));
                return Err(e.into());
            }
        };

        let mut decoder = FrameDecoder::new();
        let mut failure = None;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            };
            for frame in decoder.push(&chunk) {
                self.apply_frame(slot, frame, &mut failure);
            }
        }
        if let Some(frame) = decoder.finish() {
            self.apply_frame(slot, frame, &mut failure);
        }

        self.finish_turn(slot, failure);
        Ok(self.messages[slot].content.clone())
    }

    fn apply_frame(
        &mut self,
        slot: usize,
        frame: Result<StreamFrame, DecodeError>,
        failure: &mut Option<String>,
    ) {
        match frame {
            Ok(StreamFrame::TokenDelta { content }) | Ok(StreamFrame::FinalArtifact { content }) => {
                self.messages[slot].content.push_str(&content);
                self.publish();
            }
            Ok(StreamFrame::Error { message }) => *failure = Some(message),
            Ok(StreamFrame::ToolObservation { tool, .. }) => {
                tracing::debug!(tool = %tool, "Ignoring tool observation in architect stream");
            }
            Err(e) => tracing::warn!(error = %e, "Skipping undecodable frame"),
        }
    }

    fn finish_turn(&mut self, slot: usize, failure: Option<String>) {
        let turn = &mut self.messages[slot];
        turn.is_loading = Some(false);
        if let Some(message) = failure {
            if !turn.content.is_empty() {
                turn.content.push_str("\n\n");
            }
            turn.content.push_str(&format!("Error: {}", message));
        } else if turn.content.is_empty() {
            turn.content = EMPTY_STREAM_FALLBACK.to_string();
        }
        self.publish();
    }

    /// Report a failed coder request as an AI turn, then hand the error back.
    fn report(&mut self, error: SessionError) -> SessionError {
        let text = match &error {
            SessionError::Transport(TransportError::Status { body, .. }) if !body.is_empty() => {
                body.clone()
            }
            other => other.to_string(),
        };
        self.push_turn(TurnRole::Ai, format!("Error: {}", text));
        error
    }

    async fn invoke(&self, request: &ChatRequest) -> Result<String, SessionError> {
        let body = self.transport.invoke_chat(request).await?;
        Ok(decode_artifact_body(&body)?)
    }

    /// Hand the architect conversation to the coder. On success the artifact
    /// becomes the latest generation and the session enters coder mode.
    pub async fn start_coding(&mut self) -> Result<String, SessionError> {
        self.require_mode(ChatMode::Architect, "start coding")?;
        if !self.can_start_coding() {
            return Err(SessionError::NotReady);
        }
        let _flight = self.in_flight.begin(RequestKind::Coder)?;

        let history = self
            .messages
            .iter()
            .filter(|turn| !turn.is_loading())
            .cloned()
            .collect();
        let request = ChatRequest {
            llm_type: Some("coder".to_string()),
            history: Some(history),
            ..Default::default()
        };

        match self.invoke(&request).await {
            Ok(artifact) => {
                self.push_generation(artifact.clone());
                self.mode = ChatMode::Coder;
                Ok(artifact)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Whole-component feedback on the latest generation
    pub async fn submit_feedback(&mut self, message: &str) -> Result<String, SessionError> {
        self.require_mode(ChatMode::Coder, "send feedback")?;
        if message.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let code = self.latest_generation().cloned().ok_or(SessionError::NoArtifact)?;
        let _flight = self.in_flight.begin(RequestKind::Feedback)?;

        self.push_turn(TurnRole::User, message);
        let request = ChatRequest {
            llm_type: Some("coder".to_string()),
            feedback: Some(Feedback {
                message: message.to_string(),
                code,
            }),
            ..Default::default()
        };

        match self.invoke(&request).await {
            Ok(artifact) => {
                self.push_generation(artifact.clone());
                self.push_turn(TurnRole::Ai, CODE_UPDATED);
                Ok(artifact)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Arm the inspector: the next submission targets one element.
    pub fn begin_inspection(&mut self) -> Result<(), SessionError> {
        self.require_mode(ChatMode::Coder, "inspect")?;
        self.mode = ChatMode::GranularCoder;
        Ok(())
    }

    pub fn cancel_inspection(&mut self) {
        if self.mode == ChatMode::GranularCoder {
            self.mode = ChatMode::Coder;
        }
    }

    /// Feedback on one picked element. The server persists the change
    /// itself, so no generation is appended.
    pub async fn submit_granular_feedback(
        &mut self,
        feedback: GranularFeedback,
    ) -> Result<String, SessionError> {
        self.require_mode(ChatMode::GranularCoder, "send granular feedback")?;
        if feedback.message.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let _flight = self.in_flight.begin(RequestKind::GranularFeedback)?;
        self.mode = ChatMode::Coder;

        self.push_turn(TurnRole::User, feedback.message.clone());
        let request = ChatRequest {
            llm_type: Some("coder".to_string()),
            granular_feedback: Some(feedback),
            ..Default::default()
        };

        match self.invoke(&request).await {
            Ok(reply) => {
                self.push_turn(TurnRole::Ai, CODE_UPDATED);
                Ok(reply)
            }
            Err(e) => Err(self.report(e)),
        }
    }
}
