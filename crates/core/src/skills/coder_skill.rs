//! # Coder Skill
//!
//! Turns the approved architect conversation into one component artifact,
//! and revises the latest artifact after whole-component feedback.
//!
//! Both agents answer with the artifact as their final message; neither has
//! tools. Writing the artifact to disk is the builder's job.

use crate::skills::agent_definitions::{AgentKind, AgentRegistry};
use crate::skills::llm_helpers::{ChatMessage, ModelError};
use crate::skills::llm_worker::AgentRun;
use crate::swarm::requests::{ChatTurn, Feedback};

/// Announces the prior artifact in a global feedback prompt
pub const ENTIRE_COMPONENT_NOTICE: &str = "The next Message is the entire component Code.";

pub struct CoderSkill<'a> {
    registry: &'a AgentRegistry,
}

impl<'a> CoderSkill<'a> {
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self { registry }
    }

    /// Client transcript as model messages. Placeholder turns still marked
    /// as loading carry no content and are skipped.
    pub fn history_messages(history: &[ChatTurn]) -> Vec<ChatMessage> {
        history
            .iter()
            .filter(|turn| !turn.is_loading() && !turn.content.trim().is_empty())
            .map(ChatTurn::to_message)
            .collect()
    }

    /// user feedback, notice, prior artifact
    pub fn feedback_messages(feedback: &Feedback) -> Vec<ChatMessage> {
        vec![
            ChatMessage::user(&feedback.message),
            ChatMessage::user(ENTIRE_COMPONENT_NOTICE),
            feedback.code.to_message(),
        ]
    }

    #[tracing::instrument(skip_all, fields(turns = history.len()))]
    pub async fn generate(&self, history: &[ChatTurn]) -> Result<AgentRun, ModelError> {
        self.registry
            .worker(AgentKind::Coder)
            .run(Self::history_messages(history))
            .await
    }

    #[tracing::instrument(skip_all)]
    pub async fn revise(&self, feedback: &Feedback) -> Result<AgentRun, ModelError> {
        self.registry
            .worker(AgentKind::FeedbackCoder)
            .run(Self::feedback_messages(feedback))
            .await
    }
}
