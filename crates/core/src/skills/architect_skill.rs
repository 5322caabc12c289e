//! # Architect Skill
//!
//! Conversational planning. The architect never writes code; it streams a
//! plan and closes it by asking the user to confirm with "Start Coding".

use crate::skills::agent_definitions::{AgentKind, AgentRegistry};
use crate::skills::llm_helpers::ChatMessage;
use crate::skills::prompts::START_CODING;
use crate::swarm::stream::FrameStream;

pub struct ArchitectSkill<'a> {
    registry: &'a AgentRegistry,
}

impl<'a> ArchitectSkill<'a> {
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self { registry }
    }

    /// Stream the architect's reply to one user message as token frames.
    pub fn stream(&self, content: &str) -> FrameStream {
        tracing::info!(chars = content.len(), "Architect request");
        self.registry
            .worker(AgentKind::Architect)
            .stream(vec![ChatMessage::user(content)])
    }

    /// Whether a reply hands the conversation over to the coder
    pub fn is_plan_complete(reply: &str) -> bool {
        reply.contains(START_CODING)
    }
}
