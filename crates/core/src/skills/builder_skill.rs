//! # Builder Skill
//!
//! Materializes a component artifact: the file-builder agent saves it under
//! the suggestions directory and points the host renderer at it.
//!
//! ```text
//! artifact ──► file-builder ──► save_component ──► update_code_renderer
//! ```
//!
//! A tool error the agent never recovered from fails the whole build; its
//! final message, with the diagnostic appended, becomes the error text.

use crate::skills::agent_definitions::{AgentKind, AgentRegistry};
use crate::skills::llm_helpers::ChatMessage;
use crate::skills::llm_worker::AgentRun;
use crate::skills::tools::ToolKind;
use crate::swarm::coordinator::CoordinatorError;

/// Author label on the hand-off message
const HANDOFF_AUTHOR: &str = "coder";

pub struct BuilderSkill<'a> {
    registry: &'a AgentRegistry,
}

impl<'a> BuilderSkill<'a> {
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self { registry }
    }

    #[tracing::instrument(skip_all, fields(chars = artifact.len()))]
    pub async fn materialize(&self, artifact: &str) -> Result<AgentRun, CoordinatorError> {
        let run = self
            .registry
            .worker(AgentKind::FileBuilder)
            .run(vec![ChatMessage::user(artifact).with_name(HANDOFF_AUTHOR)])
            .await?;

        if !run.unresolved_failures().is_empty() {
            return Err(CoordinatorError::ToolFailure(run.final_with_diagnostics()));
        }
        if !run.succeeded(ToolKind::SaveComponent) {
            return Err(CoordinatorError::ToolFailure(format!(
                "The file builder finished without saving the component: {}",
                run.final_content
            )));
        }
        if !run.succeeded(ToolKind::UpdateCodeRenderer) {
            tracing::warn!("File builder saved the component but left the renderer untouched");
        }

        tracing::info!(turns = run.turns, "Component materialized");
        Ok(run)
    }
}
