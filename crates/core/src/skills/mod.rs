//! # Themify Skills
//!
//! Agents and the pipelines built from them.
//!
//! ## Architecture
//!
//! ```text
//! AgentRegistry (one per process)
//!   └── AgentDescriptor (prompt + tools + memory)
//!         └── LlmWorker (reasoning loop) ──► ToolSurface
//! ```
//!
//! ## Skills
//!
//! - `ArchitectSkill` - Streams the plan
//! - `CoderSkill` - Generates or revises the component artifact
//! - `BuilderSkill` - Saves the artifact and splices the renderer
//! - `FeedbackSkill` - Locates a block and applies granular feedback
//! - `FileReaderSkill` - Reads `@`-mentioned files

pub mod llm_helpers;
pub mod llm_worker;
pub mod prompts;
pub mod tools;

pub mod agent_definitions;

pub mod architect_skill;
pub mod builder_skill;
pub mod coder_skill;
pub mod feedback_skill;
pub mod file_reader_skill;

pub use agent_definitions::{AgentDescriptor, AgentKind, AgentRegistry};
pub use architect_skill::ArchitectSkill;
pub use builder_skill::BuilderSkill;
pub use coder_skill::CoderSkill;
pub use feedback_skill::FeedbackSkill;
pub use file_reader_skill::FileReaderSkill;
pub use llm_helpers::{ChatCompletionsClient, ChatMessage, CompletionService, ModelError};
pub use llm_worker::{AgentRun, LlmWorker, ToolInvocation};
