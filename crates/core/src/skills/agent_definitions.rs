//! # Agent Definitions
//!
//! Composes Themify agents from a system prompt, a tool grant and a memory
//! thread. The registry is built once at startup and shared by every request.

use crate::memory::{ConversationStore, MemoryHandle};
use crate::skills::llm_helpers::CompletionService;
use crate::skills::llm_worker::LlmWorker;
use crate::skills::prompts;
use crate::skills::tools::{ToolKind, ToolSurface};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Model turns one invocation may take before giving up
pub const DEFAULT_MAX_TURNS: usize = 8;

/// The agents the coordinator can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    Architect,
    Coder,
    FeedbackCoder,
    #[serde(rename = "feedback-coder-granular")]
    GranularFeedbackCoder,
    FileBuilder,
    FileReader,
    FeedbackFileReader,
}

impl AgentKind {
    pub fn all() -> [AgentKind; 7] {
        [
            AgentKind::Architect,
            AgentKind::Coder,
            AgentKind::FeedbackCoder,
            AgentKind::GranularFeedbackCoder,
            AgentKind::FileBuilder,
            AgentKind::FileReader,
            AgentKind::FeedbackFileReader,
        ]
    }

    /// Memory key and log label
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Architect => "architect",
            AgentKind::Coder => "coder",
            AgentKind::FeedbackCoder => "feedback-coder",
            AgentKind::GranularFeedbackCoder => "feedback-coder-granular",
            AgentKind::FileBuilder => "file-builder",
            AgentKind::FileReader => "file-reader",
            AgentKind::FeedbackFileReader => "feedback-file-reader",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentKind::Architect => prompts::ARCHITECT,
            AgentKind::Coder => prompts::CODER,
            AgentKind::FeedbackCoder => prompts::FEEDBACK_CODER,
            AgentKind::GranularFeedbackCoder => prompts::GRANULAR_FEEDBACK_CODER,
            AgentKind::FileBuilder => prompts::FILE_BUILDER,
            AgentKind::FileReader => prompts::FILE_READER,
            AgentKind::FeedbackFileReader => prompts::FEEDBACK_FILE_READER,
        }
    }

    pub fn tools(&self) -> Vec<ToolKind> {
        match self {
            AgentKind::Architect | AgentKind::Coder | AgentKind::FeedbackCoder => Vec::new(),
            AgentKind::GranularFeedbackCoder => vec![ToolKind::UpdateFeedbackComponent],
            AgentKind::FileBuilder => {
                vec![ToolKind::SaveComponent, ToolKind::UpdateCodeRenderer]
            }
            AgentKind::FileReader => vec![ToolKind::ReadFiles],
            AgentKind::FeedbackFileReader => vec![ToolKind::FindDataTag],
        }
    }

    /// Whether prior turns are replayed on the next invocation.
    ///
    /// The file agents act on one explicit hand-off each time; replaying
    /// their earlier tool traffic would only point them at stale files.
    pub fn keeps_memory(&self) -> bool {
        matches!(
            self,
            AgentKind::Architect
                | AgentKind::Coder
                | AgentKind::FeedbackCoder
                | AgentKind::GranularFeedbackCoder
        )
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A configured agent: prompt + tools + memory thread
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    pub kind: AgentKind,
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub tools: Vec<ToolKind>,
    pub memory: MemoryHandle,
    pub remembers: bool,
}

impl AgentDescriptor {
    fn new(kind: AgentKind, store: &Arc<ConversationStore>) -> Self {
        Self {
            kind,
            name: kind.name(),
            system_prompt: kind.system_prompt(),
            tools: kind.tools(),
            memory: store.handle(kind.name()),
            remembers: kind.keeps_memory(),
        }
    }
}

/// Every agent, bound to one completion service and one project
pub struct AgentRegistry {
    llm: Arc<dyn CompletionService>,
    tools: Arc<ToolSurface>,
    memory: Arc<ConversationStore>,
    agents: Vec<AgentDescriptor>,
    max_turns: usize,
}

impl AgentRegistry {
    pub fn new(llm: Arc<dyn CompletionService>, tools: ToolSurface) -> Self {
        let memory = ConversationStore::new();
        let agents = AgentKind::all()
            .into_iter()
            .map(|kind| AgentDescriptor::new(kind, &memory))
            .collect();

        Self {
            llm,
            tools: Arc::new(tools),
            memory,
            agents,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn descriptor(&self, kind: AgentKind) -> &AgentDescriptor {
        // `agents` is built from `AgentKind::all()` in declaration order
        &self.agents[kind as usize]
    }

    pub fn descriptors(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    /// A runnable worker for one invocation of `kind`
    pub fn worker(&self, kind: AgentKind) -> LlmWorker {
        LlmWorker::new(
            self.descriptor(kind).clone(),
            Arc::clone(&self.llm),
            Arc::clone(&self.tools),
            self.max_turns,
        )
    }

    pub fn tools(&self) -> &Arc<ToolSurface> {
        &self.tools
    }

    pub fn memory(&self) -> &Arc<ConversationStore> {
        &self.memory
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}
