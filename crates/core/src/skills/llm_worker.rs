//! # LLM Worker
//!
//! The reasoning loop shared by every agent: send the conversation, run any
//! tool calls the model asks for, feed the observations back, and repeat
//! until the model answers without calling a tool.
//!
//! ```text
//! [system] + memory + input ──► model ──► tool calls? ──yes──► ToolSurface
//!                                 ▲                               │
//!                                 └──────── tool observations ◄───┘
//!                                           no ──► final message
//! ```
//!
//! Tool calls of one turn run sequentially, so each observes the effects of
//! the ones before it.

use crate::skills::agent_definitions::AgentDescriptor;
use crate::skills::llm_helpers::{
    ChatMessage, CompletionRequest, CompletionService, ModelError, ToolDefinition,
};
use crate::skills::tools::{ToolContext, ToolKind, ToolSurface};
use crate::swarm::stream::{FrameStream, StreamFrame};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Frames buffered between the model task and a slow client
const FRAME_BUFFER: usize = 64;

/// One tool call and what came of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: String,
    pub arguments: String,
    pub outcome: Result<String, String>,
}

/// Result of running an agent to its final message
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub agent: &'static str,
    pub final_content: String,
    /// Messages produced during this run, final answer included
    pub transcript: Vec<ChatMessage>,
    pub tool_invocations: Vec<ToolInvocation>,
    pub turns: usize,
}

impl AgentRun {
    /// Failures not followed by a successful call of the same tool
    pub fn unresolved_failures(&self) -> Vec<&ToolInvocation> {
        self.tool_invocations
            .iter()
            .enumerate()
            .filter(|(index, invocation)| {
                invocation.outcome.is_err()
                    && !self.tool_invocations[index + 1..]
                        .iter()
                        .any(|later| later.tool == invocation.tool && later.outcome.is_ok())
            })
            .map(|(_, invocation)| invocation)
            .collect()
    }

    pub fn succeeded(&self, kind: ToolKind) -> bool {
        self.tool_invocations
            .iter()
            .any(|invocation| invocation.tool == kind.name() && invocation.outcome.is_ok())
    }

    /// Latest non-empty successful output of `kind`
    pub fn observation_of(&self, kind: ToolKind) -> Option<&str> {
        self.tool_invocations
            .iter()
            .rev()
            .filter(|invocation| invocation.tool == kind.name())
            .find_map(|invocation| match &invocation.outcome {
                Ok(output) if !output.trim().is_empty() => Some(output.as_str()),
                _ => None,
            })
    }

    /// The final message, with any tool error it failed to mention appended.
    pub fn final_with_diagnostics(&self) -> String {
        let mut out = self.final_content.clone();
        for invocation in self.unresolved_failures() {
            let Err(error) = &invocation.outcome else {
                continue;
            };
            if out.contains(error.as_str()) {
                continue;
            }
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&format!("Error: {} failed: {}", invocation.tool, error));
        }
        out
    }
}

/// One invocation of one agent
pub struct LlmWorker {
    descriptor: AgentDescriptor,
    llm: Arc<dyn CompletionService>,
    tools: Arc<ToolSurface>,
    max_turns: usize,
    context: ToolContext,
}

impl LlmWorker {
    pub fn new(
        descriptor: AgentDescriptor,
        llm: Arc<dyn CompletionService>,
        tools: Arc<ToolSurface>,
        max_turns: usize,
    ) -> Self {
        let context = ToolContext::new(descriptor.tools.clone());
        Self {
            descriptor,
            llm,
            tools,
            max_turns,
            context,
        }
    }

    /// Restrict `update_feedback_component` to one file for this invocation
    pub fn with_pinned_target(mut self, path: impl Into<String>) -> Self {
        self.context = self.context.with_pinned_target(path);
        self
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn prelude(&self) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.descriptor.system_prompt)];
        if self.descriptor.remembers {
            messages.extend(self.descriptor.memory.history().await);
        }
        messages
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.descriptor
            .tools
            .iter()
            .map(ToolKind::definition)
            .collect()
    }

    /// Run to a final message. Tool failures are handed back to the model as
    /// observations; only model errors abort the run.
    #[tracing::instrument(skip_all, fields(agent = self.descriptor.name))]
    pub async fn run(&self, input: Vec<ChatMessage>) -> Result<AgentRun, ModelError> {
        let mut messages = self.prelude().await;
        messages.extend(input.iter().cloned());
        let transcript_start = messages.len();
        let definitions = self.tool_definitions();
        let mut invocations = Vec::new();

        tracing::info!(agent = self.descriptor.name, "Agent started");

        for turn in 1..=self.max_turns {
            let request = CompletionRequest::new(messages.clone()).with_tools(definitions.clone());
            let completion = self.llm.complete(request).await?;

            if completion.tool_calls.is_empty() {
                messages.push(ChatMessage::assistant(completion.content.clone()));
                let transcript = messages.split_off(transcript_start);

                if self.descriptor.remembers {
                    self.descriptor
                        .memory
                        .append(input.into_iter().chain(transcript.iter().cloned()))
                        .await;
                }

                tracing::info!(
                    agent = self.descriptor.name,
                    turns = turn,
                    tool_calls = invocations.len(),
                    "Agent completed"
                );
                return Ok(AgentRun {
                    agent: self.descriptor.name,
                    final_content: completion.content,
                    transcript,
                    tool_invocations: invocations,
                    turns: turn,
                });
            }

            messages.push(ChatMessage::assistant_tool_calls(
                completion.content,
                completion.tool_calls.clone(),
            ));

            for call in &completion.tool_calls {
                let outcome = self
                    .tools
                    .execute(call, &self.context)
                    .await
                    .map_err(|e| e.to_string());

                let observation = match &outcome {
                    Ok(output) => {
                        tracing::info!(agent = self.descriptor.name, tool = %call.name, "Tool call succeeded");
                        output.clone()
                    }
                    Err(error) => {
                        tracing::warn!(agent = self.descriptor.name, tool = %call.name, error = %error, "Tool call failed");
                        format!("Error: {}", error)
                    }
                };
                messages.push(ChatMessage::tool(&call.id, observation));

                invocations.push(ToolInvocation {
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                    outcome,
                });
            }
        }

        tracing::warn!(
            agent = self.descriptor.name,
            limit = self.max_turns,
            "Agent hit its turn limit"
        );
        Err(ModelError::TurnLimit {
            agent: self.descriptor.name.to_string(),
            limit: self.max_turns,
        })
    }

    /// Stream the reply token by token.
    ///
    /// The model call runs in its own task. If the receiver is dropped the
    /// task keeps draining the model so the full reply still reaches memory.
    pub fn stream(self, input: Vec<ChatMessage>) -> FrameStream {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);

        tokio::spawn(async move {
            let agent = self.descriptor.name;
            let mut messages = self.prelude().await;
            messages.extend(input.iter().cloned());

            tracing::info!(agent, "Agent stream started");
            let mut tokens = match self.llm.stream(CompletionRequest::new(messages)).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::warn!(agent, error = %e, "Agent stream failed to start");
                    let _ = tx.send(StreamFrame::error(e.to_string())).await;
                    return;
                }
            };

            let mut reply = String::new();
            let mut connected = true;
            while let Some(item) = tokens.next().await {
                match item {
                    Ok(token) => {
                        reply.push_str(&token);
                        if connected && tx.send(StreamFrame::token(token)).await.is_err() {
                            tracing::debug!(agent, "Client disconnected, draining model stream");
                            connected = false;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(agent, error = %e, "Agent stream failed");
                        if connected {
                            let _ = tx.send(StreamFrame::error(e.to_string())).await;
                        }
                        return;
                    }
                }
            }

            if self.descriptor.remembers {
                self.descriptor
                    .memory
                    .append(input.into_iter().chain([ChatMessage::assistant(reply.clone())]))
                    .await;
            }
            tracing::info!(agent, chars = reply.len(), "Agent stream completed");
        });

        ReceiverStream::new(rx).boxed()
    }
}
