//! # Swarm Coordinator
//!
//! Routes one client request to its agent chain.
//!
//! ```text
//! architect        ──► architect (streamed)
//! coder-initial    ──► coder ──► file-builder
//! coder-feedback   ──► feedback-coder ──► file-builder
//! coder-granular   ──► feedback-file-reader ──► feedback-coder-granular
//! ```
//!
//! Coder modes write to the project tree, so they hold a process-wide gate
//! for their whole run; two of them never interleave file writes. Architect
//! streams take no gate.

use crate::skills::agent_definitions::{AgentKind, AgentRegistry};
use crate::skills::architect_skill::ArchitectSkill;
use crate::skills::builder_skill::BuilderSkill;
use crate::skills::coder_skill::CoderSkill;
use crate::skills::feedback_skill::{self, FeedbackSkill};
use crate::skills::file_reader_skill::FileReaderSkill;
use crate::skills::llm_helpers::ModelError;
use crate::skills::llm_worker::AgentRun;
use crate::swarm::events::{PipelineEvent, PipelineEventKind};
use crate::swarm::requests::{ChatRequest, ClassifyError, FileContextRequest, GenerationRequest};
use crate::swarm::stream::FrameStream;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// An agent's final message after a tool call it could not recover from
    #[error("{0}")]
    ToolFailure(String),

    #[error("No file reachable from the renderer carries data-block-id '{0}'")]
    BlockNotFound(String),

    #[error("SnippetNotFound: none of the files read contains the code snippet")]
    SnippetNotFound,

    #[error("Agents are disabled: {0}")]
    Disabled(String),
}

impl CoordinatorError {
    pub fn status_code(&self) -> u16 {
        match self {
            CoordinatorError::InvalidRequest(_) => 400,
            CoordinatorError::Disabled(_) => 503,
            _ => 500,
        }
    }
}

impl From<ClassifyError> for CoordinatorError {
    fn from(err: ClassifyError) -> Self {
        CoordinatorError::InvalidRequest(err.to_string())
    }
}

/// What a dispatched request answers with
pub enum Dispatch {
    /// Token frames, written as NDJSON
    Stream(FrameStream),
    /// One final text, written as a JSON string
    Final(String),
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Stream(_) => f.write_str("Dispatch::Stream(..)"),
            Dispatch::Final(text) => f.debug_tuple("Dispatch::Final").field(text).finish(),
        }
    }
}

pub struct Coordinator {
    registry: Arc<AgentRegistry>,
    gate: Mutex<()>,
    events: broadcast::Sender<PipelineEvent>,
    sequence: AtomicU64,
}

impl Coordinator {
    pub fn new(registry: AgentRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            registry: Arc::new(registry),
            gate: Mutex::new(()),
            events,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Receive pipeline events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PipelineEvent) {
        tracing::debug!(request = event.request, kind = ?event.kind, source = %event.source, "Pipeline event");
        // No subscribers is the normal case outside tests
        let _ = self.events.send(event);
    }

    /// Run one pipeline step, bracketing it with start and end events.
    async fn step<T, F>(&self, request: u64, agent: AgentKind, work: F) -> Result<T, CoordinatorError>
    where
        F: Future<Output = Result<T, CoordinatorError>>,
    {
        self.emit(PipelineEvent::new(request, PipelineEventKind::AgentStarted, agent.name()));
        match work.await {
            Ok(value) => {
                self.emit(PipelineEvent::new(request, PipelineEventKind::AgentCompleted, agent.name()));
                Ok(value)
            }
            Err(e) => {
                self.emit(
                    PipelineEvent::new(request, PipelineEventKind::AgentFailed, agent.name())
                        .with_detail(e.to_string()),
                );
                Err(e)
            }
        }
    }

    fn record_tools(&self, request: u64, run: &AgentRun) {
        for invocation in &run.tool_invocations {
            let kind = match invocation.outcome {
                Ok(_) => PipelineEventKind::ToolInvoked,
                Err(_) => PipelineEventKind::ToolFailed,
            };
            self.emit(PipelineEvent::new(request, kind, run.agent).with_detail(&invocation.tool));
        }
    }

    /// Classify a raw chat body and dispatch it.
    pub async fn handle(&self, body: ChatRequest) -> Result<Dispatch, CoordinatorError> {
        let request = GenerationRequest::classify(body).map_err(|e| {
            tracing::warn!(error = %e, "Rejected chat request");
            CoordinatorError::from(e)
        })?;
        self.dispatch(request).await
    }

    #[tracing::instrument(skip_all, fields(mode = request.mode()))]
    pub async fn dispatch(&self, request: GenerationRequest) -> Result<Dispatch, CoordinatorError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit(PipelineEvent::new(id, PipelineEventKind::RequestDispatched, request.mode()));

        let _gate = if request.mutates_files() {
            Some(self.gate.lock().await)
        } else {
            None
        };

        match request {
            GenerationRequest::Architect { content } => {
                self.emit(PipelineEvent::new(id, PipelineEventKind::AgentStarted, AgentKind::Architect.name()));
                Ok(Dispatch::Stream(ArchitectSkill::new(&self.registry).stream(&content)))
            }
            GenerationRequest::CoderInitial { history } => {
                let coder = CoderSkill::new(&self.registry);
                let run = self
                    .step(id, AgentKind::Coder, async {
                        coder.generate(&history).await.map_err(CoordinatorError::from)
                    })
                    .await?;
                self.build(id, run.final_content).await.map(Dispatch::Final)
            }
            GenerationRequest::CoderFeedback { feedback } => {
                let coder = CoderSkill::new(&self.registry);
                let run = self
                    .step(id, AgentKind::FeedbackCoder, async {
                        coder.revise(&feedback).await.map_err(CoordinatorError::from)
                    })
                    .await?;
                self.build(id, run.final_content).await.map(Dispatch::Final)
            }
            GenerationRequest::CoderGranularFeedback { granular } => {
                let skill = FeedbackSkill::new(&self.registry);
                // Locating and revising run as one step; the reader hands off internally
                let run = self
                    .step(id, AgentKind::GranularFeedbackCoder, skill.apply(&granular))
                    .await?;
                self.record_tools(id, &run);
                Ok(Dispatch::Final(run.final_content))
            }
        }
    }

    /// Hand an artifact to the file builder; the artifact is the answer.
    async fn build(&self, id: u64, artifact: String) -> Result<String, CoordinatorError> {
        if artifact.trim().is_empty() {
            return Err(CoordinatorError::Model(ModelError::Parse(
                "the coder returned no component code".to_string(),
            )));
        }

        let builder = BuilderSkill::new(&self.registry);
        let run = self
            .step(id, AgentKind::FileBuilder, builder.materialize(&artifact))
            .await?;
        self.record_tools(id, &run);

        self.emit(
            PipelineEvent::new(id, PipelineEventKind::ArtifactProduced, AgentKind::FileBuilder.name())
                .with_detail(format!("{} chars", artifact.len())),
        );
        Ok(artifact)
    }

    /// Answer a message that mentions files; with a snippet, revise the file
    /// that contains it.
    #[tracing::instrument(skip_all)]
    pub async fn file_context(&self, body: FileContextRequest) -> Result<String, CoordinatorError> {
        let message = body
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| CoordinatorError::InvalidRequest("message is required".to_string()))?;
        let snippet = body.code_snippet.filter(|s| !s.trim().is_empty());

        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit(PipelineEvent::new(id, PipelineEventKind::RequestDispatched, "file-context"));

        let _gate = match snippet {
            Some(_) => Some(self.gate.lock().await),
            None => None,
        };

        let reader = FileReaderSkill::new(&self.registry);
        let run = self
            .step(id, AgentKind::FileReader, async {
                reader.read(&message).await.map_err(CoordinatorError::from)
            })
            .await?;
        self.record_tools(id, &run);

        let Some(snippet) = snippet else {
            return Ok(run.final_content);
        };

        let target = FileReaderSkill::snippet_target(&run, &snippet, self.registry.tools().root())
            .ok_or(CoordinatorError::SnippetNotFound)?;
        tracing::info!(path = %target.path, "Snippet located");

        let skill = FeedbackSkill::new(&self.registry);
        let revised = self
            .step(
                id,
                AgentKind::GranularFeedbackCoder,
                skill.revise_located(&message, feedback_skill::snippet_focus(&snippet), &target),
            )
            .await?;
        self.record_tools(id, &revised);
        Ok(revised.final_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::llm_helpers::ToolCall;
    use crate::skills::tools::ToolSurface;
    use crate::swarm::requests::{BlockId, ChatTurn, Feedback, GranularFeedback, TurnRole};
    use crate::swarm::stream::StreamFrame;
    use crate::testing::{ScriptedLlm, ScriptedReply};
    use crate::tools::ProjectLayout;
    use futures::StreamExt;
    use serde_json::json;
    use std::fs;

    const RENDERER: &str = "import React from 'react';\n\nexport default function CodeRenderer() {\n  return (\n    <div id=\"code-renderer\">\n    </div>\n  );\n}\n";
    const LEADS: &str = "import { Button } from \"@ui/button\";\n\nexport default function Leads() {\n  return (\n    <main className=\"p-8\">\n      <Button>Add lead</Button>\n    </main>\n  );\n}\n";

    fn coordinator(replies: Vec<ScriptedReply>) -> (tempfile::TempDir, Arc<ScriptedLlm>, Coordinator) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("components/code-renderer.tsx"), RENDERER).unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{"compilerOptions":{"paths":{"@suggestions/*":["./components/suggestions/*"]}}}"#,
        )
        .unwrap();
        let llm = ScriptedLlm::with_replies(replies);
        let registry = AgentRegistry::new(
            llm.clone(),
            ToolSurface::open(dir.path(), ProjectLayout::default()),
        );
        (dir, llm, Coordinator::new(registry))
    }

    fn tool(name: &str, args: serde_json::Value) -> ScriptedReply {
        ScriptedReply::tool_calls(vec![ToolCall {
            id: format!("call_{}", name),
            name: name.into(),
            arguments: args.to_string(),
        }])
    }

    fn build_replies(code: &str) -> Vec<ScriptedReply> {
        vec![
            tool("save_component", json!({"componentName": "Leads", "componentCode": code})),
            tool("update_code_renderer", json!({"componentName": "Leads"})),
            ScriptedReply::text("Leads is live."),
        ]
    }

    fn unwrap_final(dispatch: Dispatch) -> String {
        match dispatch {
            Dispatch::Final(text) => text,
            other => panic!("expected final text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_architect_mode_streams() {
        let (_dir, _llm, coordinator) =
            coordinator(vec![ScriptedReply::tokens(["A plan. ", "Start Coding"])]);

        let dispatch = coordinator
            .handle(ChatRequest {
                content: Some("build a lead list".into()),
                llm_type: Some("architect".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let Dispatch::Stream(stream) = dispatch else {
            panic!("architect must stream");
        };
        let text: String = stream
            .map(|frame| match frame {
                StreamFrame::TokenDelta { content } => content,
                _ => String::new(),
            })
            .collect()
            .await;
        assert!(text.ends_with("Start Coding"));
    }

    #[tokio::test]
    async fn test_initial_generation_materializes_and_returns_artifact() {
        let mut replies = vec![ScriptedReply::text(LEADS)];
        replies.extend(build_replies(LEADS));
        let (dir, llm, coordinator) = coordinator(replies);
        let mut events = coordinator.subscribe();

        let artifact = unwrap_final(
            coordinator
                .dispatch(GenerationRequest::CoderInitial {
                    history: vec![
                        ChatTurn::new(1, TurnRole::Ai, "... Start Coding"),
                        ChatTurn::new(2, TurnRole::User, "go"),
                    ],
                })
                .await
                .unwrap(),
        );
        assert_eq!(artifact, LEADS);
        assert!(dir.path().join("components/suggestions/Leads.tsx").exists());
        let renderer = fs::read_to_string(dir.path().join("components/code-renderer.tsx")).unwrap();
        assert!(renderer.contains("<Leads />"));

        // The builder receives the artifact as a named hand-off
        let handoff = llm.requests()[1].messages.last().cloned().unwrap();
        assert_eq!(handoff.name.as_deref(), Some("coder"));
        assert_eq!(handoff.content, LEADS);

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind);
        }
        assert_eq!(kinds.first(), Some(&PipelineEventKind::RequestDispatched));
        assert_eq!(kinds.last(), Some(&PipelineEventKind::ArtifactProduced));
        assert_eq!(
            kinds.iter().filter(|k| **k == PipelineEventKind::ToolInvoked).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_global_feedback_overwrites_same_component() {
        let red = LEADS.replace("p-8", "p-8 bg-red-500");
        let mut replies = vec![ScriptedReply::text(red.clone())];
        replies.extend(build_replies(&red));
        let (dir, llm, coordinator) = coordinator(replies);

        let artifact = unwrap_final(
            coordinator
                .dispatch(GenerationRequest::CoderFeedback {
                    feedback: Feedback {
                        message: "make the background red".into(),
                        code: ChatTurn::new(3, TurnRole::Ai, LEADS),
                    },
                })
                .await
                .unwrap(),
        );
        assert_eq!(artifact, red);
        let saved = fs::read_to_string(dir.path().join("components/suggestions/Leads.tsx")).unwrap();
        assert!(saved.contains("bg-red-500"));
        assert_eq!(llm.requests()[0].messages[2].content, crate::skills::coder_skill::ENTIRE_COMPONENT_NOTICE);
    }

    #[tokio::test]
    async fn test_granular_feedback_revises_located_file() {
        const ID: &str = "components/suggestions/Leads.tsx line=6";
        let tagged = LEADS.replace("<Button>", &format!("<Button data-block-id=\"{}\">", ID));
        let renamed = tagged.replace("Add lead", "New lead");
        let (dir, _llm, coordinator) = coordinator(vec![
            ScriptedReply::text(format!("components/suggestions/Leads.tsx\n{}", tagged)),
            tool(
                "update_feedback_component",
                json!({"filePath": "components/suggestions/Leads.tsx", "componentCode": renamed}),
            ),
            ScriptedReply::text("Renamed the button."),
        ]);
        fs::create_dir_all(dir.path().join("components/suggestions")).unwrap();
        fs::write(dir.path().join("components/suggestions/Leads.tsx"), &tagged).unwrap();
        let mut events = coordinator.subscribe();

        let reply = unwrap_final(
            coordinator
                .dispatch(GenerationRequest::CoderGranularFeedback {
                    granular: GranularFeedback {
                        message: "call it New lead".into(),
                        data_block_id: BlockId::new(ID),
                    },
                })
                .await
                .unwrap(),
        );
        assert_eq!(reply, "Renamed the button.");
        let saved = fs::read_to_string(dir.path().join("components/suggestions/Leads.tsx")).unwrap();
        assert!(saved.contains(&format!("<Button data-block-id=\"{}\">New lead</Button>", ID)));

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind);
        }
        assert!(kinds.contains(&PipelineEventKind::AgentCompleted));
        assert!(kinds.contains(&PipelineEventKind::ToolInvoked));
    }

    #[tokio::test]
    async fn test_invalid_request_maps_to_400() {
        let (_dir, llm, coordinator) = coordinator(vec![]);
        let err = coordinator
            .handle(ChatRequest {
                llm_type: Some("coder".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_marker_surfaces_diagnostic() {
        let mut replies = vec![ScriptedReply::text(LEADS)];
        replies.push(tool("save_component", json!({"componentName": "Leads", "componentCode": LEADS})));
        replies.push(ScriptedReply::text("Saving failed."));
        let (dir, _llm, coordinator) = coordinator(replies);
        fs::write(
            dir.path().join("components/code-renderer.tsx"),
            "export default function CodeRenderer() {\n  return <div></div>;\n}\n",
        )
        .unwrap();

        let err = coordinator
            .dispatch(GenerationRequest::CoderInitial {
                history: vec![ChatTurn::new(1, TurnRole::User, "go")],
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("RendererShapeViolation"));
        assert!(!dir.path().join("components/suggestions/Leads.tsx").exists());
    }

    #[tokio::test]
    async fn test_model_failure_is_500() {
        let (_dir, _llm, coordinator) =
            coordinator(vec![ScriptedReply::fail(ModelError::AuthFailed("bad key".into()))]);
        let err = coordinator
            .dispatch(GenerationRequest::CoderInitial {
                history: vec![ChatTurn::new(1, TurnRole::User, "go")],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Model(ModelError::AuthFailed(_))));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_file_context_without_snippet_returns_reader_answer() {
        let (_dir, _llm, coordinator) = coordinator(vec![
            tool("read_files", json!({"paths": ["@components/code-renderer.tsx"]})),
            ScriptedReply::text("It renders the latest suggestion."),
        ]);

        let answer = coordinator
            .file_context(FileContextRequest {
                message: Some("explain @components/code-renderer.tsx".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(answer, "It renders the latest suggestion.");

        let err = coordinator
            .file_context(FileContextRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_file_context_snippet_revises_matching_file() {
        let updated = RENDERER.replace("<div id=\"code-renderer\">", "<div id=\"code-renderer\" className=\"p-2\">");
        let (dir, _llm, coordinator) = coordinator(vec![
            tool("read_files", json!({"paths": ["@components/code-renderer.tsx"]})),
            ScriptedReply::text("Read it."),
            tool(
                "update_feedback_component",
                json!({"filePath": "components/code-renderer.tsx", "componentCode": updated}),
            ),
            ScriptedReply::text("Added padding."),
        ]);

        let answer = coordinator
            .file_context(FileContextRequest {
                message: Some("add padding to @components/code-renderer.tsx".into()),
                code_snippet: Some("<div id=\"code-renderer\">".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(answer, "Added padding.");
        let on_disk = fs::read_to_string(dir.path().join("components/code-renderer.tsx")).unwrap();
        assert!(on_disk.contains("className=\"p-2\""));
    }

    #[tokio::test]
    async fn test_file_context_unknown_snippet() {
        let (_dir, _llm, coordinator) = coordinator(vec![
            tool("read_files", json!({"paths": ["@components/code-renderer.tsx"]})),
            ScriptedReply::text("Read it."),
        ]);
        let err = coordinator
            .file_context(FileContextRequest {
                message: Some("change @components/code-renderer.tsx".into()),
                code_snippet: Some("<NotThere />".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::SnippetNotFound));
        assert_eq!(err.status_code(), 500);
    }
}
