//! # Feedback Skill
//!
//! Granular feedback on one element picked in the live preview.
//!
//! ```text
//! block id ──► feedback-file-reader ──► find_data_tag ──► "<path>\n<contents>"
//!                                                              │
//! user message ──► feedback-coder-granular (pinned to <path>) ◄┘
//!                          └──► update_feedback_component
//! ```
//!
//! The located file is re-read from disk before the hand-off, so the
//! granular coder always edits the bytes that carry the block id.

use crate::skills::agent_definitions::{AgentKind, AgentRegistry};
use crate::skills::llm_helpers::ChatMessage;
use crate::skills::llm_worker::AgentRun;
use crate::skills::tools::ToolKind;
use crate::swarm::coordinator::CoordinatorError;
use crate::swarm::requests::{BlockId, GranularFeedback};
use crate::tools::TaggedFile;

/// Request sent to the feedback file reader
pub fn locate_request(id: &BlockId) -> String {
    format!("Give me the code for this data-block-id: {}.", id)
}

/// Pins a granular revision to one tagged element
pub fn block_focus(id: &BlockId) -> String {
    format!(
        "The next Message is the entire component Code. Only change the code in the next message and only the component with this data-block-id: {}",
        id
    )
}

/// Pins a revision to a code snippet the user pasted
pub fn snippet_focus(snippet: &str) -> String {
    format!(
        "The next Message is the entire component Code. Only change the code in the next message and only the part matching this code snippet:\n{}",
        snippet
    )
}

pub struct FeedbackSkill<'a> {
    registry: &'a AgentRegistry,
}

impl<'a> FeedbackSkill<'a> {
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self { registry }
    }

    /// Find the file carrying `id` through the feedback file reader.
    #[tracing::instrument(skip_all, fields(block_id = %id))]
    pub async fn locate(&self, id: &BlockId) -> Result<TaggedFile, CoordinatorError> {
        let run = self
            .registry
            .worker(AgentKind::FeedbackFileReader)
            .run(vec![ChatMessage::user(locate_request(id)).with_name("user")])
            .await?;

        let reported = run
            .observation_of(ToolKind::FindDataTag)
            .or_else(|| Some(run.final_content.as_str()).filter(|c| !c.trim().is_empty()))
            .and_then(TaggedFile::parse)
            .ok_or_else(|| CoordinatorError::BlockNotFound(id.to_string()))?;

        let root = self.registry.tools().root();
        let path = root
            .resolve(&reported.path)
            .map_err(|_| CoordinatorError::BlockNotFound(id.to_string()))?;
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| CoordinatorError::BlockNotFound(id.to_string()))?;
        if !contents.contains(id.as_str()) {
            tracing::warn!(path = %reported.path, "Reported file does not carry the block id");
            return Err(CoordinatorError::BlockNotFound(id.to_string()));
        }

        let located = TaggedFile {
            path: root.relative(&path),
            contents,
        };
        tracing::info!(path = %located.path, "Located block");
        Ok(located)
    }

    /// Revise `target` in place through the granular coder, which may only
    /// write that one file.
    pub async fn revise_located(
        &self,
        message: &str,
        focus: String,
        target: &TaggedFile,
    ) -> Result<AgentRun, CoordinatorError> {
        let run = self
            .registry
            .worker(AgentKind::GranularFeedbackCoder)
            .with_pinned_target(&target.path)
            .run(vec![
                ChatMessage::user(message),
                ChatMessage::user(focus),
                ChatMessage::user(target.to_observation()),
            ])
            .await?;

        if !run.unresolved_failures().is_empty() {
            return Err(CoordinatorError::ToolFailure(run.final_with_diagnostics()));
        }
        if !run.succeeded(ToolKind::UpdateFeedbackComponent) {
            return Err(CoordinatorError::ToolFailure(format!(
                "{} was not updated: {}",
                target.path, run.final_content
            )));
        }

        tracing::info!(path = %target.path, turns = run.turns, "Applied granular feedback");
        Ok(run)
    }

    /// Locate the picked block, then revise its file.
    #[tracing::instrument(skip_all, fields(block_id = %feedback.data_block_id))]
    pub async fn apply(&self, feedback: &GranularFeedback) -> Result<AgentRun, CoordinatorError> {
        let located = self.locate(&feedback.data_block_id).await?;
        self.revise_located(
            &feedback.message,
            block_focus(&feedback.data_block_id),
            &located,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::llm_helpers::ToolCall;
    use crate::skills::tools::ToolSurface;
    use crate::testing::{ScriptedLlm, ScriptedReply};
    use crate::tools::ProjectLayout;
    use serde_json::json;
    use std::fs;

    const ID: &str = "components/suggestions/Foo.tsx line=3";
    const RENDERER: &str = "import Foo from '@suggestions/Foo';\n\nexport default function CodeRenderer() {\n  return (\n    <div id=\"code-renderer\">\n      <Foo />\n    </div>\n  );\n}\n";
    const FOO: &str = "export default function Foo() {\n  return (\n    <Button data-block-id=\"components/suggestions/Foo.tsx line=3\">Label</Button>\n  );\n}\n";
    const FOO_SAVED: &str = "export default function Foo() {\n  return (\n    <Button data-block-id=\"components/suggestions/Foo.tsx line=3\">Save</Button>\n  );\n}\n";

    fn project(replies: Vec<ScriptedReply>) -> (tempfile::TempDir, std::sync::Arc<ScriptedLlm>, AgentRegistry) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/suggestions")).unwrap();
        fs::write(dir.path().join("components/code-renderer.tsx"), RENDERER).unwrap();
        fs::write(dir.path().join("components/suggestions/Foo.tsx"), FOO).unwrap();
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
        (dir, llm, registry)
    }

    fn find_call() -> ScriptedReply {
        ScriptedReply::tool_calls(vec![ToolCall {
            id: "find".into(),
            name: "find_data_tag".into(),
            arguments: json!({ "dataBlockId": ID }).to_string(),
        }])
    }

    fn update_call(path: &str) -> ScriptedReply {
        ScriptedReply::tool_calls(vec![ToolCall {
            id: "update".into(),
            name: "update_feedback_component".into(),
            arguments: json!({ "filePath": path, "componentCode": FOO_SAVED }).to_string(),
        }])
    }

    #[tokio::test]
    async fn test_granular_feedback_end_to_end() {
        let (dir, llm, registry) = project(vec![
            find_call(),
            ScriptedReply::text("Found it."),
            update_call("components/suggestions/Foo.tsx"),
            ScriptedReply::text("Label changed to Save."),
        ]);

        let run = FeedbackSkill::new(&registry)
            .apply(&GranularFeedback {
                message: "label -> Save".into(),
                data_block_id: BlockId::new(ID),
            })
            .await
            .unwrap();
        assert_eq!(run.final_content, "Label changed to Save.");

        let on_disk = fs::read_to_string(dir.path().join("components/suggestions/Foo.tsx")).unwrap();
        assert_eq!(on_disk, FOO_SAVED);

        // reader request, reader follow-up, then the granular coder prompt
        let requests = llm.requests();
        assert!(requests[0].messages[1].content.contains(ID));
        let granular = &requests[2].messages;
        assert_eq!(granular[1].content, "label -> Save");
        assert!(granular[2].content.ends_with(ID));
        assert!(granular[3]
            .content
            .starts_with("components/suggestions/Foo.tsx\nexport default function Foo()"));
    }

    #[tokio::test]
    async fn test_pinned_target_refuses_other_files() {
        let (dir, _llm, registry) = project(vec![
            find_call(),
            ScriptedReply::text("Found it."),
            update_call("components/code-renderer.tsx"),
            ScriptedReply::text("Done."),
        ]);

        let err = FeedbackSkill::new(&registry)
            .apply(&GranularFeedback {
                message: "label -> Save".into(),
                data_block_id: BlockId::new(ID),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::ToolFailure(m) if m.contains("MissingTarget")));
        assert_eq!(
            fs::read_to_string(dir.path().join("components/code-renderer.tsx")).unwrap(),
            RENDERER
        );
    }

    #[tokio::test]
    async fn test_unknown_block_is_not_found() {
        let (_dir, _llm, registry) = project(vec![
            ScriptedReply::tool_calls(vec![ToolCall {
                id: "find".into(),
                name: "find_data_tag".into(),
                arguments: json!({ "dataBlockId": "nope line=1" }).to_string(),
            }]),
            ScriptedReply::text(""),
        ]);

        let err = FeedbackSkill::new(&registry)
            .locate(&BlockId::new("nope line=1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::BlockNotFound(_)));
    }

    #[tokio::test]
    async fn test_locate_falls_back_to_final_message() {
        let (_dir, _llm, registry) = project(vec![ScriptedReply::text(format!(
            "components/suggestions/Foo.tsx\n{}",
            FOO
        ))]);

        let located = FeedbackSkill::new(&registry)
            .locate(&BlockId::new(ID))
            .await
            .unwrap();
        assert_eq!(located.path, "components/suggestions/Foo.tsx");
        assert_eq!(located.contents, FOO);
    }
}
