//! # File Reader Skill
//!
//! Answers messages that mention project files with `@path`. The file-reader
//! agent reads them through `read_files`; when the user also pasted a code
//! snippet, the file that contains it becomes the target of a revision.

use crate::skills::agent_definitions::{AgentKind, AgentRegistry};
use crate::skills::llm_helpers::{ChatMessage, ModelError};
use crate::skills::llm_worker::AgentRun;
use crate::skills::tools::ToolKind;
use crate::tools::{strip_mention, ProjectRoot, TaggedFile};
use std::collections::BTreeMap;

pub struct FileReaderSkill<'a> {
    registry: &'a AgentRegistry,
}

impl<'a> FileReaderSkill<'a> {
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self { registry }
    }

    #[tracing::instrument(skip_all)]
    pub async fn read(&self, message: &str) -> Result<AgentRun, ModelError> {
        self.registry
            .worker(AgentKind::FileReader)
            .run(vec![ChatMessage::user(message).with_name("user")])
            .await
    }

    /// Every file successfully read during `run`, keyed by requested path.
    /// Per-path `Error: ...` values are dropped.
    pub fn files_read(run: &AgentRun) -> BTreeMap<String, String> {
        run.tool_invocations
            .iter()
            .filter(|invocation| invocation.tool == ToolKind::ReadFiles.name())
            .filter_map(|invocation| invocation.outcome.as_ref().ok())
            .filter_map(|output| serde_json::from_str::<BTreeMap<String, String>>(output).ok())
            .flatten()
            .filter(|(_, contents)| !contents.starts_with("Error: "))
            .collect()
    }

    /// The read file whose contents include `snippet` verbatim
    pub fn snippet_target(
        run: &AgentRun,
        snippet: &str,
        root: &ProjectRoot,
    ) -> Option<TaggedFile> {
        let snippet = snippet.trim();
        if snippet.is_empty() {
            return None;
        }

        Self::files_read(run)
            .into_iter()
            .find(|(_, contents)| contents.contains(snippet))
            .and_then(|(requested, contents)| {
                let path = root.resolve(strip_mention(&requested)).ok()?;
                Some(TaggedFile {
                    path: root.relative(&path),
                    contents,
                })
            })
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

    fn registry(replies: Vec<ScriptedReply>) -> (tempfile::TempDir, AgentRegistry) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components")).unwrap();
        fs::write(
            dir.path().join("components/card.tsx"),
            "export default function Card() {\n  return <div className=\"card\">Hi</div>;\n}\n",
        )
        .unwrap();
        let registry = AgentRegistry::new(
            ScriptedLlm::with_replies(replies),
            ToolSurface::open(dir.path(), ProjectLayout::default()),
        );
        (dir, registry)
    }

    fn read_call(paths: &[&str]) -> ScriptedReply {
        ScriptedReply::tool_calls(vec![ToolCall {
            id: "read".into(),
            name: "read_files".into(),
            arguments: json!({ "paths": paths }).to_string(),
        }])
    }

    #[tokio::test]
    async fn test_read_collects_files_and_skips_errors() {
        let (_dir, registry) = registry(vec![
            read_call(&["@components/card.tsx", "@components/missing.tsx"]),
            ScriptedReply::text("Card renders a div."),
        ]);

        let run = FileReaderSkill::new(&registry)
            .read("what does @components/card.tsx do?")
            .await
            .unwrap();
        assert_eq!(run.final_content, "Card renders a div.");

        let files = FileReaderSkill::files_read(&run);
        assert_eq!(files.len(), 1);
        assert!(files["@components/card.tsx"].contains("className=\"card\""));
    }

    #[tokio::test]
    async fn test_snippet_target_resolves_project_path() {
        let (dir, registry) = registry(vec![
            read_call(&["@components/card.tsx"]),
            ScriptedReply::text("ok"),
        ]);
        let run = FileReaderSkill::new(&registry)
            .read("@components/card.tsx")
            .await
            .unwrap();
        let root = ProjectRoot::new(dir.path());

        let target =
            FileReaderSkill::snippet_target(&run, "  <div className=\"card\">Hi</div>\n", &root).unwrap();
        assert_eq!(target.path, "components/card.tsx");
        assert!(FileReaderSkill::snippet_target(&run, "<span/>", &root).is_none());
        assert!(FileReaderSkill::snippet_target(&run, "   ", &root).is_none());
    }
}
