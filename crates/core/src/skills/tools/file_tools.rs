//! # File Tools
//!
//! The five tools agents can call against the host project. Every path is
//! resolved through the [`ProjectRoot`] sandbox; failures come back to the
//! model as `Error: ...` observations and to callers as [`ToolError`].

use crate::skills::llm_helpers::{ToolCall, ToolDefinition};
use crate::tools::block_ids::{inject_block_ids, InjectMode};
use crate::tools::error::ToolError;
use crate::tools::import_graph::{self, TaggedFile};
use crate::tools::project::{strip_mention, ProjectLayout, ProjectRoot};
use crate::tools::renderer::{self, is_component_name};
use crate::tools::tsx;
use crate::tools::AliasMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The tools agents may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    SaveComponent,
    UpdateCodeRenderer,
    ReadFiles,
    FindDataTag,
    UpdateFeedbackComponent,
}

impl ToolKind {
    pub fn all() -> [ToolKind; 5] {
        [
            ToolKind::SaveComponent,
            ToolKind::UpdateCodeRenderer,
            ToolKind::ReadFiles,
            ToolKind::FindDataTag,
            ToolKind::UpdateFeedbackComponent,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::SaveComponent => "save_component",
            ToolKind::UpdateCodeRenderer => "update_code_renderer",
            ToolKind::ReadFiles => "read_files",
            ToolKind::FindDataTag => "find_data_tag",
            ToolKind::UpdateFeedbackComponent => "update_feedback_component",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::SaveComponent => {
                "Save a generated React component to the suggestions directory. The code must default-export exactly one component."
            }
            ToolKind::UpdateCodeRenderer => {
                "Update the code renderer so it imports and renders the given component inside its code-renderer element."
            }
            ToolKind::ReadFiles => {
                "Read files from the project. Returns a JSON object mapping each requested path to its contents or an error string."
            }
            ToolKind::FindDataTag => {
                "Starting at the code renderer, follow imports (including tsconfig path aliases) and return the first file containing the data-block-id: its path on the first line, then its full contents."
            }
            ToolKind::UpdateFeedbackComponent => {
                "Overwrite an existing component file with updated contents."
            }
        }
    }

    pub fn parameters(&self) -> serde_json::Value {
        let schema = match self {
            ToolKind::SaveComponent => schemars::schema_for!(SaveComponentArgs),
            ToolKind::UpdateCodeRenderer => schemars::schema_for!(UpdateCodeRendererArgs),
            ToolKind::ReadFiles => schemars::schema_for!(ReadFilesArgs),
            ToolKind::FindDataTag => schemars::schema_for!(FindDataTagArgs),
            ToolKind::UpdateFeedbackComponent => schemars::schema_for!(UpdateFeedbackComponentArgs),
        };
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.remove("$schema");
        }
        value
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Arguments for saving a generated component
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveComponentArgs {
    /// Name of the default-exported component, e.g. "PricingTable"
    pub component_name: String,
    /// Complete TSX source of the component
    pub component_code: String,
}

/// Arguments for pointing the renderer at a component
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCodeRendererArgs {
    /// Name of the component to render
    pub component_name: String,
}

/// Arguments for reading project files
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadFilesArgs {
    /// Project-relative paths; a leading "@" is accepted
    pub paths: Vec<String>,
}

/// Arguments for the import-graph search
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindDataTagArgs {
    /// The data-block-id value to search for
    pub data_block_id: String,
    /// Entry file; defaults to the code renderer
    #[serde(default)]
    pub entry_path: Option<String>,
}

/// Arguments for overwriting a component after feedback
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackComponentArgs {
    /// Project-relative path of the file to overwrite
    pub file_path: String,
    /// Full updated file contents
    pub component_code: String,
}

/// Per-invocation restrictions applied by the agent runtime
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub allowed: Vec<ToolKind>,
    /// When set, `update_feedback_component` may only write this path
    pub pinned_target: Option<String>,
}

impl ToolContext {
    pub fn new(allowed: Vec<ToolKind>) -> Self {
        Self {
            allowed,
            pinned_target: None,
        }
    }

    pub fn with_pinned_target(mut self, path: impl Into<String>) -> Self {
        self.pinned_target = Some(path.into());
        self
    }
}

/// Strip a surrounding ```tsx fence the model sometimes adds
fn strip_code_fence(code: &str) -> &str {
    let trimmed = code.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return code;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim_end()
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: ToolKind, raw: &str) -> Result<T, ToolError> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| ToolError::invalid(tool.name(), e.to_string()))
}

/// The project-facing tool implementations
#[derive(Debug, Clone)]
pub struct ToolSurface {
    root: ProjectRoot,
    layout: ProjectLayout,
    aliases: AliasMap,
}

impl ToolSurface {
    pub fn new(root: ProjectRoot, layout: ProjectLayout, aliases: AliasMap) -> Self {
        Self {
            root,
            layout,
            aliases,
        }
    }

    /// Build from a root directory, reading aliases from the layout's config file
    pub fn open(root: impl AsRef<Path>, layout: ProjectLayout) -> Self {
        let root = ProjectRoot::new(root.as_ref());
        let aliases = AliasMap::load(root.path(), &layout.alias_config);
        Self::new(root, layout, aliases)
    }

    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    async fn read_renderer(&self) -> Result<String, ToolError> {
        let path = self.root.resolve(&self.layout.renderer_path)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::RendererShapeViolation(format!(
                    "renderer {} not found",
                    self.layout.renderer_path
                ))
            } else {
                ToolError::io(&path, e)
            }
        })
    }

    /// Write a generated component to the suggestions directory.
    pub async fn save_component(&self, name: &str, code: &str) -> Result<String, ToolError> {
        if !is_component_name(name) {
            return Err(ToolError::invalid(
                ToolKind::SaveComponent.name(),
                format!("'{}' is not a valid component name", name),
            ));
        }

        // A missing or malformed renderer would leave the component unreachable
        renderer::check_renderer_shape(&self.read_renderer().await?)?;

        let code = strip_code_fence(code);
        let tree = tsx::parse_tsx(code)?;
        let exports = tsx::count_default_exports(&tree);
        if exports != 1 {
            return Err(ToolError::invalid(
                ToolKind::SaveComponent.name(),
                format!("component must have exactly one default export, found {}", exports),
            ));
        }

        let rel = self.layout.component_path(name);
        let path = self.root.resolve(&rel)?;
        let annotated = inject_block_ids(code, &rel, InjectMode::Canonical)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io(parent, e))?;
        }
        tokio::fs::write(&path, &annotated.source)
            .await
            .map_err(|e| ToolError::io(&path, e))?;

        tracing::info!(component = name, path = %rel, block_ids = annotated.edits, "Saved component");
        Ok(format!("Component {} saved successfully.", name))
    }

    /// Make the renderer import and render `name`.
    pub async fn update_code_renderer(&self, name: &str) -> Result<String, ToolError> {
        let source = self.read_renderer().await?;
        let spliced = renderer::splice_renderer(&source, name, &self.layout.import_prefix)?;

        if spliced != source {
            let path = self.root.resolve(&self.layout.renderer_path)?;
            tokio::fs::write(&path, spliced)
                .await
                .map_err(|e| ToolError::io(&path, e))?;
        }

        tracing::info!(component = name, "Renderer updated");
        Ok(format!(
            "{} updated to render <{} />.",
            self.layout.renderer_file_name(),
            name
        ))
    }

    /// Read each path; failures are reported per path, never as a whole.
    pub async fn read_files(&self, paths: &[String]) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for requested in paths {
            let cleaned = strip_mention(requested);

            let result = match self.root.resolve(cleaned) {
                Ok(path) => tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| ToolError::io(cleaned, e)),
                Err(e) => Err(e),
            };

            let value = match result {
                Ok(contents) => contents,
                Err(e) => format!("Error: {}", e),
            };
            out.insert(requested.clone(), value);
        }
        out
    }

    /// Search the import graph from `entry` (default: the renderer) for a
    /// block id. Returns `None` when no reachable file carries it.
    pub async fn find_data_tag(
        &self,
        tag: &str,
        entry: Option<&str>,
    ) -> Result<Option<TaggedFile>, ToolError> {
        let entry = self
            .root
            .resolve(entry.unwrap_or(&self.layout.renderer_path))?;
        let root = self.root.clone();
        let aliases = self.aliases.clone();
        let tag = tag.to_string();

        tokio::task::spawn_blocking(move || {
            import_graph::find_data_tag(&root, &aliases, &entry, &tag)
        })
        .await
        .map_err(|e| ToolError::Parse(format!("search task failed: {}", e)))?
    }

    /// Overwrite an existing file after feedback. With a pinned target, any
    /// other path is refused.
    pub async fn update_feedback_component(
        &self,
        file_path: &str,
        code: &str,
        pinned: Option<&str>,
    ) -> Result<String, ToolError> {
        let path = self.root.resolve(file_path)?;

        if let Some(pinned) = pinned {
            let expected = self.root.resolve(pinned)?;
            if expected != path {
                return Err(ToolError::MissingTarget(format!(
                    "{} is not the file being revised ({})",
                    file_path, pinned
                )));
            }
        }

        let exists = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !exists {
            return Err(ToolError::MissingTarget(format!("{} does not exist", file_path)));
        }

        let rel = self.root.relative(&path);
        let annotated = inject_block_ids(strip_code_fence(code), &rel, InjectMode::FillMissing)?;
        tokio::fs::write(&path, &annotated.source)
            .await
            .map_err(|e| ToolError::io(&path, e))?;

        tracing::info!(path = %rel, "Updated component from feedback");
        Ok(format!("Component {} updated successfully.", rel))
    }

    /// Dispatch a model tool call, enforcing the agent's grants.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let kind = ToolKind::from_name(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        if !ctx.allowed.contains(&kind) {
            return Err(ToolError::NotPermitted(call.name.clone()));
        }

        match kind {
            ToolKind::SaveComponent => {
                let args: SaveComponentArgs = parse_args(kind, &call.arguments)?;
                self.save_component(&args.component_name, &args.component_code)
                    .await
            }
            ToolKind::UpdateCodeRenderer => {
                let args: UpdateCodeRendererArgs = parse_args(kind, &call.arguments)?;
                self.update_code_renderer(&args.component_name).await
            }
            ToolKind::ReadFiles => {
                let args: ReadFilesArgs = parse_args(kind, &call.arguments)?;
                let files = self.read_files(&args.paths).await;
                serde_json::to_string(&files).map_err(|e| ToolError::Parse(e.to_string()))
            }
            ToolKind::FindDataTag => {
                let args: FindDataTagArgs = parse_args(kind, &call.arguments)?;
                let found = self
                    .find_data_tag(&args.data_block_id, args.entry_path.as_deref())
                    .await?;
                Ok(found.map(|f| f.to_observation()).unwrap_or_default())
            }
            ToolKind::UpdateFeedbackComponent => {
                let args: UpdateFeedbackComponentArgs = parse_args(kind, &call.arguments)?;
                self.update_feedback_component(
                    &args.file_path,
                    &args.component_code,
                    ctx.pinned_target.as_deref(),
                )
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    pub(crate) const RENDERER: &str = "import React from 'react';\n\nexport default function CodeRenderer() {\n  return (\n    <div id=\"code-renderer\">\n    </div>\n  );\n}\n";

    const COMPONENT: &str = "import { Button } from \"@ui/button\";\n\nexport default function Pricing() {\n  return (\n    <section className=\"grid\">\n      <Button>Buy</Button>\n    </section>\n  );\n}\n";

    fn surface() -> (tempfile::TempDir, ToolSurface) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("components/code-renderer.tsx"), RENDERER).unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{"compilerOptions":{"paths":{"@suggestions/*":["./components/suggestions/*"]}}}"#,
        )
        .unwrap();
        let surface = ToolSurface::open(dir.path(), ProjectLayout::default());
        (dir, surface)
    }

    fn call(kind: ToolKind, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: kind.name().into(),
            arguments: args.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_then_render_then_find() {
        let (dir, surface) = surface();

        let saved = surface.save_component("Pricing", COMPONENT).await.unwrap();
        assert_eq!(saved, "Component Pricing saved successfully.");
        let written = fs::read_to_string(dir.path().join("components/suggestions/Pricing.tsx")).unwrap();
        assert!(written.contains(r#"<Button data-block-id="components/suggestions/Pricing.tsx line=6">"#));

        let rendered = surface.update_code_renderer("Pricing").await.unwrap();
        assert_eq!(rendered, "code-renderer.tsx updated to render <Pricing />.");
        let renderer = fs::read_to_string(dir.path().join("components/code-renderer.tsx")).unwrap();
        assert!(renderer.contains("import Pricing from '@suggestions/Pricing';"));
        assert!(renderer.contains("<Pricing />"));

        let found = surface
            .find_data_tag("components/suggestions/Pricing.tsx line=6", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.path, "components/suggestions/Pricing.tsx");
        assert_eq!(found.contents, written);
    }

    #[tokio::test]
    async fn test_save_refuses_when_renderer_missing_marker() {
        let (dir, surface) = surface();
        fs::write(
            dir.path().join("components/code-renderer.tsx"),
            "export default function R() { return <main />; }",
        )
        .unwrap();

        let err = surface.save_component("Pricing", COMPONENT).await.unwrap_err();
        assert!(matches!(err, ToolError::RendererShapeViolation(_)));
        assert!(!dir.path().join("components/suggestions/Pricing.tsx").exists());
    }

    #[tokio::test]
    async fn test_save_requires_single_default_export() {
        let (_dir, surface) = surface();
        let err = surface
            .save_component("Broken", "export function A() { return <div />; }")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_save_refuses_unparseable_component() {
        let (dir, surface) = surface();
        let err = surface
            .save_component("Pricing", "export default function Pricing() {\n  return <div className=\"a\">;\n}\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Parse(_) | ToolError::InvalidArguments { .. }));
        assert!(!dir.path().join("components/suggestions/Pricing.tsx").exists());
    }

    #[tokio::test]
    async fn test_save_strips_code_fence() {
        let (dir, surface) = surface();
        let fenced = format!("```tsx\n{}```", COMPONENT);
        surface.save_component("Pricing", &fenced).await.unwrap();
        let written = fs::read_to_string(dir.path().join("components/suggestions/Pricing.tsx")).unwrap();
        assert!(written.starts_with("import { Button }"));
        assert!(!written.contains("```"));
    }

    #[tokio::test]
    async fn test_read_files_reports_per_path() {
        let (_dir, surface) = surface();
        let files = surface
            .read_files(&[
                "@components/code-renderer.tsx".to_string(),
                "missing.tsx".to_string(),
                "../outside.txt".to_string(),
            ])
            .await;

        assert_eq!(files["@components/code-renderer.tsx"], RENDERER);
        assert!(files["missing.tsx"].starts_with("Error: IOFailure"));
        assert!(files["../outside.txt"].starts_with("Error: Path escapes"));
    }

    #[tokio::test]
    async fn test_update_feedback_respects_pin_and_existence() {
        let (dir, surface) = surface();
        surface.save_component("Pricing", COMPONENT).await.unwrap();
        let path = "components/suggestions/Pricing.tsx";

        let err = surface
            .update_feedback_component("components/code-renderer.tsx", COMPONENT, Some(path))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingTarget(_)));

        let err = surface
            .update_feedback_component("components/suggestions/Nope.tsx", COMPONENT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingTarget(_)));

        let before = fs::read_to_string(dir.path().join(path)).unwrap();
        let revised = before.replace("Buy", "Buy now");
        surface
            .update_feedback_component(path, &revised, Some(path))
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(dir.path().join(path)).unwrap(), revised);
    }

    #[tokio::test]
    async fn test_execute_enforces_grants() {
        let (_dir, surface) = surface();
        let ctx = ToolContext::new(vec![ToolKind::ReadFiles]);

        let err = surface
            .execute(&call(ToolKind::SaveComponent, json!({"componentName": "A", "componentCode": ""})), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotPermitted(_)));

        let unknown = ToolCall {
            id: "x".into(),
            name: "rm_rf".into(),
            arguments: "{}".into(),
        };
        assert!(matches!(
            surface.execute(&unknown, &ctx).await,
            Err(ToolError::UnknownTool(_))
        ));

        let bad_args = surface
            .execute(&call(ToolKind::ReadFiles, json!({"wrong": true})), &ctx)
            .await;
        assert!(matches!(bad_args, Err(ToolError::InvalidArguments { .. })));
    }

    #[tokio::test]
    async fn test_find_data_tag_via_execute_returns_empty_when_absent() {
        let (_dir, surface) = surface();
        let ctx = ToolContext::new(vec![ToolKind::FindDataTag]);
        let out = surface
            .execute(&call(ToolKind::FindDataTag, json!({"dataBlockId": "nope"})), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_tool_schemas_use_camel_case() {
        let params = ToolKind::SaveComponent.parameters();
        let props = &params["properties"];
        assert!(props.get("componentName").is_some());
        assert!(props.get("componentCode").is_some());
        assert!(params.get("$schema").is_none());
        assert_eq!(ToolKind::from_name("find_data_tag"), Some(ToolKind::FindDataTag));
    }
}
