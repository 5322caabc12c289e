//! # Project Sandbox
//!
//! The process-wide project root every tool resolves against, and the
//! layout of the host project (where suggestions land, which file renders them).

use crate::tools::error::ToolError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Where generated code lives inside the host project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Directory that receives generated components
    pub suggestions_dir: String,
    /// The host renderer with the `code-renderer` marker element
    pub renderer_path: String,
    /// Extension of generated component files (without the dot)
    pub component_extension: String,
    /// Module prefix used when the renderer imports a suggestion
    pub import_prefix: String,
    /// tsconfig-style file holding `compilerOptions.paths`
    pub alias_config: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            suggestions_dir: "components/suggestions".to_string(),
            renderer_path: "components/code-renderer.tsx".to_string(),
            component_extension: "tsx".to_string(),
            import_prefix: "@suggestions/".to_string(),
            alias_config: "tsconfig.json".to_string(),
        }
    }
}

impl ProjectLayout {
    /// Root-relative path of a generated component
    pub fn component_path(&self, name: &str) -> String {
        format!(
            "{}/{}.{}",
            self.suggestions_dir.trim_end_matches('/'),
            name,
            self.component_extension
        )
    }

    /// File name of the renderer, used in tool acknowledgements
    pub fn renderer_file_name(&self) -> &str {
        self.renderer_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.renderer_path)
    }
}

/// A directory that file tools may not escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let absolute = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };
        Self {
            root: normalize(&absolute),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path. Accepts `./x`, `x` and absolute paths
    /// that already sit under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ToolError::PathEscape("empty path".to_string()));
        }

        let candidate = Path::new(trimmed);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let normalized = normalize(&joined);
        if !normalized.starts_with(&self.root) {
            return Err(ToolError::PathEscape(path.to_string()));
        }
        Ok(normalized)
    }

    /// Root-relative, forward-slash form of a path under the root
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn contains(&self, path: &Path) -> bool {
        normalize(path).starts_with(&self.root)
    }
}

/// Drop the `@` or `@/` mention prefix the chat input puts on paths.
pub fn strip_mention(path: &str) -> &str {
    let path = path.trim();
    path.strip_prefix("@/")
        .or_else(|| path.strip_prefix('@'))
        .unwrap_or(path)
}

/// Lexical normalization: folds `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_forms() {
        let root = ProjectRoot::new("/srv/app");
        assert_eq!(
            root.resolve("./components/a.tsx").unwrap(),
            PathBuf::from("/srv/app/components/a.tsx")
        );
        assert_eq!(
            root.resolve("components/../lib/b.ts").unwrap(),
            PathBuf::from("/srv/app/lib/b.ts")
        );
        assert_eq!(
            root.resolve("/srv/app/x.tsx").unwrap(),
            PathBuf::from("/srv/app/x.tsx")
        );
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let root = ProjectRoot::new("/srv/app");
        assert!(matches!(
            root.resolve("../etc/passwd"),
            Err(ToolError::PathEscape(_))
        ));
        assert!(matches!(
            root.resolve("/etc/passwd"),
            Err(ToolError::PathEscape(_))
        ));
        assert!(matches!(
            root.resolve("/srv/application/x"),
            Err(ToolError::PathEscape(_))
        ));
    }

    #[test]
    fn test_relative_uses_forward_slashes() {
        let root = ProjectRoot::new("/srv/app");
        let path = root.resolve("components/suggestions/Card.tsx").unwrap();
        assert_eq!(root.relative(&path), "components/suggestions/Card.tsx");
    }

    #[test]
    fn test_strip_mention_forms() {
        assert_eq!(strip_mention("@components/a.tsx"), "components/a.tsx");
        assert_eq!(strip_mention(" @/lib/b.ts "), "lib/b.ts");
        assert_eq!(strip_mention("app/page.tsx"), "app/page.tsx");
    }

    #[test]
    fn test_layout_defaults() {
        let layout = ProjectLayout::default();
        assert_eq!(
            layout.component_path("Pricing"),
            "components/suggestions/Pricing.tsx"
        );
        assert_eq!(layout.renderer_file_name(), "code-renderer.tsx");
    }
}
