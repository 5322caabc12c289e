//! # Import Graph Search
//!
//! Depth-first walk over a module's import graph, starting at the host
//! renderer, looking for the file that carries a given `data-block-id`.
//!
//! Relative specifiers are resolved against the importing file's directory,
//! bare specifiers through the [`AliasMap`]. Package imports are skipped.

use crate::tools::aliases::AliasMap;
use crate::tools::error::ToolError;
use crate::tools::project::{normalize, ProjectRoot};
use regex::Regex;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Suffixes tried, in order, when a specifier does not name a file directly
const EXTENSION_CANDIDATES: &[&str] = &[
    "",
    ".tsx",
    ".ts",
    ".jsx",
    ".js",
    "/index.tsx",
    "/index.ts",
    "/index.jsx",
    "/index.js",
];

fn import_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r#"(?m)^\s*(?:import|export)\s+(?:type\s+)?(?:[\w*{}\s,$]*?\s*from\s*)?["']([^"'\n]+)["']"#,
            )
            .ok()
        })
        .as_ref()
}

/// A file located by the search: its root-relative path and full contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFile {
    pub path: String,
    pub contents: String,
}

impl TaggedFile {
    /// Path on the first line, contents verbatim from the second
    pub fn to_observation(&self) -> String {
        format!("{}\n{}", self.path, self.contents)
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let (path, contents) = text.split_once('\n')?;
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_string(),
            contents: contents.to_string(),
        })
    }
}

/// Module specifiers imported or re-exported by a source file, in order.
pub fn import_specifiers(source: &str) -> Vec<String> {
    let Some(pattern) = import_pattern() else {
        return Vec::new();
    };
    pattern
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Resolve a specifier seen in a file under `from_dir`. Returns `None` for
/// package imports and specifiers that match no file.
pub fn resolve_specifier(specifier: &str, from_dir: &Path, aliases: &AliasMap) -> Option<PathBuf> {
    if specifier.starts_with('.') {
        return with_extensions(&normalize(&from_dir.join(specifier)));
    }

    aliases
        .candidates(specifier)
        .iter()
        .find_map(|candidate| with_extensions(candidate))
}

fn with_extensions(base: &Path) -> Option<PathBuf> {
    EXTENSION_CANDIDATES.iter().find_map(|suffix| {
        let mut raw: OsString = base.as_os_str().to_owned();
        raw.push(suffix);
        let path = PathBuf::from(raw);
        path.is_file().then_some(path)
    })
}

/// Search the import graph reachable from `entry` for a file containing the
/// literal `data-block-id="<tag>"`. Each file is visited at most once.
pub fn find_data_tag(
    root: &ProjectRoot,
    aliases: &AliasMap,
    entry: &Path,
    tag: &str,
) -> Result<Option<TaggedFile>, ToolError> {
    let needles = [
        format!("data-block-id=\"{}\"", tag),
        format!("data-block-id='{}'", tag),
    ];

    if !entry.is_file() {
        return Err(ToolError::MissingTarget(root.relative(entry)));
    }

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut stack = vec![entry.to_path_buf()];

    while let Some(path) = stack.pop() {
        if !visited.insert(path.clone()) {
            continue;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if path == entry => return Err(ToolError::io(&path, e)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable import");
                continue;
            }
        };

        if needles.iter().any(|needle| contents.contains(needle.as_str())) {
            tracing::debug!(path = %path.display(), files = visited.len(), "Found data-block-id");
            return Ok(Some(TaggedFile {
                path: root.relative(&path),
                contents,
            }));
        }

        let dir = path.parent().unwrap_or(root.path()).to_path_buf();
        let mut next: Vec<PathBuf> = import_specifiers(&contents)
            .iter()
            .filter_map(|spec| resolve_specifier(spec, &dir, aliases))
            .filter(|p| root.contains(p) && !visited.contains(p))
            .collect();
        // Reverse so the first import is explored first
        next.reverse();
        stack.extend(next);
    }

    tracing::debug!(tag, files = visited.len(), "data-block-id not found");
    Ok(None)
}
