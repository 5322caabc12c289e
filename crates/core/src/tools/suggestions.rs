//! # Path Suggestions
//!
//! Lists project entries as `@`-prefixed mentions for the chat input's
//! autocomplete, grouped by their top-level directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionEntry {
    pub path: String,
    #[serde(rename = "isFolder")]
    pub is_folder: bool,
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
}

/// Pre-order listing of everything under `root`, keyed by first path
/// component. Folders end in `/`. Root-level files are keyed by their own name.
pub fn list_project_entries(root: &Path) -> BTreeMap<String, Vec<SuggestionEntry>> {
    let mut groups: BTreeMap<String, Vec<SuggestionEntry>> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e));

    for entry in walker.filter_map(|e| e.ok()) {
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some(first) = parts.first() else {
            continue;
        };

        let is_folder = entry.file_type().is_dir();
        let mut path = format!("@{}", parts.join("/"));
        if is_folder {
            path.push('/');
        }

        groups
            .entry(first.clone())
            .or_default()
            .push(SuggestionEntry { path, is_folder });
    }

    groups
}
