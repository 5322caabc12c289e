//! # Import Aliases
//!
//! Reads `compilerOptions.paths` from the project's tsconfig so that
//! `@suggestions/Card` style specifiers can be followed like relative ones.

use crate::tools::project::normalize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
struct TsConfig {
    #[serde(rename = "compilerOptions", default)]
    compiler_options: CompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
struct CompilerOptions {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    #[serde(default)]
    paths: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
struct AliasEntry {
    /// Pattern text before the `*` (or the whole pattern when exact)
    prefix: String,
    wildcard: bool,
    targets: Vec<String>,
}

/// Alias table keyed by specifier prefix. More specific prefixes win.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    base: PathBuf,
    entries: Vec<AliasEntry>,
}

impl AliasMap {
    /// Load aliases from `<root>/<config_file>`. A missing or unreadable
    /// config yields an empty map; only relative imports are followed then.
    pub fn load(root: &Path, config_file: &str) -> Self {
        let path = root.join(config_file);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No alias config");
                return Self::empty(root);
            }
        };

        match serde_json::from_str::<TsConfig>(&strip_jsonc(&text)) {
            Ok(config) => {
                let base = root.join(config.compiler_options.base_url.as_deref().unwrap_or("."));
                let map = Self::from_paths(&base, config.compiler_options.paths);
                tracing::info!(aliases = map.len(), "Loaded import aliases");
                map
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Alias config is not valid JSON, ignoring");
                Self::empty(root)
            }
        }
    }

    pub fn empty(root: &Path) -> Self {
        Self {
            base: root.to_path_buf(),
            entries: Vec::new(),
        }
    }

    pub fn from_paths(base: &Path, paths: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let mut entries: Vec<AliasEntry> = paths
            .into_iter()
            .map(|(pattern, targets)| match pattern.strip_suffix('*') {
                Some(prefix) => AliasEntry {
                    prefix: prefix.to_string(),
                    wildcard: true,
                    targets,
                },
                None => AliasEntry {
                    prefix: pattern,
                    wildcard: false,
                    targets,
                },
            })
            .collect();
        entries.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Self {
            base: normalize(base),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidate locations for a bare specifier, most specific alias first.
    /// Extensions are not applied here.
    pub fn candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for entry in &self.entries {
            let rest = if entry.wildcard {
                match specifier.strip_prefix(entry.prefix.as_str()) {
                    Some(rest) => rest,
                    None => continue,
                }
            } else if specifier == entry.prefix {
                ""
            } else {
                continue;
            };

            for target in &entry.targets {
                let target = target.replacen('*', rest, 1);
                out.push(normalize(&self.base.join(target)));
            }
        }
        out
    }
}

/// tsconfig files are JSONC: drop comments and trailing commas so serde_json
/// accepts them. String contents such as `"@/*"` are left untouched.
fn strip_jsonc(text: &str) -> String {
    let mut without_comments = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            without_comments.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        without_comments.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                without_comments.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        without_comments.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                without_comments.push(' ');
            }
            _ => without_comments.push(c),
        }
    }

    let mut out = String::with_capacity(without_comments.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in without_comments.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = without_comments[i + 1..].trim_start().chars().next();
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> AliasMap {
        AliasMap::from_paths(
            Path::new("/srv/app"),
            vec![
                ("@/*".to_string(), vec!["./*".to_string()]),
                (
                    "@suggestions/*".to_string(),
                    vec!["./components/suggestions/*".to_string()],
                ),
                ("@ui/*".to_string(), vec!["./components/ui/*".to_string()]),
                ("theme".to_string(), vec!["./lib/theme.ts".to_string()]),
            ],
        )
    }

    #[test]
    fn test_specific_alias_wins() {
        let candidates = map().candidates("@suggestions/Card");
        assert_eq!(
            candidates.first(),
            Some(&PathBuf::from("/srv/app/components/suggestions/Card"))
        );
    }

    #[test]
    fn test_exact_alias() {
        assert_eq!(
            map().candidates("theme"),
            vec![PathBuf::from("/srv/app/lib/theme.ts")]
        );
    }

    #[test]
    fn test_package_specifier_has_no_candidates() {
        assert!(map().candidates("react").is_empty());
    }

    #[test]
    fn test_load_from_tsconfig() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tsconfig.json"),
            r#"{"compilerOptions":{"baseUrl":".","paths":{"@ui/*":["./components/ui/*"]}}}"#,
        )
        .unwrap();

        let aliases = AliasMap::load(dir.path(), "tsconfig.json");
        assert_eq!(aliases.len(), 1);
        assert_eq!(
            aliases.candidates("@ui/button"),
            vec![normalize(&dir.path().join("components/ui/button"))]
        );
    }

    #[test]
    fn test_load_tsconfig_with_comments_and_trailing_commas() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tsconfig.json"),
            r#"{
  // generated by create-next-app
  "compilerOptions": {
    /* module resolution */
    "baseUrl": ".",
    "paths": {
      "@/*": ["./*",],
    },
  },
}
"#,
        )
        .unwrap();

        let aliases = AliasMap::load(dir.path(), "tsconfig.json");
        assert_eq!(aliases.len(), 1);
        assert_eq!(
            aliases.candidates("@/lib/utils"),
            vec![normalize(&dir.path().join("lib/utils"))]
        );
    }

    #[test]
    fn test_missing_config_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AliasMap::load(dir.path(), "tsconfig.json").is_empty());
    }
}
