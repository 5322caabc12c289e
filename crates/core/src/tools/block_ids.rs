//! # Block Identifiers
//!
//! Stamps `data-block-id` attributes onto the JSX returned by a file's
//! exported components so the live page can be mapped back to source, and
//! removes them again.
//!
//! ## Rules
//!
//! - The outermost returned element is always stamped (fragments are only descended into)
//! - Capitalised tags (imported or local components) are stamped
//! - `div`, `section` and `main` are stamped when they carry a `className`
//! - Values are `<root-relative path> line=<N>` where N is the opening tag's line;
//!   further elements opening on the same line get `line=<N>.2`, `line=<N>.3`, ...
//!
//! Attributes are inserted right after the tag name, so stripping them
//! restores the original bytes.

use crate::tools::error::ToolError;
use crate::tools::project::ProjectRoot;
use crate::tools::tsx::{
    self, apply_edits, attribute_value, find_attribute, named_children, node_text, opening_tag,
    tag_name, Edit,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tree_sitter::{Node, Tree};

pub const BLOCK_ID_ATTRIBUTE: &str = "data-block-id";

const CONTAINER_TAGS: &[&str] = &["div", "section", "main"];

/// How existing attributes are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectMode {
    /// Every stamped element gets the canonical `path line=N[.k]` value
    Canonical,
    /// Existing values are left alone; only missing ones are added
    FillMissing,
}

/// Result of an inject or strip pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotated {
    pub source: String,
    pub changed: bool,
    pub edits: usize,
}

impl Annotated {
    fn unchanged(source: &str) -> Self {
        Self {
            source: source.to_string(),
            changed: false,
            edits: 0,
        }
    }
}

pub fn block_id(rel_path: &str, line: usize) -> String {
    format!("{} line={}", rel_path, line)
}

fn is_function(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration" | "function_expression" | "function" | "arrow_function"
    )
}

fn is_jsx(kind: &str) -> bool {
    matches!(
        kind,
        "jsx_element" | "jsx_self_closing_element" | "jsx_fragment"
    )
}

fn unwrap_parens(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Functions declared by a `const X = () => ...` style declaration
fn declared_functions<'t>(decl: Node<'t>, only: Option<&str>, source: &str, out: &mut Vec<Node<'t>>) {
    for declarator in named_children(decl) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let name = declarator
            .child_by_field_name("name")
            .map(|n| node_text(n, source));
        if only.is_some() && name != only {
            continue;
        }
        if let Some(value) = declarator.child_by_field_name("value") {
            if is_function(value.kind()) {
                out.push(value);
            }
        }
    }
}

/// Component functions reachable through the file's exports
fn exported_functions<'t>(tree: &'t Tree, source: &str) -> Vec<Node<'t>> {
    let top = named_children(tree.root_node());
    let mut functions = Vec::new();
    let mut default_ident: Option<&str> = None;

    for node in &top {
        if node.kind() != "export_statement" {
            continue;
        }
        if let Some(decl) = node.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" => functions.push(decl),
                "lexical_declaration" | "variable_declaration" => {
                    declared_functions(decl, None, source, &mut functions)
                }
                _ => {}
            }
        } else if let Some(value) = node.child_by_field_name("value") {
            let value = unwrap_parens(value);
            if value.kind() == "identifier" {
                default_ident = Some(node_text(value, source));
            } else if is_function(value.kind()) {
                functions.push(value);
            }
        }
    }

    if let Some(name) = default_ident {
        for node in &top {
            match node.kind() {
                "function_declaration" => {
                    if node.child_by_field_name("name").map(|n| node_text(n, source)) == Some(name) {
                        functions.push(*node);
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    declared_functions(*node, Some(name), source, &mut functions)
                }
                _ => {}
            }
        }
    }

    functions
}

/// `return` statements of a function body, not descending into nested functions
fn collect_returns<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    for child in named_children(node) {
        if child.kind() == "return_statement" {
            out.push(child);
        } else if !is_function(child.kind()) {
            collect_returns(child, out);
        }
    }
}

/// Root JSX expressions returned by the exported components
fn returned_jsx<'t>(tree: &'t Tree, source: &str) -> Vec<Node<'t>> {
    let mut roots = Vec::new();
    for function in exported_functions(tree, source) {
        let Some(body) = function.child_by_field_name("body") else {
            continue;
        };
        if body.kind() == "statement_block" {
            let mut returns = Vec::new();
            collect_returns(body, &mut returns);
            for ret in returns {
                if let Some(expr) = named_children(ret).into_iter().next() {
                    let expr = unwrap_parens(expr);
                    if is_jsx(expr.kind()) {
                        roots.push(expr);
                    }
                }
            }
        } else {
            let expr = unwrap_parens(body);
            if is_jsx(expr.kind()) {
                roots.push(expr);
            }
        }
    }
    roots
}

fn should_stamp(opening: Node, name: &str, source: &str) -> bool {
    let capitalised = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    capitalised
        || (CONTAINER_TAGS.contains(&name) && find_attribute(opening, "className", source).is_some())
}

/// Every `data-block-id` value present anywhere in the file
pub fn existing_block_ids(source: &str) -> Result<Vec<String>, ToolError> {
    let tree = tsx::parse_tsx(source)?;
    let mut ids = Vec::new();
    tsx::visit(tree.root_node(), &mut |node| {
        if node.kind() == "jsx_attribute"
            && tsx::attribute_name(node, source) == Some(BLOCK_ID_ATTRIBUTE)
        {
            if let Some(value) = attribute_value(node).and_then(|v| tsx::string_literal(v, source)) {
                ids.push(value.to_string());
            }
        }
    });
    Ok(ids)
}

fn unique_id(rel_path: &str, line: usize, taken: &mut HashSet<String>) -> String {
    let mut candidate = block_id(rel_path, line);
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}.{}", block_id(rel_path, line), n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Stamp block ids onto `source`, which lives at `rel_path` under the project root.
pub fn inject_block_ids(source: &str, rel_path: &str, mode: InjectMode) -> Result<Annotated, ToolError> {
    let tree = tsx::parse_tsx(source)?;
    if tree.root_node().has_error() {
        return Err(ToolError::Parse(format!(
            "{} has syntax errors; no block ids were stamped",
            rel_path
        )));
    }

    // Canonical ids are assigned in document order, so re-runs reproduce them
    let mut taken: HashSet<String> = match mode {
        InjectMode::Canonical => HashSet::new(),
        InjectMode::FillMissing => existing_block_ids(source)?.into_iter().collect(),
    };
    let mut seen: HashSet<usize> = HashSet::new();
    let mut edits: Vec<Edit> = Vec::new();

    for root in returned_jsx(&tree, source) {
        tsx::visit(root, &mut |node| {
            let Some(open) = opening_tag(node) else {
                return;
            };
            if !seen.insert(open.start_byte()) {
                return;
            }
            let (Some(name_node), Some(name)) = (open.child_by_field_name("name"), tag_name(open, source))
            else {
                return;
            };
            let line = open.start_position().row + 1;

            match find_attribute(open, BLOCK_ID_ATTRIBUTE, source) {
                Some(attr) => {
                    if mode == InjectMode::FillMissing {
                        return;
                    }
                    let quoted = format!("\"{}\"", unique_id(rel_path, line, &mut taken));
                    match attribute_value(attr) {
                        Some(value) if node_text(value, source) == quoted => {}
                        Some(value) => {
                            edits.push(Edit::replace(value.start_byte(), value.end_byte(), quoted))
                        }
                        None => edits.push(Edit::replace(
                            attr.start_byte(),
                            attr.end_byte(),
                            format!("{}={}", BLOCK_ID_ATTRIBUTE, quoted),
                        )),
                    }
                }
                None if node == root || should_stamp(open, name, source) => {
                    edits.push(Edit::insert(
                        name_node.end_byte(),
                        format!(
                            " {}=\"{}\"",
                            BLOCK_ID_ATTRIBUTE,
                            unique_id(rel_path, line, &mut taken)
                        ),
                    ));
                }
                None => {}
            }
        });
    }

    if edits.is_empty() {
        return Ok(Annotated::unchanged(source));
    }
    let count = edits.len();
    Ok(Annotated {
        source: apply_edits(source, edits),
        changed: true,
        edits: count,
    })
}

/// Byte range to delete for an attribute spanning `start..end`
fn removal_range(source: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = source.as_bytes();
    let is_blank = |b: u8| b == b' ' || b == b'\t';

    let mut from = start;
    while from > 0 && is_blank(bytes[from - 1]) {
        from -= 1;
    }

    if from > 0 && bytes[from - 1] == b'\n' {
        let mut probe = end;
        while probe < bytes.len() && is_blank(bytes[probe]) {
            probe += 1;
        }
        if probe < bytes.len() && bytes[probe] == b'\n' {
            // attribute had the line to itself
            return (from, probe + 1);
        }
        return (start, probe);
    }

    (from, end)
}

/// Remove every `data-block-id` attribute from `source`.
pub fn strip_block_ids(source: &str) -> Result<Annotated, ToolError> {
    let tree = tsx::parse_tsx(source)?;
    let mut edits = Vec::new();

    tsx::visit(tree.root_node(), &mut |node| {
        if node.kind() == "jsx_attribute"
            && tsx::attribute_name(node, source) == Some(BLOCK_ID_ATTRIBUTE)
        {
            let (from, to) = removal_range(source, node.start_byte(), node.end_byte());
            edits.push(Edit::delete(from, to));
        }
    });

    if edits.is_empty() {
        return Ok(Annotated::unchanged(source));
    }
    let count = edits.len();
    Ok(Annotated {
        source: apply_edits(source, edits),
        changed: true,
        edits: count,
    })
}

/// Which pass the CLI runs over a set of files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIdPass {
    Inject,
    Strip,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PassReport {
    pub scanned: usize,
    pub changed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

fn expand_patterns(root: &ProjectRoot, patterns: &[String]) -> Result<Vec<PathBuf>, ToolError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let absolute = root.path().join(pattern.trim_start_matches("./"));
        let entries = glob::glob(&absolute.to_string_lossy())
            .map_err(|e| ToolError::invalid("glob", format!("{}: {}", pattern, e)))?;
        for path in entries.filter_map(Result::ok) {
            if path.is_file() && root.contains(&path) && !files.contains(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Run an inject or strip pass over every file matching `patterns`
/// (resolved against the project root). Files are rewritten in place.
pub async fn run_pass(
    root: &ProjectRoot,
    patterns: &[String],
    pass: BlockIdPass,
) -> Result<PassReport, ToolError> {
    let mut report = PassReport::default();

    for path in expand_patterns(root, patterns)? {
        report.scanned += 1;
        let rel = root.relative(&path);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io(&path, e))?;

        let result = match pass {
            BlockIdPass::Inject => inject_block_ids(&source, &rel, InjectMode::Canonical),
            BlockIdPass::Strip => strip_block_ids(&source),
        };

        match result {
            Ok(annotated) if annotated.changed => {
                tokio::fs::write(&path, annotated.source)
                    .await
                    .map_err(|e| ToolError::io(&path, e))?;
                tracing::info!(path = %rel, edits = annotated.edits, ?pass, "Rewrote block ids");
                report.changed.push(rel);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %rel, error = %e, "Block id pass failed");
                report.failed.push((rel, e.to_string()));
            }
        }
    }

    Ok(report)
}
