//! # TSX Syntax Helpers
//!
//! Thin layer over tree-sitter's TSX grammar shared by the block-id pass and
//! the renderer splice: parsing, JSX element accessors and byte-range edits.

use crate::tools::error::ToolError;
use tree_sitter::{Node, Parser, Tree};

/// Parse TSX source. tree-sitter recovers from syntax errors, so a tree is
/// returned even for broken input; check `has_error()` where that matters.
pub fn parse_tsx(source: &str) -> Result<Tree, ToolError> {
    let mut parser = Parser::new();
    let tsx = tree_sitter_typescript::LANGUAGE_TSX;
    parser
        .set_language(&tsx.into())
        .map_err(|e| ToolError::Parse(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ToolError::Parse("parser produced no tree".to_string()))
}

pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Pre-order visit of `node` and every named descendant
pub fn visit<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    f(node);
    for child in named_children(node) {
        visit(child, f);
    }
}

/// The tag carrying the element's name and attributes: the opening element
/// of a `jsx_element`, or the self-closing element itself.
pub fn opening_tag(node: Node) -> Option<Node> {
    match node.kind() {
        "jsx_element" => node.child_by_field_name("open_tag"),
        "jsx_self_closing_element" => Some(node),
        _ => None,
    }
}

/// Tag name of an opening tag. Fragments (`<>`) have none.
pub fn tag_name<'s>(opening: Node, source: &'s str) -> Option<&'s str> {
    opening
        .child_by_field_name("name")
        .map(|name| node_text(name, source))
}

pub fn attribute_name<'s>(attribute: Node, source: &'s str) -> Option<&'s str> {
    named_children(attribute)
        .first()
        .map(|name| node_text(*name, source))
}

pub fn attribute_value(attribute: Node) -> Option<Node> {
    named_children(attribute).get(1).copied()
}

pub fn find_attribute<'t>(opening: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    named_children(opening)
        .into_iter()
        .filter(|child| child.kind() == "jsx_attribute")
        .find(|attr| attribute_name(*attr, source) == Some(name))
}

/// String literal contents without the surrounding quotes
pub fn string_literal<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    if node.kind() != "string" {
        return None;
    }
    let text = node_text(node, source);
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))?;
    Some(inner)
}

/// Number of `export default ...` statements at the top level
pub fn count_default_exports(tree: &Tree) -> usize {
    named_children(tree.root_node())
        .into_iter()
        .filter(|node| node.kind() == "export_statement")
        .filter(|node| {
            let mut cursor = node.walk();
            let is_default = node.children(&mut cursor).any(|c| c.kind() == "default");
            is_default
        })
        .count()
}

/// Leading whitespace of the line that contains `byte`
pub fn line_indent(source: &str, byte: usize) -> &str {
    let line_start = source[..byte].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &source[line_start..byte];
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// A replacement of `start..end` with `text`. Insertions have `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, "")
    }
}

/// Apply non-overlapping edits computed against `source`. Edits are applied
/// back to front so earlier offsets stay valid.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    let mut out = source.to_string();
    for edit in edits {
        if edit.start <= edit.end && edit.end <= out.len() {
            out.replace_range(edit.start..edit.end, &edit.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_find_attribute() {
        let source = r#"const x = <Button variant="ghost" data-block-id="b1">Go</Button>;"#;
        let tree = parse_tsx(source).unwrap();
        assert!(!tree.root_node().has_error());

        let mut names = Vec::new();
        let mut ids = Vec::new();
        visit(tree.root_node(), &mut |node| {
            if let Some(open) = opening_tag(node) {
                names.push(tag_name(open, source).unwrap_or("").to_string());
                if let Some(attr) = find_attribute(open, "data-block-id", source) {
                    let value = attribute_value(attr).unwrap();
                    ids.push(string_literal(value, source).unwrap().to_string());
                }
            }
        });
        assert_eq!(names, vec!["Button"]);
        assert_eq!(ids, vec!["b1"]);
    }

    #[test]
    fn test_count_default_exports() {
        let one = parse_tsx("export default function A() { return <div />; }").unwrap();
        assert_eq!(count_default_exports(&one), 1);

        let two = parse_tsx("export default function A() {}\nexport default B;").unwrap();
        assert_eq!(count_default_exports(&two), 2);

        let none = parse_tsx("export function A() {}").unwrap();
        assert_eq!(count_default_exports(&none), 0);
    }

    #[test]
    fn test_apply_edits_back_to_front() {
        let out = apply_edits(
            "abcdef",
            vec![Edit::insert(1, "X"), Edit::replace(3, 5, "Y"), Edit::delete(5, 6)],
        );
        assert_eq!(out, "aXbcY");
    }

    #[test]
    fn test_line_indent() {
        let source = "a\n    <div>\n";
        let at = source.find('<').unwrap();
        assert_eq!(line_indent(source, at), "    ");
    }
}
