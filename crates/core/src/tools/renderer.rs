//! # Renderer Splice
//!
//! The host renderer is a TSX file with exactly one
//! `<div id="code-renderer">...</div>` marker. Splicing a component replaces
//! the marker's children with `<Name />` and makes sure the renderer imports
//! it. Splicing the same name twice is a no-op.

use crate::tools::error::ToolError;
use crate::tools::tsx::{self, apply_edits, find_attribute, named_children, Edit};
use tree_sitter::{Node, Tree};

pub const RENDERER_MARKER_ID: &str = "code-renderer";

/// Component names become file names and JSX tags, so only plain identifiers pass.
pub fn is_component_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Locate the single marker element. Returns `(inner_start, inner_end, indent_at)`.
fn marker_range(tree: &Tree, source: &str) -> Result<(usize, usize, usize), ToolError> {
    let mut markers: Vec<Node> = Vec::new();
    tsx::visit(tree.root_node(), &mut |node| {
        if node.kind() == "jsx_element" && is_marker(node, source) {
            markers.push(node);
        }
    });

    match markers.as_slice() {
        [marker] => {
            let open = marker.child_by_field_name("open_tag");
            let close = marker.child_by_field_name("close_tag");
            match (open, close) {
                (Some(open), Some(close)) => {
                    Ok((open.end_byte(), close.start_byte(), open.start_byte()))
                }
                _ => Err(ToolError::RendererShapeViolation(
                    "renderer marker has no closing tag".to_string(),
                )),
            }
        }
        [] => Err(ToolError::RendererShapeViolation(format!(
            "no <div id=\"{}\"> marker in renderer",
            RENDERER_MARKER_ID
        ))),
        many => Err(ToolError::RendererShapeViolation(format!(
            "{} <div id=\"{}\"> markers in renderer, expected one",
            many.len(),
            RENDERER_MARKER_ID
        ))),
    }
}

fn is_marker(element: Node, source: &str) -> bool {
    let Some(open) = element.child_by_field_name("open_tag") else {
        return false;
    };
    if tsx::tag_name(open, source) != Some("div") {
        return false;
    }
    find_attribute(open, "id", source)
        .and_then(tsx::attribute_value)
        .and_then(|value| tsx::string_literal(value, source))
        == Some(RENDERER_MARKER_ID)
}

/// Check the renderer without changing it.
pub fn check_renderer_shape(source: &str) -> Result<(), ToolError> {
    let tree = tsx::parse_tsx(source)?;
    marker_range(&tree, source).map(|_| ())
}

/// Replace the marker's children with `<name />` and add
/// `import name from '<prefix><name>';` when it is missing.
pub fn splice_renderer(source: &str, name: &str, import_prefix: &str) -> Result<String, ToolError> {
    if !is_component_name(name) {
        return Err(ToolError::invalid(
            "update_code_renderer",
            format!("'{}' is not a valid component name", name),
        ));
    }

    let tree = tsx::parse_tsx(source)?;
    let (inner_start, inner_end, open_start) = marker_range(&tree, source)?;
    let indent = tsx::line_indent(source, open_start);

    let mut edits = vec![Edit::replace(
        inner_start,
        inner_end,
        format!("\n{indent}  <{name} />\n{indent}"),
    )];

    let module = format!("{}{}", import_prefix, name);
    let imports: Vec<Node> = named_children(tree.root_node())
        .into_iter()
        .filter(|node| node.kind() == "import_statement")
        .collect();

    let already_imported = imports.iter().any(|import| {
        import
            .child_by_field_name("source")
            .and_then(|src| tsx::string_literal(src, source))
            == Some(module.as_str())
    });

    if !already_imported {
        let statement = format!("import {} from '{}';", name, module);
        match imports.last() {
            Some(last) => edits.push(Edit::insert(last.end_byte(), format!("\n{}", statement))),
            None => edits.push(Edit::insert(0, format!("{}\n\n", statement))),
        }
    }

    let spliced = apply_edits(source, edits);
    tracing::debug!(component = name, imported = !already_imported, "Spliced renderer");
    Ok(spliced)
}
