//! Go parser using tree-sitter
//!
//! Extracts function and method declarations, with the bare name of each
//! method's receiver type, from Go source code.

use crate::models::FunctionLocation;
use crate::parsers::ScanError;
use std::path::Path;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator};

const DECLARATION_QUERY: &str = r#"
    (function_declaration
        name: (identifier) @func_name
    ) @func

    (method_declaration
        receiver: (parameter_list) @receiver
        name: (field_identifier) @method_name
    ) @method
"#;

/// Parse a Go file and return every declaration it contains
pub fn parse(path: &Path, filename: &str) -> Result<Vec<FunctionLocation>, ScanError> {
    let source = std::fs::read_to_string(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_source(&source, filename)
}

/// Parse Go source code directly (useful for testing)
pub fn parse_source(source: &str, filename: &str) -> Result<Vec<FunctionLocation>, ScanError> {
    let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ScanError::Grammar(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ScanError::Syntax {
            filename: filename.to_string(),
            line: 1,
        })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(ScanError::Syntax {
            filename: filename.to_string(),
            line: first_error_row(root).unwrap_or(0) + 1,
        });
    }

    let query =
        Query::new(&language, DECLARATION_QUERY).map_err(|e| ScanError::Grammar(e.to_string()))?;
    let source_bytes = source.as_bytes();
    let mut locations = Vec::new();

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, source_bytes);

    while let Some(m) = matches.next() {
        let mut decl_node = None;
        let mut name = String::new();
        let mut receiver_node = None;

        for capture in m.captures.iter() {
            match query.capture_names()[capture.index as usize] {
                "func" | "method" => decl_node = Some(capture.node),
                "func_name" | "method_name" => {
                    name = capture.node.utf8_text(source_bytes).unwrap_or("").to_string();
                }
                "receiver" => receiver_node = Some(capture.node),
                _ => {}
            }
        }

        if let Some(node) = decl_node {
            let receiver = receiver_node
                .map(|r| receiver_type_name(r, source_bytes))
                .unwrap_or_default();

            locations.push(FunctionLocation {
                filename: filename.to_string(),
                line: node.start_position().row as u32 + 1,
                function: name,
                receiver,
            });
        }
    }

    Ok(locations)
}

/// Row of the first error or missing node below `node`
fn first_error_row(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(row) = first_error_row(child) {
            return Some(row);
        }
    }
    Some(node.start_position().row)
}

/// Resolve the receiver parameter list to its bare type name.
///
/// `(s *Stack[T])`, `(s Stack[T])`, `(*Stack)` and `(Stack)` all give `Stack`.
fn receiver_type_name(receiver: Node, source: &[u8]) -> String {
    let mut cursor = receiver.walk();
    for child in receiver.named_children(&mut cursor) {
        if child.kind() == "parameter_declaration" {
            if let Some(type_node) = child.child_by_field_name("type") {
                return bare_type_name(type_node, source);
            }
        }
    }
    String::new()
}

fn bare_type_name(node: Node, source: &[u8]) -> String {
    match node.kind() {
        "type_identifier" => node.utf8_text(source).unwrap_or("").to_string(),
        "pointer_type" | "parenthesized_type" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).next();
            match inner {
                Some(inner) => bare_type_name(inner, source),
                None => String::new(),
            }
        }
        "generic_type" => node
            .child_by_field_name("type")
            .map(|t| bare_type_name(t, source))
            .unwrap_or_default(),
        _ => {
            // Fall back to the text with pointer and type arguments stripped
            let text = node.utf8_text(source).unwrap_or("");
            text.trim_start_matches(['*', '(', ' '])
                .split(['[', ')', ' '])
                .next()
                .unwrap_or("")
                .to_string()
        }
    }
}
