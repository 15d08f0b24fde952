//! Dependency entry locations in package.json text

use tracing::warn;

/// Dependency field names whose entries are located
const DEPENDENCY_FIELDS: [&str; 2] = ["dependencies", "devDependencies"];

/// Error type for locating dependency entries
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("Failed to parse JSON")]
    ParseFailed,
}

/// Zero-based position, `character` counted in UTF-16 code units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextPosition {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

/// A `"name": "version"` pair found in a dependency section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLocation {
    pub name: String,
    pub version: String,
    /// Span of the whole pair, from the opening quote of the name to the
    /// closing quote of the version
    pub range: TextRange,
}

/// Find every string-valued entry of the top-level dependency sections.
///
/// Entries are returned in document order; a name declared in both sections
/// is returned once per occurrence.
pub fn locate_dependencies(content: &str) -> Result<Vec<DependencyLocation>, LocateError> {
    let mut parser = tree_sitter::Parser::new();
    let language = tree_sitter_json::LANGUAGE;
    parser.set_language(&language.into()).map_err(|e| {
        warn!("Failed to set JSON language for tree-sitter: {}", e);
        LocateError::TreeSitter(e.to_string())
    })?;

    let tree = parser.parse(content, None).ok_or(LocateError::ParseFailed)?;

    let root = tree.root_node();
    let mut results = Vec::new();

    if let Some(document) = root.child(0)
        && document.kind() == "object"
    {
        let mut cursor = document.walk();
        for pair in document.children(&mut cursor) {
            if pair.kind() != "pair" {
                continue;
            }

            let Some(key_node) = pair.child_by_field_name("key") else {
                continue;
            };

            if !DEPENDENCY_FIELDS.contains(&string_value(key_node, content)) {
                continue;
            }

            if let Some(value_node) = pair.child_by_field_name("value")
                && value_node.kind() == "object"
            {
                collect_entries(value_node, content, &mut results);
            }
        }
    }

    Ok(results)
}

fn collect_entries(object_node: tree_sitter::Node, content: &str, results: &mut Vec<DependencyLocation>) {
    let mut cursor = object_node.walk();

    for pair in object_node.children(&mut cursor) {
        if pair.kind() != "pair" {
            continue;
        }

        let (Some(key_node), Some(value_node)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            continue;
        };

        if value_node.kind() != "string" {
            continue;
        }

        results.push(DependencyLocation {
            name: string_value(key_node, content).to_string(),
            version: string_value(value_node, content).to_string(),
            range: TextRange {
                start: position_at(content, key_node.start_byte()),
                end: position_at(content, value_node.end_byte()),
            },
        });
    }
}

/// Get the string value from a string node (removes quotes)
fn string_value<'a>(node: tree_sitter::Node, content: &'a str) -> &'a str {
    content[node.byte_range()]
        .trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
}

/// Convert a byte offset into an LSP position
pub fn position_at(content: &str, byte_offset: usize) -> TextPosition {
    let byte_offset = byte_offset.min(content.len());
    let before = &content[..byte_offset];
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);

    TextPosition {
        line: before.matches('\n').count() as u32,
        character: before[line_start..].encode_utf16().count() as u32,
    }
}
