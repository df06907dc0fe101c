//! Rename rides on the reference engine: the same trimmed reference set,
//! grouped per file into a workspace edit.

use super::references::collect_reference_set;
use crate::document::DocumentManager;
use lsp_types::{
    PrepareRenameResponse, Range, TextEdit, Uri, WorkspaceEdit,
};
use std::collections::HashMap;

pub struct RenameProvider;

impl RenameProvider {
    pub fn new() -> Self {
        Self
    }

    /// Validate that the cursor sits on a renameable site and hand the
    /// editor the exact range and current text. A position that the
    /// reference engine itself does not report refuses the rename.
    pub fn prepare(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        manager: &DocumentManager,
    ) -> Option<PrepareRenameResponse> {
        let set = collect_reference_set(uri, position, manager)?;
        let range = set
            .locations
            .iter()
            .find(|location| &location.uri == uri && range_contains(location.range, position))
            .map(|location| location.range)?;
        let placeholder = slice_range(&manager.get(uri)?.text, range)?;
        Some(PrepareRenameResponse::RangeWithPlaceholder { range, placeholder })
    }

    pub fn rename(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        new_name: &str,
        manager: &DocumentManager,
    ) -> Option<WorkspaceEdit> {
        if !is_valid_name(new_name) {
            return None;
        }
        let set = collect_reference_set(uri, position, manager)?;
        if !set
            .locations
            .iter()
            .any(|location| &location.uri == uri && range_contains(location.range, position))
        {
            return None;
        }

        let mut changes: HashMap<Uri, Vec<TextEdit>> = HashMap::new();
        for location in set.locations {
            changes.entry(location.uri).or_default().push(TextEdit {
                range: location.range,
                new_text: new_name.to_string(),
            });
        }

        Some(WorkspaceEdit {
            changes: Some(changes),
            document_changes: None,
            change_annotations: None,
        })
    }
}

impl Default for RenameProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn range_contains(range: Range, position: lsp_types::Position) -> bool {
    range.start <= position && position <= range.end
}

/// The text under a single-line range.
fn slice_range(text: &str, range: Range) -> Option<String> {
    let line = text.lines().nth(range.start.line as usize)?;
    let start = range.start.character as usize;
    let end = (range.end.character as usize).min(line.chars().count());
    if start > end {
        return None;
    }
    Some(line.chars().skip(start).take(end - start).collect())
}

/// New names must be plain identifiers; the case decides whether the editor
/// is renaming a value or a type, so either case is allowed.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(is_valid_name("newName"));
        assert!(is_valid_name("NewType"));
        assert!(is_valid_name("with_underscore"));
    }

    #[test]
    fn rejects_operators_and_empty() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("a-b"));
        assert!(!is_valid_name("a.b"));
    }

    #[test]
    fn slices_a_single_line_range() {
        let text = "module Main exposing (..)\n\ntotal =\n    add 1 2\n";
        let range = Range {
            start: lsp_types::Position::new(3, 4),
            end: lsp_types::Position::new(3, 7),
        };
        assert_eq!(slice_range(text, range), Some("add".to_string()));
    }
}
