//! Dot-triggered completion: qualify, widen the qualifier through alias
//! mapping, then offer the target module's exposed names, its package-doc
//! entries, and the next dotted segment of any deeper module.

use crate::document::DocumentManager;
use elmls_core::ast::{Declaration, Module};
use elmls_core::exposing;
use elmls_core::project::Project;
use elmls_core::ImportTracker;
use lsp_types::{CompletionItem, CompletionItemKind, Uri};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct CompletionProvider;

impl CompletionProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn provide(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        manager: &DocumentManager,
    ) -> Vec<CompletionItem> {
        let Some(document) = manager.get(uri) else {
            return Vec::new();
        };
        let Some(qualifier) = qualifier_before_cursor(&document.text, position) else {
            return Vec::new();
        };

        // The buffer usually fails to parse right after the trigger dot, so
        // fall back to a header-only parse for the import tables.
        let tracker = match manager.ast_for(uri) {
            Some(ast) => ImportTracker::new(&ast),
            None => match header_only_parse(manager, &document.text) {
                Some(ast) => ImportTracker::new(&ast),
                None => return Vec::new(),
            },
        };

        let project = manager.project_for(uri);
        let targets = tracker.resolve_qualifier(&qualifier);

        let mut items = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for target in &targets {
            if let Some(project) = project.as_deref() {
                if let Some((_, ast)) = manager.module_ast(project, target) {
                    exposed_completions(&ast, &mut seen, &mut items);
                }
                docs_completions(manager, project, target, &mut seen, &mut items);
            }
        }

        if let Some(project) = project.as_deref() {
            submodule_completions(manager, project, &qualifier, &mut seen, &mut items);
        }

        items
    }
}

impl Default for CompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// The dotted upper-case path immediately before the cursor, which must sit
/// right after a `.`: `H.` yields `H`, `Json.Decode.` yields `Json.Decode`.
fn qualifier_before_cursor(text: &str, position: lsp_types::Position) -> Option<String> {
    let line = text.lines().nth(position.line as usize)?;
    let upto: String = line.chars().take(position.character as usize).collect();
    if !upto.ends_with('.') {
        return None;
    }
    let trimmed = &upto[..upto.len() - 1];
    let start = trimmed
        .char_indices()
        .rev()
        .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_' || *ch == '.'))
        .map(|(index, ch)| index + ch.len_utf8())
        .unwrap_or(0);
    let candidate = &trimmed[start..];
    let valid = !candidate.is_empty()
        && candidate
            .split('.')
            .all(|segment| segment.chars().next().is_some_and(char::is_uppercase));
    valid.then(|| candidate.to_string())
}

/// Parse only the header and import lines, enough to rebuild the tracker
/// while the body is mid-edit.
fn header_only_parse(manager: &DocumentManager, text: &str) -> Option<Arc<Module>> {
    let header: String = text
        .lines()
        .filter(|line| {
            line.starts_with("module ")
                || line.starts_with("port module ")
                || line.starts_with("effect module ")
                || line.starts_with("import ")
        })
        .collect::<Vec<_>>()
        .join("\n");
    if header.is_empty() {
        return None;
    }
    manager.parse_source(&header)
}

fn exposed_completions(ast: &Module, seen: &mut BTreeSet<String>, items: &mut Vec<CompletionItem>) {
    for declaration in &ast.declarations {
        match declaration {
            Declaration::CustomType(type_decl) => {
                push_exposed(ast, &type_decl.name.node, CompletionItemKind::ENUM, seen, items);
                for ctor in &type_decl.constructors {
                    push_exposed(
                        ast,
                        &ctor.name.node,
                        CompletionItemKind::ENUM_MEMBER,
                        seen,
                        items,
                    );
                }
            }
            Declaration::TypeAlias(alias) => {
                push_exposed(ast, &alias.name.node, CompletionItemKind::STRUCT, seen, items);
            }
            _ => {
                if let Some(name) = declaration.name() {
                    push_exposed(ast, &name.node, CompletionItemKind::FUNCTION, seen, items);
                }
            }
        }
    }
}

fn push_exposed(
    ast: &Module,
    name: &str,
    kind: CompletionItemKind,
    seen: &mut BTreeSet<String>,
    items: &mut Vec<CompletionItem>,
) {
    if !exposing::is_exposed_from_module(ast, name) || !seen.insert(name.to_string()) {
        return;
    }
    items.push(CompletionItem {
        label: name.to_string(),
        kind: Some(kind),
        ..Default::default()
    });
}

fn docs_completions(
    manager: &DocumentManager,
    project: &Project,
    target: &str,
    seen: &mut BTreeSet<String>,
    items: &mut Vec<CompletionItem>,
) {
    for dependency in &project.dependencies {
        let docs = manager.projects().load_docs(dependency);
        let Some(module) = docs.iter().find(|m| m.name == target) else {
            continue;
        };
        for value in module.values.iter().chain(module.binops.iter()) {
            if seen.insert(value.name.clone()) {
                items.push(CompletionItem {
                    label: value.name.clone(),
                    kind: Some(CompletionItemKind::FUNCTION),
                    detail: Some(value.type_.clone()),
                    ..Default::default()
                });
            }
        }
        for alias in &module.aliases {
            if seen.insert(alias.name.clone()) {
                items.push(CompletionItem {
                    label: alias.name.clone(),
                    kind: Some(CompletionItemKind::STRUCT),
                    ..Default::default()
                });
            }
        }
        for union in &module.unions {
            if seen.insert(union.name.clone()) {
                items.push(CompletionItem {
                    label: union.name.clone(),
                    kind: Some(CompletionItemKind::ENUM),
                    ..Default::default()
                });
            }
            for (case, _) in &union.cases {
                if seen.insert(case.clone()) {
                    items.push(CompletionItem {
                        label: case.clone(),
                        kind: Some(CompletionItemKind::ENUM_MEMBER),
                        ..Default::default()
                    });
                }
            }
        }
    }
}

/// For `Json.` offer `Decode` when `Json.Decode` is a known module — the
/// next dotted segment only, never the whole tail.
fn submodule_completions(
    manager: &DocumentManager,
    project: &Project,
    qualifier: &str,
    seen: &mut BTreeSet<String>,
    items: &mut Vec<CompletionItem>,
) {
    let prefix = format!("{qualifier}.");
    let mut segments: BTreeSet<String> = BTreeSet::new();

    for module_name in known_module_names(manager, project) {
        if let Some(rest) = module_name.strip_prefix(&prefix) {
            if let Some(segment) = rest.split('.').next() {
                if !segment.is_empty() {
                    segments.insert(segment.to_string());
                }
            }
        }
    }

    for segment in segments {
        if seen.insert(segment.clone()) {
            items.push(CompletionItem {
                label: segment,
                kind: Some(CompletionItemKind::MODULE),
                ..Default::default()
            });
        }
    }
}

fn known_module_names(manager: &DocumentManager, project: &Project) -> Vec<String> {
    let mut names = Vec::new();
    for path in project.all_source_files() {
        for dir in &project.source_directories {
            if let Ok(relative) = path.strip_prefix(dir) {
                let name = relative
                    .with_extension("")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join(".");
                names.push(name);
                break;
            }
        }
    }
    for dependency in &project.dependencies {
        let docs = manager.projects().load_docs(dependency);
        names.extend(docs.iter().map(|m| m.name.clone()));
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier_requires_a_trailing_dot() {
        let text = "x = H.\n";
        assert_eq!(
            qualifier_before_cursor(text, lsp_types::Position::new(0, 6)),
            Some("H".to_string())
        );
        assert_eq!(qualifier_before_cursor(text, lsp_types::Position::new(0, 5)), None);
    }

    #[test]
    fn qualifier_takes_the_full_dotted_path() {
        let text = "value = Json.Decode.\n";
        assert_eq!(
            qualifier_before_cursor(text, lsp_types::Position::new(0, 20)),
            Some("Json.Decode".to_string())
        );
    }

    #[test]
    fn lowercase_prefixes_are_not_qualifiers() {
        // `model.` is record access, not a module qualifier.
        let text = "name = model.\n";
        assert_eq!(qualifier_before_cursor(text, lsp_types::Position::new(0, 13)), None);
    }
}
