//! Whole-workspace reference search. Every file reachable from the
//! manifest is parsed fresh (the AST cache is too small for a sweep to be
//! worth populating), filtered by whether it could mention the symbol at
//! all, then scanned declaration by declaration.
//!
//! Ranges are trimmed to the bare name: `Helpers.add` contributes only the
//! `add` columns and `Msg(..)` in an exposing list only the `Msg` columns,
//! so rename edits never eat a qualifier or a constructor suffix.

use crate::convert::{from_lsp_position, to_lsp_range};
use crate::document::DocumentManager;
use crate::resolve::{resolve_at, IdentityKind, SymbolIdentity};
use elmls_core::ast::*;
use elmls_core::exposing;
use elmls_core::span::Range;
use elmls_core::uri as uri_util;
use elmls_core::{ImportTracker, PRELUDE_MODULES};
use lsp_types::{Location, Uri};
use rustc_hash::FxHashSet;
use std::str::FromStr;
use std::sync::Arc;

pub struct ReferencesProvider;

/// The full reference set for one symbol, declarations included.
pub(crate) struct ReferenceSet {
    pub locations: Vec<Location>,
    /// The defining name-node site, used when `includeDeclaration` is off.
    pub declaration: Option<Location>,
}

impl ReferencesProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn provide(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        include_declaration: bool,
        manager: &DocumentManager,
    ) -> Option<Vec<Location>> {
        let set = collect_reference_set(uri, position, manager)?;
        let locations = if include_declaration {
            set.locations
        } else {
            let declaration = set.declaration;
            set.locations
                .into_iter()
                .filter(|location| {
                    declaration
                        .as_ref()
                        .is_none_or(|decl| decl.uri != location.uri || decl.range.start != location.range.start)
                })
                .collect()
        };
        Some(locations)
    }
}

impl Default for ReferencesProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the identity under the cursor and enumerate every reference to
/// it across the workspace. Shared by references and rename.
pub(crate) fn collect_reference_set(
    uri: &Uri,
    position: lsp_types::Position,
    manager: &DocumentManager,
) -> Option<ReferenceSet> {
    let ast = manager.ast_for(uri)?;
    let pos = from_lsp_position(position);
    let tracker = ImportTracker::new(&ast);
    let project = manager.project_for(uri);

    let defines = |module_name: &str, name: &str| -> bool {
        let Some(project) = project.as_deref() else {
            return false;
        };
        manager
            .module_ast(project, module_name)
            .map(|(_, target)| {
                exposing::find_declaration(&target, name).is_some()
                    || exposing::find_constructor(&target, name).is_some()
            })
            .unwrap_or(false)
    };

    let identity = resolve_at(&ast, &tracker, pos, &defines)?;

    let mut seen: FxHashSet<(String, u32, u32)> = FxHashSet::default();
    let mut locations = Vec::new();
    let mut declaration = None;

    let mut scan = |file_uri: &Uri, module: &Module| {
        let mut collector = Collector {
            identity: &identity,
            tracker: ImportTracker::new(module),
            module_name: module.name().to_string(),
            hits: Vec::new(),
        };
        collector.run(module);
        for hit in collector.hits {
            let key = (
                file_uri.as_str().to_string(),
                hit.range.start.line,
                hit.range.start.column,
            );
            if !seen.insert(key) {
                continue;
            }
            let location = Location {
                uri: file_uri.clone(),
                range: to_lsp_range(hit.range),
            };
            if hit.is_declaration && declaration.is_none() {
                declaration = Some(location.clone());
            }
            locations.push(location);
        }
    };

    match project.as_deref() {
        Some(project) => {
            let mut visited_current = false;
            for path in project.all_source_files() {
                let Ok(file_uri) = Uri::from_str(&uri_util::path_to_uri(&path)) else {
                    continue;
                };
                let module = if &file_uri == uri {
                    visited_current = true;
                    Arc::clone(&ast)
                } else {
                    // Skip quickly when the file cannot mention the symbol;
                    // reading and a header check beat a full parse.
                    let Some(parsed) = parse_workspace_file(manager, &file_uri, &path) else {
                        continue;
                    };
                    if !can_reference(&parsed, &identity.module) {
                        continue;
                    }
                    parsed
                };
                scan(&file_uri, &module);
            }
            if !visited_current {
                scan(uri, &ast);
            }
        }
        None => {
            // Without a manifest the sweep degrades to the current file.
            scan(uri, &ast);
        }
    }

    Some(ReferenceSet {
        locations,
        declaration,
    })
}

fn parse_workspace_file(
    manager: &DocumentManager,
    file_uri: &Uri,
    path: &std::path::Path,
) -> Option<Arc<Module>> {
    if manager.get(file_uri).is_some() {
        return manager.ast_for(file_uri);
    }
    let text = std::fs::read_to_string(path).ok()?;
    manager.parse_source(&text)
}

/// A file can mention the symbol only if it lives in the defining module,
/// imports it, or the defining module is part of the implicit prelude.
fn can_reference(module: &Module, def_module: &str) -> bool {
    module.name() == def_module
        || PRELUDE_MODULES.contains(&def_module)
        || module
            .imports
            .iter()
            .any(|import| import.module_name.node == def_module)
}

struct Hit {
    range: Range,
    is_declaration: bool,
}

struct Collector<'a> {
    identity: &'a SymbolIdentity,
    tracker: ImportTracker,
    module_name: String,
    hits: Vec<Hit>,
}

impl Collector<'_> {
    fn run(&mut self, module: &Module) {
        let name = self.identity.name.clone();
        let is_defining = self.module_name == self.identity.module;

        if is_defining {
            if let Exposing::Explicit(items) = &module.header.exposing.node {
                for item in items {
                    if self.exposed_item_matches(&item.node) {
                        self.push(item.range.with_len(name.len()), false);
                    }
                }
            }
        }

        for import in &module.imports {
            if import.module_name.node != self.identity.module {
                continue;
            }
            if let Some(Ranged {
                node: Exposing::Explicit(items),
                ..
            }) = &import.exposing
            {
                for item in items {
                    if self.exposed_item_matches(&item.node) {
                        self.push(item.range.with_len(name.len()), false);
                    }
                }
            }
        }

        for declaration in &module.declarations {
            self.in_declaration(declaration, is_defining);
        }
    }

    fn exposed_item_matches(&self, item: &ExposedItem) -> bool {
        if item.name() != self.identity.name {
            return false;
        }
        match self.identity.kind {
            IdentityKind::Value => !item.is_type(),
            IdentityKind::Type => item.is_type(),
            // Only a same-named open type exposes a constructor by name.
            IdentityKind::Constructor => {
                matches!(item, ExposedItem::TypeExpose { open_range: Some(_), .. })
            }
        }
    }

    fn push(&mut self, range: Range, is_declaration: bool) {
        self.hits.push(Hit {
            range,
            is_declaration,
        });
    }

    fn in_declaration(&mut self, declaration: &Declaration, is_defining: bool) {
        let name = &self.identity.name;
        match declaration {
            Declaration::Function(func) => {
                if is_defining && self.identity.kind == IdentityKind::Value {
                    if func.name.node == *name {
                        self.push(func.name.range, true);
                    }
                    if let Some(signature) = &func.signature {
                        if signature.name.node == *name {
                            self.push(signature.name.range, false);
                        }
                    }
                }
                if self.identity.kind == IdentityKind::Type {
                    if let Some(signature) = &func.signature {
                        self.in_annotation(&signature.type_annotation);
                    }
                }
                for argument in &func.arguments {
                    self.in_pattern(argument);
                }
                self.in_expression(&func.body);
            }
            Declaration::TypeAlias(alias) => {
                if is_defining
                    && self.identity.kind == IdentityKind::Type
                    && alias.name.node == *name
                {
                    self.push(alias.name.range, true);
                }
                if self.identity.kind == IdentityKind::Type {
                    self.in_annotation(&alias.type_annotation);
                }
            }
            Declaration::CustomType(type_decl) => {
                if is_defining
                    && self.identity.kind == IdentityKind::Type
                    && type_decl.name.node == *name
                {
                    self.push(type_decl.name.range, true);
                }
                for ctor in &type_decl.constructors {
                    if is_defining
                        && self.identity.kind == IdentityKind::Constructor
                        && ctor.name.node == *name
                    {
                        self.push(ctor.name.range, true);
                    }
                    if self.identity.kind == IdentityKind::Type {
                        for argument in &ctor.arguments {
                            self.in_annotation(argument);
                        }
                    }
                }
            }
            Declaration::Port(port) => {
                if is_defining
                    && self.identity.kind == IdentityKind::Value
                    && port.signature.name.node == *name
                {
                    self.push(port.signature.name.range, true);
                }
                if self.identity.kind == IdentityKind::Type {
                    self.in_annotation(&port.signature.type_annotation);
                }
            }
            Declaration::Destructuring(destructuring) => {
                self.in_pattern(&destructuring.pattern);
                self.in_expression(&destructuring.expression);
            }
            Declaration::Infix(_) => {}
        }
    }

    /// Whether an unqualified mention of the name in this file refers to the
    /// defining module: same module, explicitly exposed from it, or pulled
    /// in by an open import of it.
    fn unqualified_refers_to_definition(&self) -> bool {
        let def = &self.identity.module;
        self.module_name == *def
            || self
                .tracker
                .explicit_exposing(&self.identity.name)
                .iter()
                .any(|m| m == def)
            || self.tracker.unknown_imports().iter().any(|m| m == def)
    }

    fn qualified_refers_to_definition(&self, qualifier: &str) -> bool {
        self.tracker
            .resolve_qualifier(qualifier)
            .iter()
            .any(|m| m == &self.identity.module)
    }

    fn in_annotation(&mut self, annotation: &TypeAnnotation) {
        match &annotation.kind {
            TypeAnnotationKind::Typed { name, args } => {
                if name.node.name == self.identity.name {
                    let matches = match name.node.qualifier() {
                        Some(qualifier) => self.qualified_refers_to_definition(&qualifier),
                        None => self.unqualified_refers_to_definition(),
                    };
                    if matches {
                        self.push(name.range.trim_start(name.node.qualifier_len()), false);
                    }
                }
                for arg in args {
                    self.in_annotation(arg);
                }
            }
            TypeAnnotationKind::Tupled(items) => {
                for item in items {
                    self.in_annotation(item);
                }
            }
            TypeAnnotationKind::Record(fields) => {
                for field in fields {
                    self.in_annotation(&field.type_annotation);
                }
            }
            TypeAnnotationKind::GenericRecord { fields, .. } => {
                for field in fields {
                    self.in_annotation(&field.type_annotation);
                }
            }
            TypeAnnotationKind::FunctionType(left, right) => {
                self.in_annotation(left);
                self.in_annotation(right);
            }
            _ => {}
        }
    }

    fn in_pattern(&mut self, pattern: &Pattern) {
        match &pattern.kind {
            PatternKind::Named { name, args } => {
                if self.identity.kind == IdentityKind::Constructor
                    && name.node.name == self.identity.name
                {
                    let matches = match name.node.qualifier() {
                        Some(qualifier) => self.qualified_refers_to_definition(&qualifier),
                        None => self.unqualified_refers_to_definition(),
                    };
                    if matches {
                        self.push(name.range.trim_start(name.node.qualifier_len()), false);
                    }
                }
                for arg in args {
                    self.in_pattern(arg);
                }
            }
            PatternKind::Tuple(items) | PatternKind::List(items) => {
                for item in items {
                    self.in_pattern(item);
                }
            }
            PatternKind::UnCons(hd, tl) => {
                self.in_pattern(hd);
                self.in_pattern(tl);
            }
            PatternKind::As(inner, _) | PatternKind::Parenthesized(inner) => {
                self.in_pattern(inner);
            }
            _ => {}
        }
    }

    fn in_expression(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::FunctionOrValue { module_parts, name } => {
                if name != &self.identity.name {
                    return;
                }
                if !matches!(
                    self.identity.kind,
                    IdentityKind::Value | IdentityKind::Constructor
                ) {
                    return;
                }
                if module_parts.is_empty() {
                    if self.unqualified_refers_to_definition() {
                        self.push(expr.range, false);
                    }
                } else {
                    let qualifier = module_parts.join(".");
                    if self.qualified_refers_to_definition(&qualifier) {
                        let prefix_len = qualifier.len() + 1;
                        self.push(expr.range.trim_start(prefix_len), false);
                    }
                }
            }
            ExpressionKind::Application(items)
            | ExpressionKind::Tupled(items)
            | ExpressionKind::ListExpr(items) => {
                for item in items {
                    self.in_expression(item);
                }
            }
            ExpressionKind::OperatorApplication { left, right, .. } => {
                self.in_expression(left);
                self.in_expression(right);
            }
            ExpressionKind::IfBlock {
                condition,
                then_branch,
                else_branch,
            } => {
                self.in_expression(condition);
                self.in_expression(then_branch);
                self.in_expression(else_branch);
            }
            ExpressionKind::LetExpression {
                declarations,
                expression,
            } => {
                for declaration in declarations {
                    match declaration {
                        LetDeclaration::Function(func) => {
                            if self.identity.kind == IdentityKind::Type {
                                if let Some(signature) = &func.signature {
                                    self.in_annotation(&signature.type_annotation);
                                }
                            }
                            for argument in &func.arguments {
                                self.in_pattern(argument);
                            }
                            self.in_expression(&func.body);
                        }
                        LetDeclaration::Destructuring {
                            pattern,
                            expression,
                            ..
                        } => {
                            self.in_pattern(pattern);
                            self.in_expression(expression);
                        }
                    }
                }
                self.in_expression(expression);
            }
            ExpressionKind::CaseExpression { expression, cases } => {
                self.in_expression(expression);
                for case in cases {
                    self.in_pattern(&case.pattern);
                    self.in_expression(&case.expression);
                }
            }
            ExpressionKind::Lambda {
                patterns,
                expression,
            } => {
                for pattern in patterns {
                    self.in_pattern(pattern);
                }
                self.in_expression(expression);
            }
            ExpressionKind::Parenthesized(inner) | ExpressionKind::Negation(inner) => {
                self.in_expression(inner);
            }
            ExpressionKind::RecordExpr(setters) => {
                for setter in setters {
                    self.in_expression(&setter.node.expression);
                }
            }
            ExpressionKind::RecordUpdate { setters, .. } => {
                for setter in setters {
                    self.in_expression(&setter.node.expression);
                }
            }
            ExpressionKind::RecordAccess { expression, .. } => {
                self.in_expression(expression);
            }
            _ => {}
        }
    }
}
