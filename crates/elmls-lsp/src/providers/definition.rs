//! Go-to-definition. The walk keeps an explicit lexical scope — an ordered
//! list of `(name, binding range)` pairs extended by argument, let, case,
//! and lambda binders — so shadowing falls out of last-wins lookup.

use crate::convert::{from_lsp_position, to_lsp_range};
use crate::document::DocumentManager;
use elmls_core::ast::*;
use elmls_core::exposing;
use elmls_core::project::Project;
use elmls_core::span::{Position, Range};
use elmls_core::ImportTracker;
use lsp_types::{GotoDefinitionResponse, Location, Uri};

pub struct DefinitionProvider;

#[derive(Clone)]
struct ScopeEntry {
    name: String,
    range: Range,
}

impl DefinitionProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn provide(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        manager: &DocumentManager,
    ) -> Option<GotoDefinitionResponse> {
        let ast = manager.ast_for(uri)?;
        let pos = from_lsp_position(position);
        let tracker = ImportTracker::new(&ast);
        let project = manager.project_for(uri);

        let ctx = DefCtx {
            manager,
            project: project.as_deref(),
            uri,
            module: &ast,
            tracker: &tracker,
        };

        ctx.locate(pos).map(GotoDefinitionResponse::Scalar)
    }
}

impl Default for DefinitionProvider {
    fn default() -> Self {
        Self::new()
    }
}

struct DefCtx<'a> {
    manager: &'a DocumentManager,
    project: Option<&'a Project>,
    uri: &'a Uri,
    module: &'a Module,
    tracker: &'a ImportTracker,
}

impl DefCtx<'_> {
    fn locate(&self, pos: Position) -> Option<Location> {
        // Module-header exposing items jump to the same-file declaration.
        if let Exposing::Explicit(items) = &self.module.header.exposing.node {
            for item in items {
                if item.range.contains(pos) {
                    return self.same_file_location(item.node.name());
                }
            }
        }

        for import in &self.module.imports {
            if import.module_name.range.contains(pos) {
                // Package modules have no file to jump to.
                let target = self
                    .manager
                    .module_file_uri(self.project?, &import.module_name.node)?;
                return Some(Location {
                    uri: target,
                    range: lsp_types::Range::default(),
                });
            }
            if let Some(Ranged {
                node: Exposing::Explicit(items),
                ..
            }) = &import.exposing
            {
                for item in items {
                    if item.range.contains(pos) {
                        return self.find_in_module(&import.module_name.node, item.node.name());
                    }
                }
            }
        }

        let decl = self
            .module
            .declarations
            .iter()
            .find(|decl| decl.range().contains(pos))?;

        match decl {
            Declaration::Function(func) => self.locate_in_function(func, pos, Vec::new()),
            Declaration::TypeAlias(alias) => {
                if alias.name.range.contains(pos) {
                    return self.location_here(alias.name.range);
                }
                self.locate_in_annotation(&alias.type_annotation, pos)
            }
            Declaration::CustomType(type_decl) => {
                if type_decl.name.range.contains(pos) {
                    return self.location_here(type_decl.name.range);
                }
                for ctor in &type_decl.constructors {
                    if ctor.name.range.contains(pos) {
                        return self.location_here(ctor.name.range);
                    }
                    for arg in &ctor.arguments {
                        if arg.range.contains(pos) {
                            return self.locate_in_annotation(arg, pos);
                        }
                    }
                }
                None
            }
            Declaration::Port(port) => {
                if port.signature.name.range.contains(pos) {
                    return self.location_here(port.signature.name.range);
                }
                self.locate_in_annotation(&port.signature.type_annotation, pos)
            }
            Declaration::Destructuring(destructuring) => {
                if destructuring.pattern.range.contains(pos) {
                    return self.locate_in_pattern(&destructuring.pattern, pos);
                }
                self.locate_in_expression(&destructuring.expression, pos, Vec::new())
            }
            Declaration::Infix(infix) => {
                if infix.function.range.contains(pos) {
                    return self.same_file_location(&infix.function.node);
                }
                None
            }
        }
    }

    // ---- scope walking ------------------------------------------------

    fn locate_in_function(
        &self,
        func: &FunctionDecl,
        pos: Position,
        mut scope: Vec<ScopeEntry>,
    ) -> Option<Location> {
        if func.name.range.contains(pos) {
            return self.location_here(func.name.range);
        }
        if let Some(signature) = &func.signature {
            if signature.name.range.contains(pos) {
                return self.location_here(func.name.range);
            }
            if signature.type_annotation.range.contains(pos) {
                return self.locate_in_annotation(&signature.type_annotation, pos);
            }
        }
        for argument in &func.arguments {
            if argument.range.contains(pos) {
                return self.locate_in_pattern(argument, pos);
            }
            push_binders(&mut scope, argument);
        }
        self.locate_in_expression(&func.body, pos, scope)
    }

    fn locate_in_expression(
        &self,
        expr: &Expression,
        pos: Position,
        scope: Vec<ScopeEntry>,
    ) -> Option<Location> {
        if !expr.range.contains(pos) {
            return None;
        }
        match &expr.kind {
            ExpressionKind::FunctionOrValue { module_parts, name } => {
                self.resolve_value(&scope, module_parts, name)
            }
            ExpressionKind::Application(items)
            | ExpressionKind::Tupled(items)
            | ExpressionKind::ListExpr(items) => items
                .iter()
                .find_map(|item| self.locate_in_expression(item, pos, scope.clone())),
            ExpressionKind::OperatorApplication { left, right, .. } => self
                .locate_in_expression(left, pos, scope.clone())
                .or_else(|| self.locate_in_expression(right, pos, scope)),
            ExpressionKind::IfBlock {
                condition,
                then_branch,
                else_branch,
            } => self
                .locate_in_expression(condition, pos, scope.clone())
                .or_else(|| self.locate_in_expression(then_branch, pos, scope.clone()))
                .or_else(|| self.locate_in_expression(else_branch, pos, scope)),
            ExpressionKind::LetExpression {
                declarations,
                expression,
            } => {
                // Every binding in the let is visible to every other one and
                // to the body.
                let mut scope = scope;
                for declaration in declarations {
                    match declaration {
                        LetDeclaration::Function(func) => scope.push(ScopeEntry {
                            name: func.name.node.clone(),
                            range: func.name.range,
                        }),
                        LetDeclaration::Destructuring { pattern, .. } => {
                            push_binders(&mut scope, pattern)
                        }
                    }
                }
                for declaration in declarations {
                    if !declaration.range().contains(pos) {
                        continue;
                    }
                    return match declaration {
                        LetDeclaration::Function(func) => {
                            self.locate_in_function(func, pos, scope.clone())
                        }
                        LetDeclaration::Destructuring {
                            pattern,
                            expression,
                            ..
                        } => {
                            if pattern.range.contains(pos) {
                                self.locate_in_pattern(pattern, pos)
                            } else {
                                self.locate_in_expression(expression, pos, scope.clone())
                            }
                        }
                    };
                }
                self.locate_in_expression(expression, pos, scope)
            }
            ExpressionKind::CaseExpression { expression, cases } => {
                if let Some(location) = self.locate_in_expression(expression, pos, scope.clone()) {
                    return Some(location);
                }
                for case in cases {
                    if case.pattern.range.contains(pos) {
                        return self.locate_in_pattern(&case.pattern, pos);
                    }
                    if case.expression.range.contains(pos) {
                        let mut branch_scope = scope.clone();
                        push_binders(&mut branch_scope, &case.pattern);
                        return self.locate_in_expression(&case.expression, pos, branch_scope);
                    }
                }
                None
            }
            ExpressionKind::Lambda {
                patterns,
                expression,
            } => {
                let mut scope = scope;
                for pattern in patterns {
                    if pattern.range.contains(pos) {
                        return self.locate_in_pattern(pattern, pos);
                    }
                    push_binders(&mut scope, pattern);
                }
                self.locate_in_expression(expression, pos, scope)
            }
            ExpressionKind::Parenthesized(inner) | ExpressionKind::Negation(inner) => {
                self.locate_in_expression(inner, pos, scope)
            }
            ExpressionKind::RecordExpr(setters) => setters
                .iter()
                .find_map(|setter| self.locate_in_expression(&setter.node.expression, pos, scope.clone())),
            ExpressionKind::RecordUpdate { name, setters } => {
                if name.range.contains(pos) {
                    // The updated record is a value in scope or a same-file
                    // declaration, never cross-module.
                    if let Some(entry) = lookup(&scope, &name.node) {
                        return self.location_here(entry.range);
                    }
                    return self.same_file_location(&name.node);
                }
                setters
                    .iter()
                    .find_map(|setter| self.locate_in_expression(&setter.node.expression, pos, scope.clone()))
            }
            ExpressionKind::RecordAccess { expression, .. } => {
                self.locate_in_expression(expression, pos, scope)
            }
            _ => None,
        }
    }

    fn locate_in_pattern(&self, pattern: &Pattern, pos: Position) -> Option<Location> {
        if !pattern.range.contains(pos) {
            return None;
        }
        match &pattern.kind {
            PatternKind::Named { name, args } => {
                if name.range.contains(pos) {
                    return self.resolve_constructor(&name.node);
                }
                args.iter().find_map(|arg| self.locate_in_pattern(arg, pos))
            }
            PatternKind::Var(_) => self.location_here(pattern.range),
            PatternKind::As(inner, alias) => {
                if alias.range.contains(pos) {
                    return self.location_here(alias.range);
                }
                self.locate_in_pattern(inner, pos)
            }
            PatternKind::Tuple(items) | PatternKind::List(items) => {
                items.iter().find_map(|item| self.locate_in_pattern(item, pos))
            }
            PatternKind::UnCons(hd, tl) => self
                .locate_in_pattern(hd, pos)
                .or_else(|| self.locate_in_pattern(tl, pos)),
            PatternKind::Record(fields) => fields
                .iter()
                .find(|field| field.range.contains(pos))
                .and_then(|field| self.location_here(field.range)),
            PatternKind::Parenthesized(inner) => self.locate_in_pattern(inner, pos),
            _ => None,
        }
    }

    fn locate_in_annotation(&self, annotation: &TypeAnnotation, pos: Position) -> Option<Location> {
        if !annotation.range.contains(pos) {
            return None;
        }
        match &annotation.kind {
            TypeAnnotationKind::Typed { name, args } => {
                if name.range.contains(pos) {
                    return self.resolve_type(&name.node);
                }
                args.iter().find_map(|arg| self.locate_in_annotation(arg, pos))
            }
            TypeAnnotationKind::Tupled(items) => {
                items.iter().find_map(|item| self.locate_in_annotation(item, pos))
            }
            TypeAnnotationKind::Record(fields) => fields
                .iter()
                .find_map(|field| self.locate_in_annotation(&field.type_annotation, pos)),
            TypeAnnotationKind::GenericRecord { fields, .. } => fields
                .iter()
                .find_map(|field| self.locate_in_annotation(&field.type_annotation, pos)),
            TypeAnnotationKind::FunctionType(left, right) => self
                .locate_in_annotation(left, pos)
                .or_else(|| self.locate_in_annotation(right, pos)),
            _ => None,
        }
    }

    // ---- name resolution ----------------------------------------------

    fn resolve_value(
        &self,
        scope: &[ScopeEntry],
        module_parts: &[String],
        name: &str,
    ) -> Option<Location> {
        if !module_parts.is_empty() {
            let qualifier = module_parts.join(".");
            return self
                .tracker
                .resolve_qualifier(&qualifier)
                .iter()
                .find_map(|target| self.find_in_module(target, name));
        }
        if let Some(entry) = lookup(scope, name) {
            return self.location_here(entry.range);
        }
        if let Some(location) = self.same_file_location(name) {
            return Some(location);
        }
        if let Some((_, ctor)) = exposing::find_constructor(self.module, name) {
            return self.location_here(ctor.name.range);
        }
        for target in self.tracker.explicit_exposing(name) {
            if let Some(location) = self.find_in_module(target, name) {
                return Some(location);
            }
        }
        for target in self.tracker.unknown_imports() {
            if let Some(location) = self.find_in_module(target, name) {
                return Some(location);
            }
        }
        None
    }

    fn resolve_constructor(&self, reference: &QualifiedNameRef) -> Option<Location> {
        let name = &reference.name;
        if let Some(qualifier) = reference.qualifier() {
            return self
                .tracker
                .resolve_qualifier(&qualifier)
                .iter()
                .find_map(|target| self.find_in_module(target, name));
        }
        if let Some((_, ctor)) = exposing::find_constructor(self.module, name) {
            return self.location_here(ctor.name.range);
        }
        for target in self.tracker.explicit_exposing(name) {
            if let Some(location) = self.find_in_module(target, name) {
                return Some(location);
            }
        }
        for target in self.tracker.unknown_imports() {
            if let Some(location) = self.find_in_module(target, name) {
                return Some(location);
            }
        }
        None
    }

    fn resolve_type(&self, reference: &QualifiedNameRef) -> Option<Location> {
        let name = &reference.name;
        if let Some(qualifier) = reference.qualifier() {
            return self
                .tracker
                .resolve_qualifier(&qualifier)
                .iter()
                .find_map(|target| self.find_in_module(target, name));
        }
        if let Some(decl) = exposing::find_declaration(self.module, name) {
            if decl.is_type_decl() {
                return self.location_here(decl.name()?.range);
            }
        }
        for target in self.tracker.explicit_exposing(name) {
            if let Some(location) = self.find_in_module(target, name) {
                return Some(location);
            }
        }
        for target in self.tracker.unknown_imports() {
            if let Some(location) = self.find_in_module(target, name) {
                return Some(location);
            }
        }
        None
    }

    // ---- location helpers ---------------------------------------------

    fn location_here(&self, range: Range) -> Option<Location> {
        Some(Location {
            uri: self.uri.clone(),
            range: to_lsp_range(range),
        })
    }

    fn same_file_location(&self, name: &str) -> Option<Location> {
        if let Some(decl) = exposing::find_declaration(self.module, name) {
            let range = decl.name().map(|n| n.range).unwrap_or_else(|| decl.range());
            return self.location_here(range);
        }
        if let Some((_, ctor)) = exposing::find_constructor(self.module, name) {
            return self.location_here(ctor.name.range);
        }
        None
    }

    /// Cross-module lookup, gated by the target module's own exposing list.
    fn find_in_module(&self, module_name: &str, name: &str) -> Option<Location> {
        let project = self.project?;
        let (target_uri, target_ast) = self.manager.module_ast(project, module_name)?;
        if !exposing::is_exposed_from_module(&target_ast, name) {
            return None;
        }
        let range = find_definition_range(&target_ast, name)?;
        Some(Location {
            uri: target_uri,
            range: to_lsp_range(range),
        })
    }
}

/// Name-node range of a declaration or constructor in `module`.
pub(crate) fn find_definition_range(module: &Module, name: &str) -> Option<Range> {
    if let Some(decl) = exposing::find_declaration(module, name) {
        return Some(decl.name().map(|n| n.range).unwrap_or_else(|| decl.range()));
    }
    exposing::find_constructor(module, name).map(|(_, ctor)| ctor.name.range)
}

fn push_binders(scope: &mut Vec<ScopeEntry>, pattern: &Pattern) {
    for binder in pattern.binders() {
        scope.push(ScopeEntry {
            name: binder.name,
            range: binder.range,
        });
    }
}

/// Last binder wins, which is exactly how shadowing behaves.
fn lookup<'a>(scope: &'a [ScopeEntry], name: &str) -> Option<&'a ScopeEntry> {
    scope.iter().rev().find(|entry| entry.name == name)
}
