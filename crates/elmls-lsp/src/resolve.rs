//! Symbol identity: deciding what name sits under the cursor and which
//! module canonically defines it. The resulting `(module, name, kind)`
//! triple is the key every cross-file operation shares.
//!
//! Purely local bindings (arguments, let and case binders) intentionally
//! resolve to nothing here; jumps to locals are produced directly by the
//! definition provider's scope walk.

use elmls_core::ast::*;
use elmls_core::exposing;
use elmls_core::span::Position;
use elmls_core::ImportTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Value,
    Type,
    Constructor,
}

/// Canonical cross-file key of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolIdentity {
    pub module: String,
    pub name: String,
    pub kind: IdentityKind,
}

impl SymbolIdentity {
    fn new(module: &str, name: &str, kind: IdentityKind) -> Self {
        SymbolIdentity {
            module: module.to_string(),
            name: name.to_string(),
            kind,
        }
    }
}

/// Answers "does open-imported module M define name N" for the fallback
/// step; the workspace layer implements it by parsing the target module.
pub type OpenImportOracle<'a> = &'a dyn Fn(&str, &str) -> bool;

pub fn resolve_at(
    module: &Module,
    tracker: &ImportTracker,
    pos: Position,
    defines: OpenImportOracle,
) -> Option<SymbolIdentity> {
    let current = module.name();

    // Module-header exposing list.
    if let Exposing::Explicit(items) = &module.header.exposing.node {
        for item in items {
            if item.range.contains(pos) {
                return Some(identity_for_exposed(current, &item.node));
            }
        }
    }

    // Import exposing lists.
    for import in &module.imports {
        if let Some(Ranged {
            node: Exposing::Explicit(items),
            ..
        }) = &import.exposing
        {
            for item in items {
                if item.range.contains(pos) {
                    return Some(identity_for_exposed(&import.module_name.node, &item.node));
                }
            }
        }
    }

    // Declarations, first whose range contains the position.
    let decl = module
        .declarations
        .iter()
        .find(|decl| decl.range().contains(pos))?;

    let resolver = Resolver {
        module,
        tracker,
        defines,
    };

    match decl {
        Declaration::Function(func) => resolver.in_function(func, pos),
        Declaration::TypeAlias(alias) => {
            if alias.name.range.contains(pos) {
                return Some(SymbolIdentity::new(current, &alias.name.node, IdentityKind::Type));
            }
            resolver.in_annotation(&alias.type_annotation, pos)
        }
        Declaration::CustomType(type_decl) => {
            if type_decl.name.range.contains(pos) {
                return Some(SymbolIdentity::new(
                    current,
                    &type_decl.name.node,
                    IdentityKind::Type,
                ));
            }
            for ctor in &type_decl.constructors {
                if ctor.name.range.contains(pos) {
                    return Some(SymbolIdentity::new(
                        current,
                        &ctor.name.node,
                        IdentityKind::Constructor,
                    ));
                }
                for arg in &ctor.arguments {
                    if arg.range.contains(pos) {
                        return resolver.in_annotation(arg, pos);
                    }
                }
            }
            None
        }
        Declaration::Port(port) => {
            if port.signature.name.range.contains(pos) {
                return Some(SymbolIdentity::new(
                    current,
                    &port.signature.name.node,
                    IdentityKind::Value,
                ));
            }
            resolver.in_annotation(&port.signature.type_annotation, pos)
        }
        Declaration::Destructuring(destructuring) => {
            if destructuring.pattern.range.contains(pos) {
                return resolver.in_pattern(&destructuring.pattern, pos);
            }
            resolver.in_expression(&destructuring.expression, pos)
        }
        Declaration::Infix(infix) => {
            if infix.operator.range.contains(pos) {
                return Some(SymbolIdentity::new(
                    current,
                    &infix.operator.node,
                    IdentityKind::Value,
                ));
            }
            None
        }
    }
}

fn identity_for_exposed(module: &str, item: &ExposedItem) -> SymbolIdentity {
    let kind = if item.is_type() {
        IdentityKind::Type
    } else {
        IdentityKind::Value
    };
    SymbolIdentity::new(module, item.name(), kind)
}

struct Resolver<'a> {
    module: &'a Module,
    tracker: &'a ImportTracker,
    defines: OpenImportOracle<'a>,
}

impl Resolver<'_> {
    fn current(&self) -> &str {
        self.module.name()
    }

    fn in_function(&self, func: &FunctionDecl, pos: Position) -> Option<SymbolIdentity> {
        if func.name.range.contains(pos) {
            return Some(SymbolIdentity::new(
                self.current(),
                &func.name.node,
                IdentityKind::Value,
            ));
        }
        if let Some(signature) = &func.signature {
            if signature.name.range.contains(pos) {
                return Some(SymbolIdentity::new(
                    self.current(),
                    &signature.name.node,
                    IdentityKind::Value,
                ));
            }
            if signature.type_annotation.range.contains(pos) {
                return self.in_annotation(&signature.type_annotation, pos);
            }
        }
        for argument in &func.arguments {
            if argument.range.contains(pos) {
                return self.in_pattern(argument, pos);
            }
        }
        self.in_expression(&func.body, pos)
    }

    /// Walks into the sub-expression containing the position; at a
    /// `FunctionOrValue` leaf the owner is looked up through the tracker.
    fn in_expression(&self, expr: &Expression, pos: Position) -> Option<SymbolIdentity> {
        if !expr.range.contains(pos) {
            return None;
        }
        match &expr.kind {
            ExpressionKind::FunctionOrValue { module_parts, name } => {
                self.resolve_value(module_parts, name)
            }
            ExpressionKind::Application(items) | ExpressionKind::Tupled(items)
            | ExpressionKind::ListExpr(items) => {
                items.iter().find_map(|item| self.in_expression(item, pos))
            }
            ExpressionKind::OperatorApplication { left, right, .. } => self
                .in_expression(left, pos)
                .or_else(|| self.in_expression(right, pos)),
            ExpressionKind::IfBlock {
                condition,
                then_branch,
                else_branch,
            } => self
                .in_expression(condition, pos)
                .or_else(|| self.in_expression(then_branch, pos))
                .or_else(|| self.in_expression(else_branch, pos)),
            ExpressionKind::LetExpression {
                declarations,
                expression,
            } => {
                for declaration in declarations {
                    if !declaration.range().contains(pos) {
                        continue;
                    }
                    return match declaration {
                        LetDeclaration::Function(func) => self.in_function(func, pos),
                        LetDeclaration::Destructuring {
                            pattern,
                            expression,
                            ..
                        } => {
                            if pattern.range.contains(pos) {
                                self.in_pattern(pattern, pos)
                            } else {
                                self.in_expression(expression, pos)
                            }
                        }
                    };
                }
                self.in_expression(expression, pos)
            }
            ExpressionKind::CaseExpression { expression, cases } => {
                if let Some(identity) = self.in_expression(expression, pos) {
                    return Some(identity);
                }
                for case in cases {
                    if case.pattern.range.contains(pos) {
                        return self.in_pattern(&case.pattern, pos);
                    }
                    if let Some(identity) = self.in_expression(&case.expression, pos) {
                        return Some(identity);
                    }
                }
                None
            }
            ExpressionKind::Lambda {
                patterns,
                expression,
            } => {
                for pattern in patterns {
                    if pattern.range.contains(pos) {
                        return self.in_pattern(pattern, pos);
                    }
                }
                self.in_expression(expression, pos)
            }
            ExpressionKind::Parenthesized(inner) | ExpressionKind::Negation(inner) => {
                self.in_expression(inner, pos)
            }
            ExpressionKind::RecordExpr(setters) => setters
                .iter()
                .find_map(|setter| self.in_expression(&setter.node.expression, pos)),
            ExpressionKind::RecordUpdate { setters, .. } => setters
                .iter()
                .find_map(|setter| self.in_expression(&setter.node.expression, pos)),
            ExpressionKind::RecordAccess { expression, .. } => self.in_expression(expression, pos),
            _ => None,
        }
    }

    fn in_pattern(&self, pattern: &Pattern, pos: Position) -> Option<SymbolIdentity> {
        if !pattern.range.contains(pos) {
            return None;
        }
        match &pattern.kind {
            PatternKind::Named { name, args } => {
                if name.range.contains(pos) {
                    return self.resolve_constructor(&name.node);
                }
                args.iter().find_map(|arg| self.in_pattern(arg, pos))
            }
            PatternKind::Tuple(items) | PatternKind::List(items) => {
                items.iter().find_map(|item| self.in_pattern(item, pos))
            }
            PatternKind::UnCons(hd, tl) => {
                self.in_pattern(hd, pos).or_else(|| self.in_pattern(tl, pos))
            }
            PatternKind::As(inner, _) | PatternKind::Parenthesized(inner) => {
                self.in_pattern(inner, pos)
            }
            // Plain binders are locals; no cross-file identity.
            _ => None,
        }
    }

    fn in_annotation(&self, annotation: &TypeAnnotation, pos: Position) -> Option<SymbolIdentity> {
        if !annotation.range.contains(pos) {
            return None;
        }
        match &annotation.kind {
            TypeAnnotationKind::Typed { name, args } => {
                if name.range.contains(pos) {
                    return self.resolve_type(&name.node);
                }
                args.iter().find_map(|arg| self.in_annotation(arg, pos))
            }
            TypeAnnotationKind::Tupled(items) => {
                items.iter().find_map(|item| self.in_annotation(item, pos))
            }
            TypeAnnotationKind::Record(fields) => fields
                .iter()
                .find_map(|field| self.in_annotation(&field.type_annotation, pos)),
            TypeAnnotationKind::GenericRecord { fields, .. } => fields
                .iter()
                .find_map(|field| self.in_annotation(&field.type_annotation, pos)),
            TypeAnnotationKind::FunctionType(left, right) => self
                .in_annotation(left, pos)
                .or_else(|| self.in_annotation(right, pos)),
            _ => None,
        }
    }

    fn resolve_value(&self, module_parts: &[String], name: &str) -> Option<SymbolIdentity> {
        if !module_parts.is_empty() {
            let qualifier = module_parts.join(".");
            let modules = self.tracker.resolve_qualifier(&qualifier);
            let owner = modules.first()?;
            return Some(SymbolIdentity::new(owner, name, IdentityKind::Value));
        }

        if exposing::find_declaration(self.module, name).is_some() {
            return Some(SymbolIdentity::new(self.current(), name, IdentityKind::Value));
        }
        if exposing::find_constructor(self.module, name).is_some() {
            return Some(SymbolIdentity::new(
                self.current(),
                name,
                IdentityKind::Constructor,
            ));
        }
        if let Some(owner) = self.tracker.explicit_exposing(name).first() {
            return Some(SymbolIdentity::new(owner, name, IdentityKind::Value));
        }
        self.tracker
            .unknown_imports()
            .iter()
            .find(|candidate| (self.defines)(candidate, name))
            .map(|owner| SymbolIdentity::new(owner, name, IdentityKind::Value))
    }

    fn resolve_constructor(&self, reference: &QualifiedNameRef) -> Option<SymbolIdentity> {
        let name = &reference.name;
        if let Some(qualifier) = reference.qualifier() {
            let modules = self.tracker.resolve_qualifier(&qualifier);
            let owner = modules.first()?;
            return Some(SymbolIdentity::new(owner, name, IdentityKind::Constructor));
        }
        if exposing::find_constructor(self.module, name).is_some() {
            return Some(SymbolIdentity::new(
                self.current(),
                name,
                IdentityKind::Constructor,
            ));
        }
        if let Some(owner) = self.tracker.explicit_exposing(name).first() {
            return Some(SymbolIdentity::new(owner, name, IdentityKind::Constructor));
        }
        self.tracker
            .unknown_imports()
            .iter()
            .find(|candidate| (self.defines)(candidate, name))
            .map(|owner| SymbolIdentity::new(owner, name, IdentityKind::Constructor))
    }

    fn resolve_type(&self, reference: &QualifiedNameRef) -> Option<SymbolIdentity> {
        let name = &reference.name;
        if let Some(qualifier) = reference.qualifier() {
            let modules = self.tracker.resolve_qualifier(&qualifier);
            let owner = modules.first()?;
            return Some(SymbolIdentity::new(owner, name, IdentityKind::Type));
        }
        if exposing::find_declaration(self.module, name)
            .is_some_and(|decl| decl.is_type_decl())
        {
            return Some(SymbolIdentity::new(self.current(), name, IdentityKind::Type));
        }
        if let Some(owner) = self.tracker.explicit_exposing(name).first() {
            return Some(SymbolIdentity::new(owner, name, IdentityKind::Type));
        }
        self.tracker
            .unknown_imports()
            .iter()
            .find(|candidate| (self.defines)(candidate, name))
            .map(|owner| SymbolIdentity::new(owner, name, IdentityKind::Type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmls_core::parse;
    use indoc::indoc;

    fn resolve(source: &str, line: u32, column: u32) -> Option<SymbolIdentity> {
        let module = parse(source).unwrap();
        let tracker = ImportTracker::new(&module);
        resolve_at(&module, &tracker, Position::new(line, column), &|_, _| false)
    }

    const FIXTURE: &str = indoc! {"
        module Main exposing (main, update)

        import Helpers as H exposing (add)
        import Types exposing (Msg(..))

        update : Msg -> Int -> Int
        update msg model =
            case msg of
                Increment ->
                    add model 1

                _ ->
                    H.multiply model 2

        main =
            update Increment 0
    "};

    #[test]
    fn header_exposing_item() {
        let identity = resolve(FIXTURE, 1, 24).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Main", "main", IdentityKind::Value));
    }

    #[test]
    fn import_exposing_item() {
        // `add` inside `exposing (add)` on line 3.
        let identity = resolve(FIXTURE, 3, 32).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Helpers", "add", IdentityKind::Value));
    }

    #[test]
    fn import_type_expose_item() {
        let identity = resolve(FIXTURE, 4, 24).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Types", "Msg", IdentityKind::Type));
    }

    #[test]
    fn declaration_name() {
        let identity = resolve(FIXTURE, 7, 2).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Main", "update", IdentityKind::Value));
    }

    #[test]
    fn signature_name() {
        let identity = resolve(FIXTURE, 6, 2).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Main", "update", IdentityKind::Value));
    }

    #[test]
    fn type_in_signature() {
        // `Msg` in `update : Msg -> Int -> Int`.
        let identity = resolve(FIXTURE, 6, 10).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Types", "Msg", IdentityKind::Type));
    }

    #[test]
    fn explicit_exposing_use_site() {
        // `add` inside the first case branch.
        let identity = resolve(FIXTURE, 10, 14).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Helpers", "add", IdentityKind::Value));
    }

    #[test]
    fn qualified_use_site_through_alias() {
        // `H.multiply` in the wildcard branch.
        let identity = resolve(FIXTURE, 13, 16).unwrap();
        assert_eq!(
            identity,
            SymbolIdentity::new("Helpers", "multiply", IdentityKind::Value)
        );
    }

    #[test]
    fn constructor_pattern() {
        // `Increment` pattern; Types is open via `Msg(..)`.
        let module = parse(FIXTURE).unwrap();
        let tracker = ImportTracker::new(&module);
        let identity = resolve_at(
            &module,
            &tracker,
            Position::new(9, 10),
            &|module, name| module == "Types" && name == "Increment",
        )
        .unwrap();
        assert_eq!(
            identity,
            SymbolIdentity::new("Types", "Increment", IdentityKind::Constructor)
        );
    }

    #[test]
    fn same_file_declaration_wins_over_imports() {
        let source = indoc! {"
            module Main exposing (..)

            import Helpers exposing (add)

            add a b =
                a + b

            total =
                add 1 2
        "};
        let identity = resolve(source, 9, 6).unwrap();
        assert_eq!(identity, SymbolIdentity::new("Main", "add", IdentityKind::Value));
    }

    #[test]
    fn local_binding_has_no_identity() {
        let source = indoc! {"
            module Main exposing (..)

            double n =
                n + n
        "};
        assert!(resolve(source, 4, 5).is_none());
    }

    #[test]
    fn prelude_name_resolves_through_seeded_exposing() {
        let source = indoc! {"
            module Main exposing (..)

            wrap x =
                Just x
        "};
        // Explicit-exposing hits report kind value, even for constructors.
        let identity = resolve(source, 4, 6).unwrap();
        assert_eq!(
            identity,
            SymbolIdentity::new("Maybe", "Just", IdentityKind::Value)
        );
    }
}
