//! Queries over a module's exposing surface: what a file makes visible to
//! its importers, and which same-file declaration a name belongs to.

use crate::ast::{Declaration, ExposedItem, Exposing, Module};

/// Whether `name` is visible to importers of `module`. With `exposing (..)`
/// every declaration is visible; with an explicit list a name is visible if
/// it is listed, or if it is a constructor of a type listed with `(..)`.
pub fn is_exposed_from_module(module: &Module, name: &str) -> bool {
    match &module.header.exposing.node {
        Exposing::All(_) => {
            find_declaration(module, name).is_some() || find_constructor(module, name).is_some()
        }
        Exposing::Explicit(items) => items.iter().any(|item| match &item.node {
            ExposedItem::TypeExpose {
                name: type_name,
                open_range: Some(_),
            } => {
                type_name == name
                    || constructor_parent(module, name).is_some_and(|parent| parent == type_name)
            }
            other => other.name() == name,
        }),
    }
}

/// The first declaration named `name` in the module, if any.
pub fn find_declaration<'a>(module: &'a Module, name: &str) -> Option<&'a Declaration> {
    module
        .declarations
        .iter()
        .find(|decl| decl.name().is_some_and(|n| n.node == name))
}

/// The custom-type constructor named `name`, with its parent type.
pub fn find_constructor<'a>(
    module: &'a Module,
    name: &str,
) -> Option<(&'a crate::ast::CustomTypeDecl, &'a crate::ast::Constructor)> {
    module.declarations.iter().find_map(|decl| match decl {
        Declaration::CustomType(type_decl) => type_decl
            .constructors
            .iter()
            .find(|ctor| ctor.name.node == name)
            .map(|ctor| (type_decl, ctor)),
        _ => None,
    })
}

fn constructor_parent<'a>(module: &'a Module, ctor_name: &str) -> Option<&'a str> {
    find_constructor(module, ctor_name).map(|(type_decl, _)| type_decl.name.node.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn explicit_exposing_lists_names() {
        let module = parse("module Helpers exposing (add, greet)\n\nadd a b =\n    a + b\n\ngreet name =\n    name\n").unwrap();
        assert!(is_exposed_from_module(&module, "add"));
        assert!(is_exposed_from_module(&module, "greet"));
        assert!(!is_exposed_from_module(&module, "hidden"));
    }

    #[test]
    fn open_type_exposes_constructors() {
        let module = parse(
            "module Types exposing (Msg(..))\n\ntype Msg\n    = Increment\n    | Decrement\n",
        )
        .unwrap();
        assert!(is_exposed_from_module(&module, "Msg"));
        assert!(is_exposed_from_module(&module, "Increment"));
        assert!(is_exposed_from_module(&module, "Decrement"));
    }

    #[test]
    fn closed_type_hides_constructors() {
        let module =
            parse("module Types exposing (Msg)\n\ntype Msg\n    = Increment\n    | Decrement\n")
                .unwrap();
        assert!(is_exposed_from_module(&module, "Msg"));
        assert!(!is_exposed_from_module(&module, "Increment"));
    }

    #[test]
    fn exposing_all_covers_declarations_and_constructors() {
        let module =
            parse("module Types exposing (..)\n\ntype Msg\n    = Increment\n\nupdate msg =\n    msg\n")
                .unwrap();
        assert!(is_exposed_from_module(&module, "Msg"));
        assert!(is_exposed_from_module(&module, "Increment"));
        assert!(is_exposed_from_module(&module, "update"));
        assert!(!is_exposed_from_module(&module, "missing"));
    }
}
