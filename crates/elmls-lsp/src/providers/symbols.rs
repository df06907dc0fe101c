//! Document symbols (outline view). When the current buffer no longer
//! parses, the last successful outline for that file is served instead, so
//! the outline does not flicker away mid-edit.

use crate::convert::to_lsp_range;
use crate::document::DocumentManager;
use elmls_core::ast::{Declaration, Expression, ExpressionKind, LetDeclaration, Module};
use lsp_types::{DocumentSymbol, SymbolKind, Uri};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct SymbolsProvider {
    last_good: Mutex<HashMap<Uri, Vec<DocumentSymbol>>>,
}

impl SymbolsProvider {
    pub fn new() -> Self {
        SymbolsProvider {
            last_good: Mutex::new(HashMap::new()),
        }
    }

    pub fn provide(&self, uri: &Uri, manager: &DocumentManager) -> Vec<DocumentSymbol> {
        match manager.ast_for(uri) {
            Some(ast) => {
                let symbols = module_symbols(&ast);
                self.last_good
                    .lock()
                    .unwrap()
                    .insert(uri.clone(), symbols.clone());
                symbols
            }
            None => self
                .last_good
                .lock()
                .unwrap()
                .get(uri)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

impl Default for SymbolsProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn module_symbols(module: &Module) -> Vec<DocumentSymbol> {
    module.declarations.iter().filter_map(declaration_symbol).collect()
}

#[allow(deprecated)] // DocumentSymbol carries a deprecated field
fn declaration_symbol(declaration: &Declaration) -> Option<DocumentSymbol> {
    match declaration {
        Declaration::Function(func) => {
            let mut children = Vec::new();
            collect_let_functions(&func.body, &mut children);
            Some(DocumentSymbol {
                name: func.name.node.clone(),
                detail: None,
                kind: SymbolKind::FUNCTION,
                tags: None,
                deprecated: None,
                range: to_lsp_range(func.range),
                selection_range: to_lsp_range(func.name.range),
                children: (!children.is_empty()).then_some(children),
            })
        }
        Declaration::TypeAlias(alias) => Some(DocumentSymbol {
            name: alias.name.node.clone(),
            detail: None,
            kind: SymbolKind::OBJECT,
            tags: None,
            deprecated: None,
            range: to_lsp_range(alias.range),
            selection_range: to_lsp_range(alias.name.range),
            children: None,
        }),
        Declaration::CustomType(type_decl) => {
            let children: Vec<DocumentSymbol> = type_decl
                .constructors
                .iter()
                .map(|ctor| DocumentSymbol {
                    name: ctor.name.node.clone(),
                    detail: None,
                    kind: SymbolKind::ENUM_MEMBER,
                    tags: None,
                    deprecated: None,
                    range: to_lsp_range(ctor.range),
                    selection_range: to_lsp_range(ctor.name.range),
                    children: None,
                })
                .collect();
            Some(DocumentSymbol {
                name: type_decl.name.node.clone(),
                detail: None,
                kind: SymbolKind::ENUM,
                tags: None,
                deprecated: None,
                range: to_lsp_range(type_decl.range),
                selection_range: to_lsp_range(type_decl.name.range),
                children: (!children.is_empty()).then_some(children),
            })
        }
        Declaration::Port(port) => Some(DocumentSymbol {
            name: port.signature.name.node.clone(),
            detail: None,
            kind: SymbolKind::FUNCTION,
            tags: None,
            deprecated: None,
            range: to_lsp_range(port.range),
            selection_range: to_lsp_range(port.signature.name.range),
            children: None,
        }),
        Declaration::Destructuring(_) | Declaration::Infix(_) => None,
    }
}

/// Let-bound function names show up as children of their enclosing
/// function.
#[allow(deprecated)]
fn collect_let_functions(expr: &Expression, out: &mut Vec<DocumentSymbol>) {
    match &expr.kind {
        ExpressionKind::LetExpression {
            declarations,
            expression,
        } => {
            for declaration in declarations {
                if let LetDeclaration::Function(func) = declaration {
                    let mut children = Vec::new();
                    collect_let_functions(&func.body, &mut children);
                    out.push(DocumentSymbol {
                        name: func.name.node.clone(),
                        detail: None,
                        kind: SymbolKind::FUNCTION,
                        tags: None,
                        deprecated: None,
                        range: to_lsp_range(func.range),
                        selection_range: to_lsp_range(func.name.range),
                        children: (!children.is_empty()).then_some(children),
                    });
                }
            }
            collect_let_functions(expression, out);
        }
        ExpressionKind::Application(items)
        | ExpressionKind::Tupled(items)
        | ExpressionKind::ListExpr(items) => {
            for item in items {
                collect_let_functions(item, out);
            }
        }
        ExpressionKind::OperatorApplication { left, right, .. } => {
            collect_let_functions(left, out);
            collect_let_functions(right, out);
        }
        ExpressionKind::IfBlock {
            condition,
            then_branch,
            else_branch,
        } => {
            collect_let_functions(condition, out);
            collect_let_functions(then_branch, out);
            collect_let_functions(else_branch, out);
        }
        ExpressionKind::CaseExpression { expression, cases } => {
            collect_let_functions(expression, out);
            for case in cases {
                collect_let_functions(&case.expression, out);
            }
        }
        ExpressionKind::Lambda { expression, .. } => collect_let_functions(expression, out),
        ExpressionKind::Parenthesized(inner) | ExpressionKind::Negation(inner) => {
            collect_let_functions(inner, out)
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmls_core::parse;
    use indoc::indoc;

    #[test]
    fn builds_a_symbol_tree() {
        let module = parse(indoc! {"
            module Main exposing (..)

            type alias Model =
                { count : Int }

            type Msg
                = Increment
                | Decrement

            update msg model =
                let
                    bump n =
                        n + 1
                in
                bump model
        "})
        .unwrap();
        let symbols = module_symbols(&module);
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Model", "Msg", "update"]);

        assert_eq!(symbols[0].kind, SymbolKind::OBJECT);
        assert_eq!(symbols[1].kind, SymbolKind::ENUM);
        let ctors: Vec<_> = symbols[1]
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(ctors, vec!["Increment", "Decrement"]);

        let lets: Vec<_> = symbols[2]
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(lets, vec!["bump"]);
    }
}
