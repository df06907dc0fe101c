use super::parse;
use crate::ast::*;
use crate::span::Range;
use indoc::indoc;

fn parse_ok(source: &str) -> Module {
    match parse(source) {
        Ok(module) => module,
        Err(err) => panic!("parse failed: {err}\nsource:\n{source}"),
    }
}

#[test]
fn module_header_with_explicit_exposing() {
    let module = parse_ok("module Main exposing (main, update)\n\nmain =\n    0\n\nupdate =\n    1\n");
    assert_eq!(module.name(), "Main");
    match &module.header.exposing.node {
        Exposing::Explicit(items) => {
            let names: Vec<_> = items.iter().map(|i| i.node.name()).collect();
            assert_eq!(names, vec!["main", "update"]);
        }
        Exposing::All(_) => panic!("expected explicit exposing"),
    }
}

#[test]
fn dotted_module_name() {
    let module = parse_ok("module Page.Home.View exposing (..)\n\nview =\n    0\n");
    assert_eq!(module.name(), "Page.Home.View");
}

#[test]
fn port_module_header() {
    let module = parse_ok("port module Ports exposing (save)\n\nport save : String -> Cmd msg\n");
    assert_eq!(module.header.kind, ModuleKind::Port);
    match &module.declarations[0] {
        Declaration::Port(port) => assert_eq!(port.signature.name.node, "save"),
        other => panic!("expected port, got {other:?}"),
    }
}

#[test]
fn imports_with_alias_and_exposing() {
    let module = parse_ok(indoc! {"
        module Main exposing (..)

        import Helpers as H exposing (add, greet)
        import Json.Decode

        main =
            0
    "});
    assert_eq!(module.imports.len(), 2);
    assert_eq!(module.imports[0].module_name.node, "Helpers");
    assert_eq!(module.imports[0].alias.as_ref().unwrap().node, "H");
    assert_eq!(module.imports[1].module_name.node, "Json.Decode");
    assert!(module.imports[1].exposing.is_none());
}

#[test]
fn exposing_item_ranges_start_at_the_name() {
    // "import Helpers exposing (add, greet)" — `add` begins at column 26.
    let module = parse_ok("module Main exposing (..)\n\nimport Helpers exposing (add, greet)\n\nmain =\n    0\n");
    let exposing = module.imports[0].exposing.as_ref().unwrap();
    match &exposing.node {
        Exposing::Explicit(items) => {
            assert_eq!(items[0].range, Range::from_coords(3, 26, 3, 29));
            assert_eq!(items[1].range, Range::from_coords(3, 31, 3, 36));
        }
        Exposing::All(_) => panic!("expected explicit exposing"),
    }
}

#[test]
fn type_expose_open_range_covers_the_suffix() {
    let module = parse_ok("module Main exposing (Msg(..))\n\ntype Msg\n    = Go\n");
    match &module.header.exposing.node {
        Exposing::Explicit(items) => match &items[0].node {
            ExposedItem::TypeExpose { name, open_range } => {
                assert_eq!(name, "Msg");
                assert!(open_range.is_some());
                // Item range spans `Msg(..)`, name alone is the first 3 cols.
                assert_eq!(items[0].range.start.column, 23);
                assert_eq!(items[0].range.end.column, 30);
            }
            other => panic!("expected TypeExpose, got {other:?}"),
        },
        Exposing::All(_) => panic!("expected explicit exposing"),
    }
}

#[test]
fn custom_type_with_constructors() {
    let module = parse_ok(indoc! {"
        module Types exposing (..)

        type Msg
            = Increment
            | Decrement
            | SetName String
    "});
    match &module.declarations[0] {
        Declaration::CustomType(decl) => {
            assert_eq!(decl.name.node, "Msg");
            let names: Vec<_> = decl.constructors.iter().map(|c| c.name.node.as_str()).collect();
            assert_eq!(names, vec!["Increment", "Decrement", "SetName"]);
            assert_eq!(decl.constructors[2].arguments.len(), 1);
        }
        other => panic!("expected custom type, got {other:?}"),
    }
}

#[test]
fn type_alias_record() {
    let module = parse_ok(indoc! {"
        module Types exposing (..)

        type alias Model =
            { name : String
            , count : Int
            }
    "});
    match &module.declarations[0] {
        Declaration::TypeAlias(decl) => {
            assert_eq!(decl.name.node, "Model");
            match &decl.type_annotation.kind {
                TypeAnnotationKind::Record(fields) => {
                    assert_eq!(fields.len(), 2);
                    assert_eq!(fields[0].name.node, "name");
                }
                other => panic!("expected record, got {other:?}"),
            }
        }
        other => panic!("expected type alias, got {other:?}"),
    }
}

#[test]
fn function_with_signature() {
    let module = parse_ok(indoc! {"
        module Main exposing (..)

        update : Msg -> Model -> Model
        update msg model =
            model
    "});
    match &module.declarations[0] {
        Declaration::Function(func) => {
            assert_eq!(func.name.node, "update");
            let sig = func.signature.as_ref().unwrap();
            assert_eq!(sig.name.node, "update");
            match &sig.type_annotation.kind {
                TypeAnnotationKind::FunctionType(left, _) => match &left.kind {
                    TypeAnnotationKind::Typed { name, .. } => assert_eq!(name.node.name, "Msg"),
                    other => panic!("expected typed, got {other:?}"),
                },
                other => panic!("expected function type, got {other:?}"),
            }
            assert_eq!(func.arguments.len(), 2);
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn doc_comment_attaches_to_declaration() {
    let module = parse_ok(indoc! {"
        module Main exposing (..)

        {-| Adds two numbers. -}
        add a b =
            a + b
    "});
    match &module.declarations[0] {
        Declaration::Function(func) => {
            assert_eq!(
                func.documentation.as_ref().unwrap().node,
                "Adds two numbers."
            );
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn case_expression_with_aligned_branches() {
    let module = parse_ok(indoc! {"
        module Main exposing (..)

        update msg model =
            case msg of
                Increment ->
                    model + 1

                Decrement ->
                    model - 1

                SetName name ->
                    model
    "});
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("expected function, got {other:?}"),
    };
    match &func.body.kind {
        ExpressionKind::CaseExpression { cases, .. } => {
            assert_eq!(cases.len(), 3);
            match &cases[2].pattern.kind {
                PatternKind::Named { name, args } => {
                    assert_eq!(name.node.name, "SetName");
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected named pattern, got {other:?}"),
            }
        }
        other => panic!("expected case, got {other:?}"),
    }
}

#[test]
fn let_expression_with_function_and_destructuring() {
    let module = parse_ok(indoc! {"
        module Main exposing (..)

        compute x =
            let
                double n =
                    n * 2

                ( lo, hi ) =
                    ( 0, 10 )
            in
            double x + lo + hi
    "});
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("expected function, got {other:?}"),
    };
    match &func.body.kind {
        ExpressionKind::LetExpression { declarations, .. } => {
            assert_eq!(declarations.len(), 2);
            assert!(matches!(declarations[0], LetDeclaration::Function(_)));
            assert!(matches!(declarations[1], LetDeclaration::Destructuring { .. }));
        }
        other => panic!("expected let, got {other:?}"),
    }
}

#[test]
fn lambda_and_operators() {
    let module = parse_ok("module Main exposing (..)\n\nf xs =\n    List.map (\\x -> x + 1) xs\n");
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("expected function, got {other:?}"),
    };
    match &func.body.kind {
        ExpressionKind::Application(items) => {
            match &items[0].kind {
                ExpressionKind::FunctionOrValue { module_parts, name } => {
                    assert_eq!(module_parts, &["List".to_string()]);
                    assert_eq!(name, "map");
                }
                other => panic!("expected qualified value, got {other:?}"),
            }
            assert!(matches!(
                &items[1].kind,
                ExpressionKind::Parenthesized(inner)
                    if matches!(inner.kind, ExpressionKind::Lambda { .. })
            ));
        }
        other => panic!("expected application, got {other:?}"),
    }
}

#[test]
fn operator_precedence_shapes_the_tree() {
    let module = parse_ok("module Main exposing (..)\n\nf a b =\n    a + b * 2\n");
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("unexpected {other:?}"),
    };
    match &func.body.kind {
        ExpressionKind::OperatorApplication { operator, right, .. } => {
            assert_eq!(operator, "+");
            assert!(matches!(
                &right.kind,
                ExpressionKind::OperatorApplication { operator, .. } if operator == "*"
            ));
        }
        other => panic!("expected operator application, got {other:?}"),
    }
}

#[test]
fn record_update_expression() {
    let module =
        parse_ok("module Main exposing (..)\n\nrename model name =\n    { model | name = name }\n");
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("unexpected {other:?}"),
    };
    match &func.body.kind {
        ExpressionKind::RecordUpdate { name, setters } => {
            assert_eq!(name.node, "model");
            assert_eq!(setters.len(), 1);
            assert_eq!(setters[0].node.name.node, "name");
        }
        other => panic!("expected record update, got {other:?}"),
    }
}

#[test]
fn record_access_and_access_function() {
    let module = parse_ok("module Main exposing (..)\n\nnames people =\n    List.map .name people\n");
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("unexpected {other:?}"),
    };
    match &func.body.kind {
        ExpressionKind::Application(items) => {
            assert!(matches!(
                &items[1].kind,
                ExpressionKind::RecordAccessFunction(name) if name == "name"
            ));
        }
        other => panic!("expected application, got {other:?}"),
    }
}

#[test]
fn if_expression() {
    let module = parse_ok(
        "module Main exposing (..)\n\nsign n =\n    if n > 0 then\n        1\n\n    else\n        0\n",
    );
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("unexpected {other:?}"),
    };
    assert!(matches!(&func.body.kind, ExpressionKind::IfBlock { .. }));
}

#[test]
fn declaration_ranges_enclose_bodies() {
    let source = indoc! {"
        module Main exposing (..)

        update : Int -> Int
        update n =
            case n of
                0 ->
                    1

                _ ->
                    n
    "};
    let module = parse_ok(source);
    let decl = &module.declarations[0];
    let decl_range = decl.range();
    match decl {
        Declaration::Function(func) => {
            assert!(decl_range.encloses(func.name.range));
            assert!(decl_range.encloses(func.body.range));
            assert!(decl_range.encloses(func.signature.as_ref().unwrap().range));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn qualified_value_range_covers_the_whole_chain() {
    let module = parse_ok("module Main exposing (..)\n\nf xs =\n    Json.Decode.list xs\n");
    let func = match &module.declarations[0] {
        Declaration::Function(func) => func,
        other => panic!("unexpected {other:?}"),
    };
    match &func.body.kind {
        ExpressionKind::Application(items) => {
            // `Json.Decode.list` sits at columns 5..21 on line 4.
            assert_eq!(items[0].range, Range::from_coords(4, 5, 4, 21));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn destructuring_declaration() {
    let module = parse_ok("module Main exposing (..)\n\n( width, height ) =\n    ( 800, 600 )\n");
    assert!(matches!(
        &module.declarations[0],
        Declaration::Destructuring(_)
    ));
}

#[test]
fn infix_declaration() {
    let module =
        parse_ok("module Main exposing (..)\n\ninfix right 5 (++) = append\n\nappend a b =\n    a\n");
    match &module.declarations[0] {
        Declaration::Infix(decl) => {
            assert_eq!(decl.operator.node, "++");
            assert_eq!(decl.precedence, 5);
            assert_eq!(decl.function.node, "append");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn parse_failure_reports_a_position() {
    let err = parse("module Main exposing (..)\n\nbroken = = =\n").unwrap_err();
    assert_eq!(err.position.line, 3);
}

#[test]
fn missing_module_header_is_an_error() {
    assert!(parse("main =\n    0\n").is_err());
}
