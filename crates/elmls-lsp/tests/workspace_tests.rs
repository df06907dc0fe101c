//! Cross-module scenarios over an on-disk project: goto-definition through
//! exposing lists, type annotations, local bindings, alias-qualified
//! completion, constructor references, rename, and workspace symbols.

use lsp_types::{
    DidOpenTextDocumentParams, GotoDefinitionResponse, Position, SymbolKind, TextDocumentItem, Uri,
};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tempfile::TempDir;

use elmls_core::uri::path_to_uri;
use elmls_lsp::document::DocumentManager;
use elmls_lsp::providers::{
    CompletionProvider, DefinitionProvider, HoverProvider, ReferencesProvider, RenameProvider,
};

const ELM_JSON: &str = r#"{
    "type": "application",
    "source-directories": ["src"],
    "elm-version": "0.19.1",
    "dependencies": {
        "direct": {},
        "indirect": {}
    }
}"#;

const MAIN: &str = "\
module Main exposing (main, update)

import Helpers exposing (add, greet)
import Types exposing (Model, Msg(..))


main =
    greet \"world\"


update : Msg -> Model -> Model
update msg model =
    case msg of
        Increment ->
            { model | count = add model.count 1 }

        Decrement ->
            { model | count = 0 }

        SetName name ->
            { model | name = name }
";

const HELPERS: &str = "\
module Helpers exposing (add, multiply, greet)


add : Int -> Int -> Int
add a b =
    a + b


multiply : Int -> Int -> Int
multiply a b =
    a * b


greet : String -> String
greet name =
    \"Hello, \" ++ name
";

const TYPES: &str = "\
module Types exposing (Model, Msg(..))


type alias Model =
    { count : Int
    , name : String
    }


type Msg
    = Increment
    | Decrement
    | SetName String
";

struct Fixture {
    _dir: TempDir,
    manager: DocumentManager,
    main_uri: Uri,
    helpers_uri: Uri,
    types_uri: Uri,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(dir.path().join("elm.json"), ELM_JSON).unwrap();
    fs::write(src.join("Main.elm"), MAIN).unwrap();
    fs::write(src.join("Helpers.elm"), HELPERS).unwrap();
    fs::write(src.join("Types.elm"), TYPES).unwrap();

    let mut manager = DocumentManager::new();
    manager.set_workspace_root(dir.path().to_path_buf());
    let main_uri = open(&mut manager, &src.join("Main.elm"), MAIN);
    let helpers_uri = Uri::from_str(&path_to_uri(&src.join("Helpers.elm"))).unwrap();
    let types_uri = Uri::from_str(&path_to_uri(&src.join("Types.elm"))).unwrap();

    Fixture {
        _dir: dir,
        manager,
        main_uri,
        helpers_uri,
        types_uri,
    }
}

fn open(manager: &mut DocumentManager, path: &Path, text: &str) -> Uri {
    let uri = Uri::from_str(&path_to_uri(path)).unwrap();
    manager.open(DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri: uri.clone(),
            language_id: "elm".to_string(),
            version: 1,
            text: text.to_string(),
        },
    });
    uri
}

fn scalar(response: GotoDefinitionResponse) -> lsp_types::Location {
    match response {
        GotoDefinitionResponse::Scalar(location) => location,
        other => panic!("expected scalar location, got {other:?}"),
    }
}

#[test]
fn goto_definition_through_import_exposing() {
    let fixture = fixture();
    let provider = DefinitionProvider::new();

    // Cursor on `add` in `import Helpers exposing (add, greet)`.
    let location = scalar(
        provider
            .provide(&fixture.main_uri, Position::new(2, 26), &fixture.manager)
            .expect("definition for exposed import"),
    );
    assert_eq!(location.uri, fixture.helpers_uri);
    // `add a b =` is line 4 (0-based) in Helpers.elm.
    assert_eq!(location.range.start.line, 4);
    assert_eq!(location.range.start.character, 0);
}

#[test]
fn goto_definition_on_a_type_annotation() {
    let fixture = fixture();
    let provider = DefinitionProvider::new();

    // Cursor on `Msg` in `update : Msg -> Model -> Model`.
    let location = scalar(
        provider
            .provide(&fixture.main_uri, Position::new(10, 9), &fixture.manager)
            .expect("definition for annotation type"),
    );
    assert_eq!(location.uri, fixture.types_uri);
    // `type Msg` is line 9 (0-based) in Types.elm; the name starts at col 5.
    assert_eq!(location.range.start.line, 9);
    assert_eq!(location.range.start.character, 5);
}

#[test]
fn goto_definition_on_a_local_binding() {
    let fixture = fixture();
    let provider = DefinitionProvider::new();

    // Cursor on the right-hand `name` in `{ model | name = name }`.
    let location = scalar(
        provider
            .provide(&fixture.main_uri, Position::new(20, 30), &fixture.manager)
            .expect("definition for local binding"),
    );
    assert_eq!(location.uri, fixture.main_uri);
    // The binder is the `name` in the `SetName name ->` pattern one line up.
    assert_eq!(location.range.start.line, 19);
    assert_eq!(location.range.start.character, 16);
}

#[test]
fn goto_definition_on_import_module_name() {
    let fixture = fixture();
    let provider = DefinitionProvider::new();

    // Cursor on `Helpers` in the import line jumps to the file start.
    let location = scalar(
        provider
            .provide(&fixture.main_uri, Position::new(2, 9), &fixture.manager)
            .expect("definition for import module"),
    );
    assert_eq!(location.uri, fixture.helpers_uri);
    assert_eq!(location.range.start, Position::new(0, 0));
}

#[test]
fn qualified_completion_through_an_alias() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(dir.path().join("elm.json"), ELM_JSON).unwrap();
    fs::write(src.join("Helpers.elm"), HELPERS).unwrap();
    let sandbox = "module Sandbox exposing (x)\n\nimport Helpers as H\n\nx =\n    H.\n";
    fs::write(src.join("Sandbox.elm"), sandbox).unwrap();

    let mut manager = DocumentManager::new();
    let uri = open(&mut manager, &src.join("Sandbox.elm"), sandbox);

    let provider = CompletionProvider::new();
    // Cursor immediately after the dot in `H.`.
    let items = provider.provide(&uri, Position::new(5, 6), &manager);
    let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
    assert!(labels.contains(&"add"), "labels were {labels:?}");
    assert!(labels.contains(&"multiply"), "labels were {labels:?}");
    assert!(labels.contains(&"greet"), "labels were {labels:?}");
}

#[test]
fn references_to_a_constructor_cross_modules() {
    let mut fixture = fixture();
    let types_path = fixture.manager.path_for(&fixture.types_uri).unwrap();
    open(&mut fixture.manager, &types_path, TYPES);

    let provider = ReferencesProvider::new();
    // Cursor on `Increment` in `    = Increment` in Types.elm.
    let locations = provider
        .provide(&fixture.types_uri, Position::new(10, 7), true, &fixture.manager)
        .expect("references for constructor");

    assert!(
        locations
            .iter()
            .any(|l| l.uri == fixture.types_uri && l.range.start.line == 10),
        "missing declaration site in {locations:?}"
    );
    assert!(
        locations
            .iter()
            .any(|l| l.uri == fixture.main_uri && l.range.start.line == 13),
        "missing pattern site in {locations:?}"
    );
}

#[test]
fn references_without_declaration_drop_the_defining_site() {
    let mut fixture = fixture();
    let types_path = fixture.manager.path_for(&fixture.types_uri).unwrap();
    open(&mut fixture.manager, &types_path, TYPES);

    let provider = ReferencesProvider::new();
    let with_decl = provider
        .provide(&fixture.types_uri, Position::new(10, 7), true, &fixture.manager)
        .unwrap();
    let without_decl = provider
        .provide(&fixture.types_uri, Position::new(10, 7), false, &fixture.manager)
        .unwrap();

    assert_eq!(with_decl.len(), without_decl.len() + 1);
    assert!(!without_decl
        .iter()
        .any(|l| l.uri == fixture.types_uri && l.range.start == Position::new(10, 6)));
}

#[test]
fn rename_produces_trimmed_edits_in_both_files() {
    let mut fixture = fixture();
    let helpers_path = fixture.manager.path_for(&fixture.helpers_uri).unwrap();
    open(&mut fixture.manager, &helpers_path, HELPERS);

    let provider = RenameProvider::new();
    // Cursor on the `add` implementation name in Helpers.elm (line 4).
    let edit = provider
        .rename(&fixture.helpers_uri, Position::new(4, 1), "plus", &fixture.manager)
        .expect("rename workspace edit");
    let changes = edit.changes.unwrap();

    let helpers_edits = &changes[&fixture.helpers_uri];
    // Exposing item, signature name, implementation name.
    assert_eq!(helpers_edits.len(), 3);
    assert!(helpers_edits.iter().all(|e| e.new_text == "plus"));
    // The exposing-list edit covers `add` only.
    let exposing_edit = helpers_edits
        .iter()
        .find(|e| e.range.start.line == 0)
        .unwrap();
    assert_eq!(exposing_edit.range.start.character, 25);
    assert_eq!(exposing_edit.range.end.character, 28);

    let main_edits = &changes[&fixture.main_uri];
    // Import exposing item and the use site inside `update`.
    assert_eq!(main_edits.len(), 2);
    let use_edit = main_edits.iter().find(|e| e.range.start.line == 14).unwrap();
    assert_eq!(use_edit.range.start.character, 30);
    assert_eq!(use_edit.range.end.character, 33);
}

#[test]
fn prepare_rename_requires_a_reference_site() {
    let fixture = fixture();
    let provider = RenameProvider::new();

    // On the `add` use site: accepted, with the symbol text as placeholder.
    let prepared = provider
        .prepare(&fixture.main_uri, Position::new(14, 31), &fixture.manager)
        .expect("prepare on a reference site");
    match prepared {
        lsp_types::PrepareRenameResponse::RangeWithPlaceholder { placeholder, .. } => {
            assert_eq!(placeholder, "add");
        }
        other => panic!("expected range with placeholder, got {other:?}"),
    }

    // In the middle of whitespace: refused.
    assert!(provider
        .prepare(&fixture.main_uri, Position::new(13, 2), &fixture.manager)
        .is_none());
}

#[test]
fn hover_renders_the_signature_from_the_defining_module() {
    let fixture = fixture();
    let provider = HoverProvider::new();

    // Cursor on the `add` use site inside `update`.
    let hover = provider
        .provide(&fixture.main_uri, Position::new(14, 31), &fixture.manager)
        .expect("hover for cross-module value");
    let lsp_types::HoverContents::Markup(content) = hover.contents else {
        panic!("expected markup hover");
    };
    assert!(content.value.contains("add : Int -> Int -> Int"));
    assert!(content.value.contains("*Helpers*"));
}

#[test]
fn every_reference_range_slices_to_the_symbol_name() {
    let mut fixture = fixture();
    let helpers_path = fixture.manager.path_for(&fixture.helpers_uri).unwrap();
    open(&mut fixture.manager, &helpers_path, HELPERS);

    let provider = ReferencesProvider::new();
    let locations = provider
        .provide(&fixture.helpers_uri, Position::new(4, 1), true, &fixture.manager)
        .unwrap();
    assert!(locations.len() >= 4, "got {locations:?}");

    for location in locations {
        let text = if location.uri == fixture.main_uri {
            MAIN
        } else {
            HELPERS
        };
        let line = text.lines().nth(location.range.start.line as usize).unwrap();
        let slice: String = line
            .chars()
            .skip(location.range.start.character as usize)
            .take((location.range.end.character - location.range.start.character) as usize)
            .collect();
        assert_eq!(slice, "add", "range {:?} in {line:?}", location.range);
    }
}

#[test]
fn workspace_symbols_fuzzy_match_and_kinds() {
    let fixture = fixture();
    let project = fixture.manager.workspace_project().unwrap();
    let index = fixture.manager.symbol_index();

    let hits = index.search("mult", &project);
    assert!(hits.iter().any(|s| s.name == "multiply"));

    let all = index.search("", &project);
    let find = |name: &str| {
        all.iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("missing symbol {name}"))
    };
    assert_eq!(find("Model").kind, SymbolKind::OBJECT);
    assert_eq!(find("Msg").kind, SymbolKind::ENUM);
    assert_eq!(find("multiply").kind, SymbolKind::FUNCTION);
    assert_eq!(find("update").kind, SymbolKind::FUNCTION);

    let none = index.search("zzzz", &project);
    assert!(none.is_empty());
}
