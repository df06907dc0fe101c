//! Workspace-wide symbol search. Extraction runs regexes over raw file
//! text rather than parsing, so a query stays fast on large projects; the
//! result set is cached per project folder and rebuilt once it is more than
//! five seconds old.

use crate::convert::to_lsp_range;
use elmls_core::project::Project;
use elmls_core::span::Range;
use elmls_core::uri as uri_util;
use lsp_types::{SymbolInformation, SymbolKind, Uri};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const CACHE_TTL: Duration = Duration::from_secs(5);

static TYPE_ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^type\s+alias\s+([A-Z][A-Za-z0-9_]*)").unwrap());
static TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^type\s+([A-Z][A-Za-z0-9_]*)").unwrap());
static PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^port\s+([a-z][A-Za-z0-9_]*)\s*:").unwrap());
static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z][A-Za-z0-9_']*)").unwrap());

const RESERVED: &[&str] = &[
    "module", "import", "exposing", "as", "if", "then", "else", "case", "of", "let", "in", "type",
    "alias", "port", "where",
];

#[derive(Debug, Clone)]
struct RawSymbol {
    name: String,
    kind: SymbolKind,
    uri: Uri,
    range: Range,
}

struct CachedScan {
    project_folder: PathBuf,
    built_at: Instant,
    symbols: Vec<RawSymbol>,
}

#[derive(Default)]
pub struct SymbolIndex {
    cache: Mutex<Option<CachedScan>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// All symbols matching `query`. An empty query returns everything;
    /// otherwise names are matched by case-insensitive subsequence.
    pub fn search(&self, query: &str, project: &Project) -> Vec<SymbolInformation> {
        let mut cache = self.cache.lock().unwrap();
        let stale = match cache.as_ref() {
            Some(scan) => {
                scan.project_folder != project.project_folder
                    || scan.built_at.elapsed() >= CACHE_TTL
            }
            None => true,
        };
        if stale {
            *cache = Some(CachedScan {
                project_folder: project.project_folder.clone(),
                built_at: Instant::now(),
                symbols: scan_project(project),
            });
        }

        let symbols = &cache.as_ref().unwrap().symbols;
        symbols
            .iter()
            .filter(|symbol| query.is_empty() || fuzzy_matches(query, &symbol.name))
            .map(to_symbol_information)
            .collect()
    }

    /// Drop the cached scan so the next search rebuilds, regardless of age.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap() = None;
    }
}

fn scan_project(project: &Project) -> Vec<RawSymbol> {
    let mut symbols = Vec::new();
    for path in project.all_source_files() {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(uri) = Uri::from_str(&uri_util::path_to_uri(&path)) else {
            continue;
        };
        extract_symbols(&text, &uri, &mut symbols);
    }
    symbols
}

/// Per-line extraction. Within one file each name is emitted once, first
/// occurrence winning, so a signature line claims the name before its
/// implementation line repeats it.
fn extract_symbols(text: &str, uri: &Uri, out: &mut Vec<RawSymbol>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for (line_index, line) in text.lines().enumerate() {
        let line_number = line_index as u32 + 1;

        let (name, kind, column) = if let Some(captures) = TYPE_ALIAS_RE.captures(line) {
            let m = captures.get(1).unwrap();
            (m.as_str(), SymbolKind::OBJECT, m.start() as u32 + 1)
        } else if let Some(captures) = TYPE_RE.captures(line) {
            let m = captures.get(1).unwrap();
            (m.as_str(), SymbolKind::ENUM, m.start() as u32 + 1)
        } else if let Some(captures) = PORT_RE.captures(line) {
            let m = captures.get(1).unwrap();
            (m.as_str(), SymbolKind::FUNCTION, m.start() as u32 + 1)
        } else if let Some(captures) = FUNCTION_RE.captures(line) {
            let m = captures.get(1).unwrap();
            if RESERVED.contains(&m.as_str()) {
                continue;
            }
            (m.as_str(), SymbolKind::FUNCTION, 1)
        } else {
            continue;
        };

        if !seen.insert(name) {
            continue;
        }
        out.push(RawSymbol {
            name: name.to_string(),
            kind,
            uri: uri.clone(),
            range: Range::from_coords(
                line_number,
                column,
                line_number,
                column + name.len() as u32,
            ),
        });
    }
}

/// Case-insensitive subsequence match: every query character appears in the
/// name, in order.
fn fuzzy_matches(query: &str, name: &str) -> bool {
    let mut name_chars = name.chars().flat_map(char::to_lowercase);
    query
        .chars()
        .flat_map(char::to_lowercase)
        .all(|q| name_chars.any(|n| n == q))
}

fn to_symbol_information(symbol: &RawSymbol) -> SymbolInformation {
    #[allow(deprecated)] // SymbolInformation carries deprecated fields
    SymbolInformation {
        name: symbol.name.clone(),
        kind: symbol.kind,
        tags: None,
        deprecated: None,
        location: lsp_types::Location {
            uri: symbol.uri.clone(),
            range: to_lsp_range(symbol.range),
        },
        container_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols_in(text: &str) -> Vec<(String, SymbolKind)> {
        let uri = Uri::from_str("file:///test/Main.elm").unwrap();
        let mut out = Vec::new();
        extract_symbols(text, &uri, &mut out);
        out.into_iter().map(|s| (s.name, s.kind)).collect()
    }

    #[test]
    fn extracts_each_declaration_form() {
        let text = "module Main exposing (..)\n\
                    type alias Model = {}\n\
                    type Msg\n\
                    port save : String -> Cmd msg\n\
                    multiply a b =\n";
        assert_eq!(
            symbols_in(text),
            vec![
                ("Model".to_string(), SymbolKind::OBJECT),
                ("Msg".to_string(), SymbolKind::ENUM),
                ("save".to_string(), SymbolKind::FUNCTION),
                ("multiply".to_string(), SymbolKind::FUNCTION),
            ]
        );
    }

    #[test]
    fn reserved_keywords_are_not_symbols() {
        let text = "import List\nexposing (a)\nif x then\nlet\nvalue = 1\n";
        assert_eq!(
            symbols_in(text),
            vec![("value".to_string(), SymbolKind::FUNCTION)]
        );
    }

    #[test]
    fn duplicate_names_emit_once_per_file() {
        let text = "add : Int -> Int\nadd a =\n    a\n";
        assert_eq!(
            symbols_in(text),
            vec![("add".to_string(), SymbolKind::FUNCTION)]
        );
    }

    #[test]
    fn indented_lines_are_skipped() {
        let text = "outer =\n    inner\n";
        assert_eq!(
            symbols_in(text),
            vec![("outer".to_string(), SymbolKind::FUNCTION)]
        );
    }

    #[test]
    fn fuzzy_match_is_a_case_insensitive_subsequence() {
        assert!(fuzzy_matches("mult", "multiply"));
        assert!(fuzzy_matches("mlt", "multiply"));
        assert!(fuzzy_matches("MULT", "multiply"));
        assert!(!fuzzy_matches("multz", "multiply"));
        assert!(!fuzzy_matches("tlm", "multiply"));
    }
}
