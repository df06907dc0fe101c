//! Open-document bookkeeping plus the cached route from a URI to its AST.

use crate::ast_cache::AstCache;
use crate::parse_service::ParseService;
use crate::symbol_index::SymbolIndex;
use elmls_core::project::{Project, ProjectCache};
use elmls_core::{uri as uri_util, Module};
use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, Uri,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub struct Document {
    pub text: String,
    pub version: i32,
}

/// Manages open documents and the caches keyed off them.
pub struct DocumentManager {
    documents: HashMap<Uri, Document>,
    ast_cache: Mutex<AstCache>,
    parse_service: ParseService,
    projects: ProjectCache,
    symbol_index: SymbolIndex,
    workspace_root: Option<PathBuf>,
}

impl DocumentManager {
    pub fn new() -> Self {
        DocumentManager {
            documents: HashMap::new(),
            ast_cache: Mutex::new(AstCache::new()),
            parse_service: ParseService::new(),
            projects: ProjectCache::new(),
            symbol_index: SymbolIndex::new(),
            workspace_root: None,
        }
    }

    pub fn set_workspace_root(&mut self, root: PathBuf) {
        self.workspace_root = Some(root);
    }

    /// The project for workspace-scoped queries: the workspace root's
    /// manifest, or failing that any open document's.
    pub fn workspace_project(&self) -> Option<Arc<Project>> {
        if let Some(root) = &self.workspace_root {
            if let Ok(project) = self.projects.find_project_for(root) {
                return Some(project);
            }
        }
        self.documents
            .keys()
            .find_map(|uri| self.project_for(uri))
    }

    pub fn open(&mut self, params: DidOpenTextDocumentParams) {
        self.documents.insert(
            params.text_document.uri,
            Document {
                text: params.text_document.text,
                version: params.text_document.version,
            },
        );
    }

    /// Full-content sync: the last change in the batch carries the whole
    /// new text.
    pub fn change(&mut self, params: DidChangeTextDocumentParams) {
        if let Some(doc) = self.documents.get_mut(&params.text_document.uri) {
            doc.version = params.text_document.version;
            if let Some(change) = params.content_changes.into_iter().last() {
                doc.text = change.text;
            }
        }
    }

    /// Close removes the document; version-keyed cache entries become
    /// unreachable and age out under LRU pressure.
    pub fn close(&mut self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
    }

    pub fn get(&self, uri: &Uri) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn all_documents(&self) -> impl Iterator<Item = (&Uri, &Document)> {
        self.documents.iter()
    }

    pub fn symbol_index(&self) -> &SymbolIndex {
        &self.symbol_index
    }

    pub fn parse_service(&self) -> &ParseService {
        &self.parse_service
    }

    /// The AST for an open document at its current version. Serves from the
    /// cache when the version matches; otherwise parses and, if the document
    /// has not moved on meanwhile, caches the result. Parse failures are
    /// never cached.
    pub fn ast_for(&self, uri: &Uri) -> Option<Arc<Module>> {
        let doc = self.documents.get(uri)?;
        let version = doc.version;
        if let Some(cached) = self.ast_cache.lock().unwrap().get(uri, version) {
            return Some(cached);
        }
        let ast = self.parse_service.parse(&doc.text)?;
        // The parse service is latest-wins, so re-check the store before
        // treating this AST as valid for (uri, version).
        if self.documents.get(uri).is_some_and(|d| d.version == version) {
            self.ast_cache
                .lock()
                .unwrap()
                .put(uri.clone(), version, Arc::clone(&ast));
        }
        Some(ast)
    }

    /// A fresh, uncached parse. Workspace sweeps use this so a 50-entry
    /// cache is not churned by visiting every file in the project.
    pub fn parse_source(&self, source: &str) -> Option<Arc<Module>> {
        self.parse_service.parse(source)
    }

    /// The AST for an arbitrary project file: open-document content when the
    /// file is open, otherwise its on-disk content, parsed fresh.
    pub fn ast_for_path(&self, path: &Path) -> Option<Arc<Module>> {
        let uri = Uri::from_str(&uri_util::path_to_uri(path)).ok()?;
        if self.documents.contains_key(&uri) {
            return self.ast_for(&uri);
        }
        let text = std::fs::read_to_string(path).ok()?;
        self.parse_source(&text)
    }

    pub fn project_for(&self, uri: &Uri) -> Option<Arc<Project>> {
        let path = uri_util::uri_to_path(uri.as_str())?;
        self.projects.find_project_for(&path).ok()
    }

    pub fn projects(&self) -> &ProjectCache {
        &self.projects
    }

    /// Resolve a dotted module name to its file and AST. Package modules
    /// have no file and yield `None` here; their docs are consulted
    /// separately.
    pub fn module_ast(&self, project: &Project, module_name: &str) -> Option<(Uri, Arc<Module>)> {
        let path = project.resolve_module_to_file(module_name)?;
        let uri = Uri::from_str(&uri_util::path_to_uri(&path)).ok()?;
        let ast = self.ast_for_path(&path)?;
        Some((uri, ast))
    }

    pub fn module_file_uri(&self, project: &Project, module_name: &str) -> Option<Uri> {
        let path = project.resolve_module_to_file(module_name)?;
        Uri::from_str(&uri_util::path_to_uri(&path)).ok()
    }

    pub fn path_for(&self, uri: &Uri) -> Option<PathBuf> {
        uri_util::uri_to_path(uri.as_str())
    }
}

impl Default for DocumentManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{
        TextDocumentContentChangeEvent, TextDocumentItem, VersionedTextDocumentIdentifier,
    };

    fn uri() -> Uri {
        Uri::from_str("file:///project/src/Main.elm").unwrap()
    }

    fn open_params(text: &str, version: i32) -> DidOpenTextDocumentParams {
        DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri(),
                language_id: "elm".to_string(),
                version,
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn change_replaces_text_and_version() {
        let mut manager = DocumentManager::new();
        manager.open(open_params("module Main exposing (..)\n\nx =\n    1\n", 1));
        manager.change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "module Main exposing (..)\n\nx =\n    2\n".to_string(),
            }],
        });
        let doc = manager.get(&uri()).unwrap();
        assert_eq!(doc.version, 2);
        assert!(doc.text.contains("    2"));
    }

    #[test]
    fn ast_is_cached_per_version() {
        let mut manager = DocumentManager::new();
        manager.open(open_params("module Main exposing (..)\n\nx =\n    1\n", 1));
        let first = manager.ast_for(&uri()).unwrap();
        let second = manager.ast_for(&uri()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn parse_failure_yields_none_and_is_not_cached() {
        let mut manager = DocumentManager::new();
        manager.open(open_params("module Main exposing (..)\n\nbroken = =\n", 1));
        assert!(manager.ast_for(&uri()).is_none());
        assert!(manager.ast_for(&uri()).is_none());
    }

    #[test]
    fn close_removes_the_document() {
        let mut manager = DocumentManager::new();
        manager.open(open_params("module Main exposing (..)\n\nx =\n    1\n", 1));
        manager.close(DidCloseTextDocumentParams {
            text_document: lsp_types::TextDocumentIdentifier { uri: uri() },
        });
        assert!(manager.get(&uri()).is_none());
    }
}
