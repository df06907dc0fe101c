//! LRU cache of parsed modules, keyed by URI with at most one entry per
//! URI. An entry is only served when its recorded version matches the
//! requested one exactly; a newer version simply replaces the older entry.

use elmls_core::Module;
use lsp_types::Uri;
use std::sync::Arc;

pub const CAPACITY: usize = 50;

struct Entry {
    uri: Uri,
    version: i32,
    ast: Arc<Module>,
}

/// Most-recently-used entries sit at the front; inserting past capacity
/// drops the back.
#[derive(Default)]
pub struct AstCache {
    entries: Vec<Entry>,
}

impl AstCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, uri: &Uri, version: i32) -> Option<Arc<Module>> {
        let index = self.entries.iter().position(|e| &e.uri == uri)?;
        if self.entries[index].version != version {
            return None;
        }
        let entry = self.entries.remove(index);
        let ast = Arc::clone(&entry.ast);
        self.entries.insert(0, entry);
        Some(ast)
    }

    pub fn put(&mut self, uri: Uri, version: i32, ast: Arc<Module>) {
        self.entries.retain(|e| e.uri != uri);
        self.entries.insert(0, Entry { uri, version, ast });
        self.entries.truncate(CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, uri: &Uri) -> bool {
        self.entries.iter().any(|e| &e.uri == uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmls_core::parse;
    use std::str::FromStr;

    fn test_ast() -> Arc<Module> {
        Arc::new(parse("module Cached exposing (..)\n\nvalue =\n    1\n").unwrap())
    }

    fn uri(n: usize) -> Uri {
        Uri::from_str(&format!("file:///test/File{n}.elm")).unwrap()
    }

    #[test]
    fn version_must_match_exactly() {
        let mut cache = AstCache::new();
        cache.put(uri(1), 3, test_ast());
        assert!(cache.get(&uri(1), 3).is_some());
        assert!(cache.get(&uri(1), 2).is_none());
        assert!(cache.get(&uri(1), 4).is_none());
    }

    #[test]
    fn put_replaces_the_entry_for_a_uri() {
        let mut cache = AstCache::new();
        cache.put(uri(1), 1, test_ast());
        cache.put(uri(1), 2, test_ast());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&uri(1), 1).is_none());
        assert!(cache.get(&uri(1), 2).is_some());
    }

    #[test]
    fn fifty_first_insert_evicts_the_least_recently_used() {
        let mut cache = AstCache::new();
        for n in 0..CAPACITY {
            cache.put(uri(n), 1, test_ast());
        }
        // Touch the oldest entry so it is no longer the eviction candidate.
        assert!(cache.get(&uri(0), 1).is_some());
        cache.put(uri(CAPACITY), 1, test_ast());

        assert_eq!(cache.len(), CAPACITY);
        assert!(cache.contains(&uri(0)));
        assert!(!cache.contains(&uri(1)));
        assert!(cache.contains(&uri(CAPACITY)));
    }

    #[test]
    fn get_bumps_recency() {
        let mut cache = AstCache::new();
        cache.put(uri(1), 1, test_ast());
        cache.put(uri(2), 1, test_ast());
        assert!(cache.get(&uri(1), 1).is_some());
        for n in 3..=CAPACITY + 1 {
            cache.put(uri(n), 1, test_ast());
        }
        // uri(2) was least recently used once uri(1) was read back.
        assert!(cache.contains(&uri(1)));
        assert!(!cache.contains(&uri(2)));
    }
}
