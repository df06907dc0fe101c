//! Per-file view of which modules supply which names, derived from the
//! import list and seeded with the implicit prelude every file receives.

use crate::ast::{ExposedItem, Exposing, Module};
use rustc_hash::FxHashMap;

/// Modules importable without an `import` line. Reference scans use this to
/// decide that any file may mention a symbol defined in one of them.
pub const PRELUDE_MODULES: &[&str] = &[
    "Basics",
    "List",
    "Maybe",
    "Result",
    "String",
    "Char",
    "Tuple",
    "Debug",
    "Platform",
    "Platform.Cmd",
    "Platform.Sub",
];

/// Name-to-module routing for one file.
///
/// Insertion order is significant everywhere: lookups resolve to the first
/// module recorded for a name, so prelude entries come first and user
/// imports follow in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ImportTracker {
    /// Bare name → modules that explicitly expose it to this file.
    explicit_exposing: FxHashMap<String, Vec<String>>,
    /// Modules imported with `exposing (..)`.
    unknown_imports: Vec<String>,
    /// Alias → real modules it denotes.
    alias_mapping: FxHashMap<String, Vec<String>>,
}

impl ImportTracker {
    pub fn new(module: &Module) -> Self {
        let mut tracker = ImportTracker::default();
        tracker.seed_prelude();

        for import in &module.imports {
            let module_name = import.module_name.node.clone();

            if let Some(alias) = &import.alias {
                tracker.add_alias(&alias.node, &module_name);
            }

            match import.exposing.as_ref().map(|e| &e.node) {
                Some(Exposing::All(_)) => tracker.add_unknown(&module_name),
                Some(Exposing::Explicit(items)) => {
                    for item in items {
                        tracker.add_explicit(item.node.name(), &module_name);
                        // `T(..)` makes the constructors visible too, but their
                        // names are only known from the defining module's AST;
                        // open-import fallback handles that side.
                        if let ExposedItem::TypeExpose {
                            open_range: Some(_),
                            ..
                        } = &item.node
                        {
                            tracker.add_unknown(&module_name);
                        }
                    }
                }
                None => {}
            }
        }

        tracker
    }

    fn seed_prelude(&mut self) {
        for (name, module) in [
            ("List", "List"),
            ("::", "List"),
            ("Maybe", "Maybe"),
            ("Just", "Maybe"),
            ("Nothing", "Maybe"),
            ("Result", "Result"),
            ("Ok", "Result"),
            ("Err", "Result"),
            ("String", "String"),
            ("Char", "Char"),
            ("Program", "Platform"),
            ("Cmd", "Platform.Cmd"),
            ("Sub", "Platform.Sub"),
        ] {
            self.add_explicit(name, module);
        }
        self.add_unknown("Basics");
        self.add_alias("Cmd", "Platform.Cmd");
        self.add_alias("Sub", "Platform.Sub");
    }

    fn add_explicit(&mut self, name: &str, module: &str) {
        let modules = self.explicit_exposing.entry(name.to_string()).or_default();
        if !modules.iter().any(|m| m == module) {
            modules.push(module.to_string());
        }
    }

    fn add_unknown(&mut self, module: &str) {
        if !self.unknown_imports.iter().any(|m| m == module) {
            self.unknown_imports.push(module.to_string());
        }
    }

    fn add_alias(&mut self, alias: &str, module: &str) {
        let modules = self.alias_mapping.entry(alias.to_string()).or_default();
        if !modules.iter().any(|m| m == module) {
            modules.push(module.to_string());
        }
    }

    /// Modules that explicitly expose `name` to this file, in encounter order.
    pub fn explicit_exposing(&self, name: &str) -> &[String] {
        self.explicit_exposing
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Modules imported with `exposing (..)`, in encounter order.
    pub fn unknown_imports(&self) -> &[String] {
        &self.unknown_imports
    }

    /// Real modules a qualifier denotes: alias targets when the qualifier is
    /// an alias, otherwise the qualifier itself.
    pub fn resolve_qualifier(&self, qualifier: &str) -> Vec<String> {
        match self.alias_mapping.get(qualifier) {
            Some(modules) => modules.clone(),
            None => vec![qualifier.to_string()],
        }
    }

    /// Whether `module` is reachable from this file at all: explicitly
    /// exposing something, open-imported, or aliased.
    pub fn mentions_module(&self, module: &str) -> bool {
        self.unknown_imports.iter().any(|m| m == module)
            || self
                .explicit_exposing
                .values()
                .any(|modules| modules.iter().any(|m| m == module))
            || self
                .alias_mapping
                .values()
                .any(|modules| modules.iter().any(|m| m == module))
    }
}
