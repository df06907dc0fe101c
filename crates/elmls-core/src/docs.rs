//! Pre-rendered package documentation, as shipped in each dependency's
//! `docs.json`. Hover and completion read these records for modules that
//! never resolve to a project file.

use serde::Deserialize;

/// One module's documentation inside a package.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDocs {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub unions: Vec<UnionDocs>,
    #[serde(default)]
    pub aliases: Vec<AliasDocs>,
    #[serde(default)]
    pub values: Vec<ValueDocs>,
    #[serde(default)]
    pub binops: Vec<ValueDocs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnionDocs {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Constructor tuples: `["Just", ["a"]]`.
    #[serde(default)]
    pub cases: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AliasDocs {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(rename = "type", default)]
    pub type_: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueDocs {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "type", default)]
    pub type_: String,
}

impl ModuleDocs {
    /// The union that declares constructor `name`, if any.
    pub fn union_with_constructor(&self, name: &str) -> Option<(&UnionDocs, &str)> {
        self.unions.iter().find_map(|union| {
            union
                .cases
                .iter()
                .find(|(case, _)| case == name)
                .map(|(case, _)| (union, case.as_str()))
        })
    }

    /// Every name this module offers to importers, values first.
    pub fn exported_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.iter().map(|v| v.name.as_str()).collect();
        names.extend(self.aliases.iter().map(|a| a.name.as_str()));
        for union in &self.unions {
            names.push(union.name.as_str());
            names.extend(union.cases.iter().map(|(case, _)| case.as_str()));
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_docs_module() {
        let json = r#"{
            "name": "Maybe",
            "comment": "This library fills a bunch of important niches.",
            "unions": [
                {
                    "name": "Maybe",
                    "comment": "Represent values that may or may not exist.",
                    "args": ["a"],
                    "cases": [["Just", ["a"]], ["Nothing", []]]
                }
            ],
            "aliases": [],
            "values": [
                { "name": "withDefault", "comment": "", "type": "a -> Maybe.Maybe a -> a" }
            ],
            "binops": []
        }"#;
        let docs: ModuleDocs = serde_json::from_str(json).unwrap();
        assert_eq!(docs.name, "Maybe");
        let (union, case) = docs.union_with_constructor("Just").unwrap();
        assert_eq!(union.name, "Maybe");
        assert_eq!(case, "Just");
        assert!(docs.exported_names().contains(&"withDefault"));
        assert!(docs.exported_names().contains(&"Nothing"));
    }

    #[test]
    fn tolerates_missing_fields() {
        let docs: ModuleDocs = serde_json::from_str(r#"{ "name": "Empty" }"#).unwrap();
        assert!(docs.exported_names().is_empty());
    }
}
