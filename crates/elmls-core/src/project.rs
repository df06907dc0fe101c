//! The `elm.json` project model: manifest discovery, module-to-file
//! resolution across source directories, and package docs loading.

use crate::docs::ModuleDocs;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no elm.json found above {0}")]
    ManifestNotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw `elm.json` shape. Only the fields the server needs are decoded;
/// `dependencies.direct` is the flat user/name → version map.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(rename = "source-directories", default = "default_source_directories")]
    source_directories: Vec<String>,
    #[serde(rename = "elm-version", default)]
    elm_version: String,
    #[serde(default)]
    dependencies: RawDependencies,
}

#[derive(Debug, Default, Deserialize)]
struct RawDependencies {
    #[serde(default)]
    direct: std::collections::BTreeMap<String, String>,
}

fn default_source_directories() -> Vec<String> {
    vec!["src".to_string()]
}

/// One direct dependency, with the on-disk location of its rendered docs.
#[derive(Debug, Clone)]
pub struct Dependency {
    /// `user/name` as written in the manifest.
    pub package: String,
    pub version: String,
    pub docs_path: PathBuf,
}

/// A successfully-loaded project.
#[derive(Debug, Clone)]
pub struct Project {
    pub project_folder: PathBuf,
    pub manifest_path: PathBuf,
    pub elm_version: String,
    /// Absolute, in manifest order.
    pub source_directories: Vec<PathBuf>,
    /// Direct dependencies only, in manifest order.
    pub dependencies: Vec<Dependency>,
}

impl Project {
    /// Translate a dotted module name to a file under one of the source
    /// directories. Returns the first hit; package modules have no file.
    pub fn resolve_module_to_file(&self, module_name: &str) -> Option<PathBuf> {
        let relative: PathBuf = module_name.split('.').collect::<PathBuf>().with_extension("elm");
        self.source_directories
            .iter()
            .map(|dir| dir.join(&relative))
            .find(|candidate| candidate.is_file())
    }

    /// Every `.elm` file under every source directory. Reference sweeps and
    /// the workspace symbol index walk this set.
    pub fn all_source_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in &self.source_directories {
            collect_elm_files(dir, &mut files);
        }
        files
    }
}

fn collect_elm_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            // Build artifacts under elm-stuff are never project sources.
            if path.file_name().is_some_and(|n| n == "elm-stuff") {
                continue;
            }
            collect_elm_files(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "elm") {
            out.push(path);
        }
    }
    out.sort();
}

/// The documentation root: `ELM_HOME` if set, else `$HOME/.elm`, else the
/// platform's roaming application data under `elm`.
pub fn elm_home() -> PathBuf {
    if let Ok(home) = std::env::var("ELM_HOME") {
        return PathBuf::from(home);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".elm");
    }
    if let Ok(appdata) = std::env::var("APPDATA") {
        return PathBuf::from(appdata).join("elm");
    }
    PathBuf::from(".elm")
}

/// Loads and caches projects and package docs.
///
/// Manifest lookups walk parent directories and cache per manifest path, so
/// repeated queries from files across the tree converge on the same
/// `Project`. Docs are memoized by docs path for the life of the process.
#[derive(Debug, Default)]
pub struct ProjectCache {
    projects: Mutex<FxHashMap<PathBuf, Arc<Project>>>,
    docs: Mutex<FxHashMap<PathBuf, Arc<Vec<ModuleDocs>>>>,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk ancestors of `file_path` (inclusive) for the nearest directory
    /// whose `elm.json` parses, caching the result.
    pub fn find_project_for(&self, file_path: &Path) -> Result<Arc<Project>, ProjectError> {
        let start = if file_path.is_dir() {
            file_path
        } else {
            file_path.parent().unwrap_or(file_path)
        };
        for dir in start.ancestors() {
            let manifest_path = dir.join("elm.json");
            if let Some(cached) = self.projects.lock().unwrap().get(&manifest_path) {
                return Ok(Arc::clone(cached));
            }
            if !manifest_path.is_file() {
                continue;
            }
            match load_project(&manifest_path) {
                Ok(project) => {
                    let project = Arc::new(project);
                    self.projects
                        .lock()
                        .unwrap()
                        .insert(manifest_path, Arc::clone(&project));
                    return Ok(project);
                }
                Err(err) => {
                    // A malformed manifest higher up should not hide a valid
                    // one further down, but the walk is upward, so keep going.
                    tracing::warn!("ignoring unreadable manifest {:?}: {err}", manifest_path);
                }
            }
        }
        Err(ProjectError::ManifestNotFound(file_path.to_path_buf()))
    }

    /// The decoded docs for a dependency. I/O and decode failures yield an
    /// empty list, memoized like any other result.
    pub fn load_docs(&self, dependency: &Dependency) -> Arc<Vec<ModuleDocs>> {
        if let Some(cached) = self.docs.lock().unwrap().get(&dependency.docs_path) {
            return Arc::clone(cached);
        }
        let docs = std::fs::read_to_string(&dependency.docs_path)
            .ok()
            .and_then(|text| serde_json::from_str::<Vec<ModuleDocs>>(&text).ok())
            .unwrap_or_default();
        let docs = Arc::new(docs);
        self.docs
            .lock()
            .unwrap()
            .insert(dependency.docs_path.clone(), Arc::clone(&docs));
        docs
    }
}

fn load_project(manifest_path: &Path) -> Result<Project, ProjectError> {
    let text = std::fs::read_to_string(manifest_path).map_err(|source| ProjectError::Io {
        path: manifest_path.to_path_buf(),
        source,
    })?;
    let raw: RawManifest =
        serde_json::from_str(&text).map_err(|source| ProjectError::Decode {
            path: manifest_path.to_path_buf(),
            source,
        })?;

    let project_folder = manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let source_directories = raw
        .source_directories
        .iter()
        .map(|dir| {
            let path = PathBuf::from(dir);
            if path.is_absolute() {
                path
            } else {
                project_folder.join(path)
            }
        })
        .collect();

    let home = elm_home();
    let dependencies = raw
        .dependencies
        .direct
        .iter()
        .map(|(package, version)| {
            let docs_path = home
                .join(&raw.elm_version)
                .join("packages")
                .join(package.replace('/', std::path::MAIN_SEPARATOR_STR))
                .join(version)
                .join("docs.json");
            Dependency {
                package: package.clone(),
                version: version.clone(),
                docs_path,
            }
        })
        .collect();

    Ok(Project {
        project_folder,
        manifest_path: manifest_path.to_path_buf(),
        elm_version: raw.elm_version,
        source_directories,
        dependencies,
    })
}
