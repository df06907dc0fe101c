//! Compiler diagnostics. Saves and opens kick off a debounced background
//! run of the external compiler with a JSON report; every file the report
//! mentions gets its diagnostics published, and a clean (or unmentioned)
//! saved file gets an explicit empty publish to clear stale squiggles.

use crossbeam_channel::Sender;
use lsp_server::{Message, Notification};
use lsp_types::notification::{Notification as NotificationTrait, PublishDiagnostics, ShowMessage};
use lsp_types::{
    Diagnostic, DiagnosticSeverity, MessageType, PublishDiagnosticsParams, ShowMessageParams, Uri,
};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEBOUNCE: Duration = Duration::from_millis(300);

pub struct DiagnosticsProvider {
    generations: Arc<Mutex<FxHashMap<String, u64>>>,
    counter: Arc<AtomicU64>,
    tool_reported: Arc<Mutex<bool>>,
}

impl DiagnosticsProvider {
    pub fn new() -> Self {
        DiagnosticsProvider {
            generations: Arc::new(Mutex::new(FxHashMap::default())),
            counter: Arc::new(AtomicU64::new(0)),
            tool_reported: Arc::new(Mutex::new(false)),
        }
    }

    /// Queue a compile of `path` for `uri`, debounced per URI: only the
    /// latest scheduled run within the window actually invokes the
    /// compiler.
    pub fn schedule(
        &self,
        uri: &Uri,
        path: PathBuf,
        project_folder: PathBuf,
        outgoing: Sender<Message>,
    ) {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations
            .lock()
            .unwrap()
            .insert(uri.as_str().to_string(), generation);

        let generations = Arc::clone(&self.generations);
        let tool_reported = Arc::clone(&self.tool_reported);
        let uri = uri.clone();

        std::thread::spawn(move || {
            std::thread::sleep(DEBOUNCE);
            let current = generations
                .lock()
                .unwrap()
                .get(uri.as_str())
                .copied()
                .unwrap_or(0);
            if current != generation {
                return;
            }
            run_compiler(&uri, &path, &project_folder, &outgoing, &tool_reported);
        });
    }
}

impl Default for DiagnosticsProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn run_compiler(
    uri: &Uri,
    path: &Path,
    project_folder: &Path,
    outgoing: &Sender<Message>,
    tool_reported: &Mutex<bool>,
) {
    let output = Command::new("elm")
        .arg("make")
        .arg(path)
        .arg("--report=json")
        .arg("--output=/dev/null")
        .current_dir(project_folder)
        .output();

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                notify_missing_tool(outgoing, tool_reported, "elm");
            } else {
                tracing::warn!("failed to run elm make: {err}");
            }
            return;
        }
    };

    if output.status.success() {
        publish(outgoing, uri.clone(), Vec::new());
        return;
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    match serde_json::from_str::<Report>(&stderr) {
        Ok(report) => {
            let mut by_file = report_diagnostics(&report, project_folder);
            // Clear the saved file explicitly when the report does not
            // mention it, so stale diagnostics disappear.
            let saved_mentioned = by_file.keys().any(|file_uri| file_uri == uri.as_str());
            if !saved_mentioned {
                publish(outgoing, uri.clone(), Vec::new());
            }
            for (file_uri, diagnostics) in by_file.drain() {
                if let Ok(target) = Uri::from_str(&file_uri) {
                    publish(outgoing, target, diagnostics);
                }
            }
        }
        Err(_) => {
            // Failure without a JSON report: clear the saved URI only.
            publish(outgoing, uri.clone(), Vec::new());
        }
    }
}

fn publish(outgoing: &Sender<Message>, uri: Uri, diagnostics: Vec<Diagnostic>) {
    let params = PublishDiagnosticsParams {
        uri,
        diagnostics,
        version: None,
    };
    let _ = outgoing.send(Message::Notification(Notification::new(
        PublishDiagnostics::METHOD.to_string(),
        params,
    )));
}

fn notify_missing_tool(outgoing: &Sender<Message>, tool_reported: &Mutex<bool>, tool: &str) {
    let mut reported = tool_reported.lock().unwrap();
    if *reported {
        return;
    }
    *reported = true;
    let params = ShowMessageParams {
        typ: MessageType::WARNING,
        message: format!("`{tool}` was not found on PATH; diagnostics are disabled."),
    };
    let _ = outgoing.send(Message::Notification(Notification::new(
        ShowMessage::METHOD.to_string(),
        params,
    )));
}

// ---- compiler report decoding -----------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Report {
    #[serde(rename = "compile-errors")]
    CompileErrors { errors: Vec<FileErrors> },
    #[serde(rename = "error")]
    GeneralError {
        path: Option<String>,
        title: String,
        message: Vec<MessagePart>,
    },
}

#[derive(Debug, Deserialize)]
struct FileErrors {
    path: String,
    problems: Vec<Problem>,
}

#[derive(Debug, Deserialize)]
struct Problem {
    title: String,
    region: Region,
    message: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Region {
    start: ReportPosition,
    end: ReportPosition,
}

#[derive(Debug, Deserialize)]
struct ReportPosition {
    line: u32,
    column: u32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessagePart {
    Text(String),
    Styled { string: String },
}

impl MessagePart {
    fn as_str(&self) -> &str {
        match self {
            MessagePart::Text(text) => text,
            MessagePart::Styled { string } => string,
        }
    }
}

fn flatten_message(parts: &[MessagePart]) -> String {
    parts.iter().map(MessagePart::as_str).collect()
}

/// Report regions are 1-based; the wire wants 0-based.
fn region_to_range(region: &Region) -> lsp_types::Range {
    lsp_types::Range {
        start: lsp_types::Position {
            line: region.start.line.saturating_sub(1),
            character: region.start.column.saturating_sub(1),
        },
        end: lsp_types::Position {
            line: region.end.line.saturating_sub(1),
            character: region.end.column.saturating_sub(1),
        },
    }
}

fn report_diagnostics(report: &Report, project_folder: &Path) -> FxHashMap<String, Vec<Diagnostic>> {
    let mut by_file: FxHashMap<String, Vec<Diagnostic>> = FxHashMap::default();
    match report {
        Report::CompileErrors { errors } => {
            for file in errors {
                let uri = path_to_report_uri(&file.path, project_folder);
                let diagnostics = by_file.entry(uri).or_default();
                for problem in &file.problems {
                    diagnostics.push(Diagnostic {
                        range: region_to_range(&problem.region),
                        severity: Some(DiagnosticSeverity::ERROR),
                        source: Some("elm".to_string()),
                        message: format!("{}\n\n{}", problem.title, flatten_message(&problem.message)),
                        ..Default::default()
                    });
                }
            }
        }
        Report::GeneralError {
            path,
            title,
            message,
        } => {
            if let Some(path) = path {
                let uri = path_to_report_uri(path, project_folder);
                by_file.entry(uri).or_default().push(Diagnostic {
                    range: lsp_types::Range::default(),
                    severity: Some(DiagnosticSeverity::ERROR),
                    source: Some("elm".to_string()),
                    message: format!("{}\n\n{}", title, flatten_message(message)),
                    ..Default::default()
                });
            }
        }
    }
    by_file
}

/// Report paths may be relative to the project folder; normalize to an
/// absolute `file://` URI string.
fn path_to_report_uri(path: &str, project_folder: &Path) -> String {
    let path_buf = PathBuf::from(path);
    let absolute = if path_buf.is_absolute() {
        path_buf
    } else {
        project_folder.join(path_buf)
    };
    elmls_core::uri::path_to_uri(&absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_compile_errors_report() {
        let report = r#"{
            "type": "compile-errors",
            "errors": [
                {
                    "path": "/project/src/Main.elm",
                    "name": "Main",
                    "problems": [
                        {
                            "title": "NAMING ERROR",
                            "region": {
                                "start": { "line": 5, "column": 9 },
                                "end": { "line": 5, "column": 12 }
                            },
                            "message": ["I cannot find a `", { "string": "foo" }, "` variable:"]
                        }
                    ]
                }
            ]
        }"#;
        let report: Report = serde_json::from_str(report).unwrap();
        let by_file = report_diagnostics(&report, Path::new("/project"));
        let diagnostics = &by_file["file:///project/src/Main.elm"];
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 4);
        assert_eq!(diagnostics[0].range.start.character, 8);
        assert!(diagnostics[0].message.contains("NAMING ERROR"));
        assert!(diagnostics[0].message.contains("foo"));
    }

    #[test]
    fn decodes_a_general_error_report() {
        let report = r#"{
            "type": "error",
            "path": "elm.json",
            "title": "BAD JSON",
            "message": ["Something is off"]
        }"#;
        let report: Report = serde_json::from_str(report).unwrap();
        let by_file = report_diagnostics(&report, Path::new("/project"));
        assert!(by_file.contains_key("file:///project/elm.json"));
    }
}
