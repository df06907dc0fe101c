//! Whole-document formatting through the external formatter's stdin mode.
//! The result is a single edit replacing the entire document.

use crossbeam_channel::Sender;
use lsp_server::{Message, Notification};
use lsp_types::notification::{Notification as NotificationTrait, ShowMessage};
use lsp_types::{MessageType, ShowMessageParams, TextEdit};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;

pub struct FormattingProvider {
    tool_reported: Mutex<bool>,
}

impl FormattingProvider {
    pub fn new() -> Self {
        FormattingProvider {
            tool_reported: Mutex::new(false),
        }
    }

    pub fn format_document(
        &self,
        text: &str,
        outgoing: Option<&Sender<Message>>,
    ) -> Option<Vec<TextEdit>> {
        let formatted = self.run_formatter(text, outgoing)?;
        if formatted == text {
            return Some(Vec::new());
        }
        Some(vec![TextEdit {
            range: full_document_range(text),
            new_text: formatted,
        }])
    }

    fn run_formatter(&self, text: &str, outgoing: Option<&Sender<Message>>) -> Option<String> {
        let spawned = Command::new("elm-format")
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    self.notify_missing_tool(outgoing);
                } else {
                    tracing::warn!("failed to run elm-format: {err}");
                }
                return None;
            }
        };

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(text.as_bytes()).ok()?;
        }
        let output = child.wait_with_output().ok()?;
        if !output.status.success() {
            // elm-format refuses code it cannot parse; leave the buffer be.
            return None;
        }
        String::from_utf8(output.stdout).ok()
    }

    fn notify_missing_tool(&self, outgoing: Option<&Sender<Message>>) {
        let mut reported = self.tool_reported.lock().unwrap();
        if *reported {
            return;
        }
        *reported = true;
        if let Some(outgoing) = outgoing {
            let params = ShowMessageParams {
                typ: MessageType::WARNING,
                message: "`elm-format` was not found on PATH; formatting is disabled.".to_string(),
            };
            let _ = outgoing.send(Message::Notification(Notification::new(
                ShowMessage::METHOD.to_string(),
                params,
            )));
        }
    }
}

impl Default for FormattingProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn full_document_range(text: &str) -> lsp_types::Range {
    let mut line = 0u32;
    let mut character = 0u32;
    for ch in text.chars() {
        if ch == '\n' {
            line += 1;
            character = 0;
        } else {
            character += 1;
        }
    }
    lsp_types::Range {
        start: lsp_types::Position::new(0, 0),
        end: lsp_types::Position::new(line, character),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_range_covers_trailing_newline() {
        let range = full_document_range("a\nbb\n");
        assert_eq!(range.start, lsp_types::Position::new(0, 0));
        assert_eq!(range.end, lsp_types::Position::new(2, 0));
    }

    #[test]
    fn full_range_covers_unterminated_last_line() {
        let range = full_document_range("a\nbb");
        assert_eq!(range.end, lsp_types::Position::new(1, 2));
    }
}
