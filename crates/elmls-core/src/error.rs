use crate::span::Position;
use thiserror::Error;

/// Failure while scanning or parsing a source file. Carries the position the
/// parser gave up at; callers treat any parse failure as "no AST".
#[derive(Debug, Clone, Error)]
#[error("{message} at {}:{}", position.line, position.column)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}
