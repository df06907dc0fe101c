pub mod ast;
pub mod docs;
pub mod error;
pub mod exposing;
pub mod imports;
pub mod lexer;
pub mod parser;
pub mod project;
pub mod span;
pub mod uri;

pub use ast::Module;
pub use error::ParseError;
pub use imports::{ImportTracker, PRELUDE_MODULES};
pub use parser::parse;
pub use span::{Position, Range};
