mod completion;
mod definition;
mod diagnostics;
mod formatting;
mod hover;
mod references;
mod rename;
mod symbols;

pub use completion::CompletionProvider;
pub use definition::DefinitionProvider;
pub use diagnostics::DiagnosticsProvider;
pub use formatting::FormattingProvider;
pub use hover::HoverProvider;
pub use references::ReferencesProvider;
pub use rename::RenameProvider;
pub use symbols::SymbolsProvider;
