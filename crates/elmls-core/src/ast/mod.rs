pub mod declaration;
pub mod expression;
pub mod pattern;

use crate::span::Range;

pub use declaration::{
    Constructor, CustomTypeDecl, Declaration, DestructuringDecl, FunctionDecl, InfixDecl, PortDecl,
    RecordField, Signature, TypeAliasDecl, TypeAnnotation, TypeAnnotationKind,
};
pub use expression::{CaseBranch, Expression, ExpressionKind, LetDeclaration, RecordSetter};
pub use pattern::{Pattern, PatternKind};

/// Wrapper for AST nodes with range information
#[derive(Debug, Clone)]
pub struct Ranged<T> {
    pub node: T,
    pub range: Range,
}

impl<T> Ranged<T> {
    pub fn new(node: T, range: Range) -> Self {
        Ranged { node, range }
    }
}

/// Identifier
pub type Ident = Ranged<String>;

/// A possibly-qualified reference to a name, as written at a use site:
/// `moduleParts` is empty for `foo` and `["Json", "Decode"]` for
/// `Json.Decode.foo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedNameRef {
    pub module_parts: Vec<String>,
    pub name: String,
}

impl QualifiedNameRef {
    pub fn qualifier(&self) -> Option<String> {
        if self.module_parts.is_empty() {
            None
        } else {
            Some(self.module_parts.join("."))
        }
    }

    /// Length of the `Module.` prefix in characters, zero when unqualified.
    pub fn qualifier_len(&self) -> usize {
        if self.module_parts.is_empty() {
            0
        } else {
            self.module_parts.iter().map(|p| p.len() + 1).sum()
        }
    }
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct Module {
    pub header: ModuleHeader,
    pub imports: Vec<Import>,
    pub declarations: Vec<Declaration>,
    pub comments: Vec<Ranged<String>>,
}

impl Module {
    /// The dotted module name from the header.
    pub fn name(&self) -> &str {
        &self.header.name.node
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Normal,
    Port,
    Effect,
}

#[derive(Debug, Clone)]
pub struct ModuleHeader {
    pub kind: ModuleKind,
    pub name: Ident,
    pub exposing: Ranged<Exposing>,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub enum Exposing {
    /// `exposing (..)`
    All(Range),
    /// `exposing (a, B, C(..))`
    Explicit(Vec<Ranged<ExposedItem>>),
}

#[derive(Debug, Clone)]
pub enum ExposedItem {
    /// A lowercase value: `exposing (add)`
    Function { name: String },
    /// An uppercase name without constructors: `exposing (Model)`
    TypeOrAlias { name: String },
    /// An uppercase name with an open constructor list: `exposing (Msg(..))`.
    /// `open_range` covers the `(..)` suffix when present.
    TypeExpose { name: String, open_range: Option<Range> },
    /// An operator in parens: `exposing ((</>))`
    Infix { name: String },
}

impl ExposedItem {
    pub fn name(&self) -> &str {
        match self {
            ExposedItem::Function { name } => name,
            ExposedItem::TypeOrAlias { name } => name,
            ExposedItem::TypeExpose { name, .. } => name,
            ExposedItem::Infix { name } => name,
        }
    }

    /// Whether this item names a type rather than a value.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            ExposedItem::TypeOrAlias { .. } | ExposedItem::TypeExpose { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Import {
    pub module_name: Ident,
    pub alias: Option<Ident>,
    pub exposing: Option<Ranged<Exposing>>,
    pub range: Range,
}
