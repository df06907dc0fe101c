use super::expression::Expression;
use super::pattern::Pattern;
use super::{Ident, QualifiedNameRef, Ranged};
use crate::span::Range;

/// Top-level declaration
#[derive(Debug, Clone)]
pub enum Declaration {
    Function(FunctionDecl),
    TypeAlias(TypeAliasDecl),
    CustomType(CustomTypeDecl),
    Port(PortDecl),
    Destructuring(DestructuringDecl),
    Infix(InfixDecl),
}

impl Declaration {
    pub fn range(&self) -> Range {
        match self {
            Declaration::Function(d) => d.range,
            Declaration::TypeAlias(d) => d.range,
            Declaration::CustomType(d) => d.range,
            Declaration::Port(d) => d.range,
            Declaration::Destructuring(d) => d.range,
            Declaration::Infix(d) => d.range,
        }
    }

    /// The declared name, where one exists (destructurings are anonymous).
    pub fn name(&self) -> Option<&Ident> {
        match self {
            Declaration::Function(d) => Some(&d.name),
            Declaration::TypeAlias(d) => Some(&d.name),
            Declaration::CustomType(d) => Some(&d.name),
            Declaration::Port(d) => Some(&d.signature.name),
            Declaration::Destructuring(_) => None,
            Declaration::Infix(d) => Some(&d.operator),
        }
    }

    pub fn is_type_decl(&self) -> bool {
        matches!(
            self,
            Declaration::TypeAlias(_) | Declaration::CustomType(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub documentation: Option<Ranged<String>>,
    pub signature: Option<Signature>,
    pub name: Ident,
    pub arguments: Vec<Pattern>,
    pub body: Expression,
    pub range: Range,
}

/// `name : Type` line preceding a function, or the body of a port.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: Ident,
    pub type_annotation: TypeAnnotation,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub documentation: Option<Ranged<String>>,
    pub name: Ident,
    pub generics: Vec<Ident>,
    pub type_annotation: TypeAnnotation,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct CustomTypeDecl {
    pub documentation: Option<Ranged<String>>,
    pub name: Ident,
    pub generics: Vec<Ident>,
    pub constructors: Vec<Constructor>,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct Constructor {
    pub name: Ident,
    pub arguments: Vec<TypeAnnotation>,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct PortDecl {
    pub signature: Signature,
    pub range: Range,
}

/// `( a, b ) = expr` at the top level — binds names without declaring one.
#[derive(Debug, Clone)]
pub struct DestructuringDecl {
    pub pattern: Pattern,
    pub expression: Expression,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct InfixDecl {
    pub direction: String,
    pub precedence: i64,
    pub operator: Ident,
    pub function: Ident,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct TypeAnnotation {
    pub kind: TypeAnnotationKind,
    pub range: Range,
}

impl TypeAnnotation {
    pub fn new(kind: TypeAnnotationKind, range: Range) -> Self {
        TypeAnnotation { kind, range }
    }
}

#[derive(Debug, Clone)]
pub enum TypeAnnotationKind {
    /// A lowercase type variable: `msg`
    GenericType(String),
    /// A named type with arguments: `Maybe a`, `Json.Decode.Decoder a`.
    /// The outer `Ranged` covers the dotted name only, not the arguments.
    Typed {
        name: Ranged<QualifiedNameRef>,
        args: Vec<TypeAnnotation>,
    },
    /// `()`
    Unit,
    /// `( a, b )`
    Tupled(Vec<TypeAnnotation>),
    /// `{ f : T, g : U }`
    Record(Vec<RecordField>),
    /// `{ r | f : T }`
    GenericRecord {
        base: Ident,
        fields: Vec<RecordField>,
    },
    /// `L -> R`
    FunctionType(Box<TypeAnnotation>, Box<TypeAnnotation>),
}

#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: Ident,
    pub type_annotation: TypeAnnotation,
}
