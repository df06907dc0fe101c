use super::declaration::FunctionDecl;
use super::pattern::Pattern;
use super::{Ident, Ranged};
use crate::span::Range;

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub range: Range,
}

impl Expression {
    pub fn new(kind: ExpressionKind, range: Range) -> Self {
        Expression { kind, range }
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Unit,
    Application(Vec<Expression>),
    OperatorApplication {
        operator: String,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// A value or constructor reference, possibly qualified:
    /// `foo`, `Just`, `List.map`.
    FunctionOrValue {
        module_parts: Vec<String>,
        name: String,
    },
    IfBlock {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    PrefixOperator(String),
    Operator(String),
    Integer(i64),
    Hex(i64),
    Floatable(f64),
    Negation(Box<Expression>),
    Literal(String),
    CharLiteral(char),
    Tupled(Vec<Expression>),
    Parenthesized(Box<Expression>),
    LetExpression {
        declarations: Vec<LetDeclaration>,
        expression: Box<Expression>,
    },
    CaseExpression {
        expression: Box<Expression>,
        cases: Vec<CaseBranch>,
    },
    Lambda {
        patterns: Vec<Pattern>,
        expression: Box<Expression>,
    },
    RecordExpr(Vec<Ranged<RecordSetter>>),
    ListExpr(Vec<Expression>),
    RecordAccess {
        expression: Box<Expression>,
        name: Ident,
    },
    /// `.field` used as a function
    RecordAccessFunction(String),
    RecordUpdate {
        name: Ident,
        setters: Vec<Ranged<RecordSetter>>,
    },
    GlslExpression(String),
}

#[derive(Debug, Clone)]
pub enum LetDeclaration {
    Function(FunctionDecl),
    Destructuring {
        pattern: Pattern,
        expression: Expression,
        range: Range,
    },
}

impl LetDeclaration {
    pub fn range(&self) -> Range {
        match self {
            LetDeclaration::Function(f) => f.range,
            LetDeclaration::Destructuring { range, .. } => *range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseBranch {
    pub pattern: Pattern,
    pub expression: Expression,
}

#[derive(Debug, Clone)]
pub struct RecordSetter {
    pub name: Ident,
    pub expression: Expression,
}
