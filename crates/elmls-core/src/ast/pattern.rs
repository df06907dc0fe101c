use super::{Ident, QualifiedNameRef, Ranged};
use crate::span::Range;

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub range: Range,
}

impl Pattern {
    pub fn new(kind: PatternKind, range: Range) -> Self {
        Pattern { kind, range }
    }
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    /// `_`
    Wildcard,
    Unit,
    Char(char),
    String(String),
    Int(i64),
    Hex(i64),
    Float(f64),
    /// A binding: `x`
    Var(String),
    /// A constructor pattern: `Just x`, `Types.SetName name`.
    /// `name` covers the dotted constructor reference only.
    Named {
        name: Ranged<QualifiedNameRef>,
        args: Vec<Pattern>,
    },
    Tuple(Vec<Pattern>),
    Record(Vec<Ident>),
    /// `hd :: tl`
    UnCons(Box<Pattern>, Box<Pattern>),
    List(Vec<Pattern>),
    /// `pattern as name`
    As(Box<Pattern>, Ident),
    Parenthesized(Box<Pattern>),
}

/// A name bound by a pattern, with the range of the binding site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binder {
    pub name: String,
    pub range: Range,
}

impl Pattern {
    /// Every name this pattern binds, in source order. Constructor names are
    /// not binders; `as` contributes the inner binders plus the alias.
    pub fn binders(&self) -> Vec<Binder> {
        let mut out = Vec::new();
        self.collect_binders(&mut out);
        out
    }

    fn collect_binders(&self, out: &mut Vec<Binder>) {
        match &self.kind {
            PatternKind::Var(name) => out.push(Binder {
                name: name.clone(),
                range: self.range,
            }),
            PatternKind::Named { args, .. } => {
                for arg in args {
                    arg.collect_binders(out);
                }
            }
            PatternKind::Tuple(items) | PatternKind::List(items) => {
                for item in items {
                    item.collect_binders(out);
                }
            }
            PatternKind::UnCons(hd, tl) => {
                hd.collect_binders(out);
                tl.collect_binders(out);
            }
            PatternKind::As(inner, alias) => {
                inner.collect_binders(out);
                out.push(Binder {
                    name: alias.node.clone(),
                    range: alias.range,
                });
            }
            PatternKind::Record(fields) => {
                for field in fields {
                    out.push(Binder {
                        name: field.node.clone(),
                        range: field.range,
                    });
                }
            }
            PatternKind::Parenthesized(inner) => inner.collect_binders(out),
            PatternKind::Wildcard
            | PatternKind::Unit
            | PatternKind::Char(_)
            | PatternKind::String(_)
            | PatternKind::Int(_)
            | PatternKind::Hex(_)
            | PatternKind::Float(_) => {}
        }
    }
}
