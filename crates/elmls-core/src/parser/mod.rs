//! Recursive-descent parser over the token stream. Layout is handled with
//! explicit column thresholds: top-level declarations sit at column 1, an
//! expression continues while its tokens stay right of the construct that
//! opened it, and `case` branches and `let` bindings align on the column of
//! the first one.

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::span::{Position, Range};

pub fn parse(source: &str) -> Result<Module, ParseError> {
    let output = tokenize(source)?;
    Parser::new(output.tokens, output.comments).run()
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    comments: Vec<Ranged<String>>,
    last_end: Position,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

fn operator_info(op: &str) -> (u8, Assoc) {
    match op {
        "<|" => (0, Assoc::Right),
        "|>" => (0, Assoc::Left),
        "||" => (2, Assoc::Right),
        "&&" => (3, Assoc::Right),
        "==" | "/=" | "<" | ">" | "<=" | ">=" => (4, Assoc::Left),
        "++" | "::" => (5, Assoc::Right),
        "+" | "-" => (6, Assoc::Left),
        "*" | "/" | "//" => (7, Assoc::Left),
        "^" => (8, Assoc::Right),
        "<<" => (9, Assoc::Left),
        ">>" => (9, Assoc::Right),
        _ => (9, Assoc::Left),
    }
}

impl Parser {
    fn new(tokens: Vec<Token>, comments: Vec<Ranged<String>>) -> Self {
        Parser {
            tokens,
            index: 0,
            comments,
            last_end: Position::new(1, 1),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or_else(|| ParseError::new("unexpected end of input", self.last_end))?;
        self.index += 1;
        self.last_end = token.range.end;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        let token = self.bump()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::new(format!("expected {what}"), token.start()))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let pos = self.peek().map(|t| t.start()).unwrap_or(self.last_end);
        ParseError::new(message, pos)
    }

    /// Whether the next token continues a construct whose base column is
    /// `indent`: anything strictly to the right of it belongs to the
    /// construct; a token at or left of the base column ends it.
    fn continues(&self, indent: u32) -> bool {
        self.peek().is_some_and(|t| t.start().column > indent)
    }

    /// Whether the next token starts exactly where the previous one ended,
    /// with nothing in between. Qualified names (`List.map`) and record
    /// access (`model.name`) require it.
    fn adjacent(&self) -> bool {
        self.peek().is_some_and(|t| t.start() == self.last_end)
    }

    fn run(mut self) -> Result<Module, ParseError> {
        let header = self.parse_module_header()?;
        let mut imports = Vec::new();
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::KwImport)) {
            imports.push(self.parse_import()?);
        }
        let mut declarations = Vec::new();
        while !self.at_end() {
            declarations.push(self.parse_declaration()?);
        }
        Ok(Module {
            header,
            imports,
            declarations,
            comments: std::mem::take(&mut self.comments),
        })
    }

    // ------------------------------------------------------------------
    // Module header and imports
    // ------------------------------------------------------------------

    fn parse_module_header(&mut self) -> Result<ModuleHeader, ParseError> {
        // A leading doc comment belongs to the module; keep it with the
        // other comments.
        if let Some(Token {
            kind: TokenKind::DocComment(_),
            ..
        }) = self.peek()
        {
            let token = self.bump()?;
            if let TokenKind::DocComment(text) = token.kind {
                self.comments.push(Ranged::new(text, token.range));
            }
        }

        let (kind, start) = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::LowerName(name)) if name == "port" => {
                let token = self.bump()?;
                (ModuleKind::Port, token.start())
            }
            Some(TokenKind::LowerName(name)) if name == "effect" => {
                let token = self.bump()?;
                (ModuleKind::Effect, token.start())
            }
            _ => {
                let pos = self.peek().map(|t| t.start()).unwrap_or(self.last_end);
                (ModuleKind::Normal, pos)
            }
        };

        self.expect(TokenKind::KwModule, "`module`")?;
        let name = self.parse_module_name()?;

        if kind == ModuleKind::Effect {
            self.skip_effect_where_clause()?;
        }

        self.expect(TokenKind::KwExposing, "`exposing`")?;
        let exposing = self.parse_exposing_list()?;
        let range = Range::new(start, exposing.range.end);

        // A doc comment between the header and the first import/declaration
        // documents the module.
        if let Some(Token {
            kind: TokenKind::DocComment(_),
            ..
        }) = self.peek()
        {
            let token = self.bump()?;
            if let TokenKind::DocComment(text) = token.kind {
                self.comments.push(Ranged::new(text, token.range));
            }
        }

        Ok(ModuleHeader {
            kind,
            name,
            exposing,
            range,
        })
    }

    fn skip_effect_where_clause(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if token.lower_name() == Some("where") => {
                self.bump()?;
                self.expect(TokenKind::LBrace, "`{`")?;
                let mut depth = 1usize;
                while depth > 0 {
                    match self.bump()?.kind {
                        TokenKind::LBrace => depth += 1,
                        TokenKind::RBrace => depth -= 1,
                        _ => {}
                    }
                }
                Ok(())
            }
            _ => Err(self.error_here("expected `where` in effect module header")),
        }
    }

    fn parse_module_name(&mut self) -> Result<Ident, ParseError> {
        let first = self.bump()?;
        let start = first.start();
        let mut end = first.range.end;
        let mut text = match first.kind {
            TokenKind::UpperName(name) => name,
            _ => return Err(ParseError::new("expected module name", start)),
        };
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dot)) && self.adjacent() {
            self.bump()?;
            if !self.adjacent() {
                return Err(self.error_here("expected module name segment after `.`"));
            }
            let segment = self.bump()?;
            match segment.kind {
                TokenKind::UpperName(name) => {
                    text.push('.');
                    text.push_str(&name);
                    end = segment.range.end;
                }
                _ => return Err(ParseError::new("expected module name segment", segment.start())),
            }
        }
        Ok(Ident::new(text, Range::new(start, end)))
    }

    fn parse_exposing_list(&mut self) -> Result<Ranged<Exposing>, ParseError> {
        let open = self.expect(TokenKind::LParen, "`(`")?;
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::DotDot)) {
            let dots = self.bump()?;
            let close = self.expect(TokenKind::RParen, "`)`")?;
            return Ok(Ranged::new(
                Exposing::All(dots.range),
                Range::new(open.start(), close.range.end),
            ));
        }

        let mut items = Vec::new();
        loop {
            items.push(self.parse_exposed_item()?);
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Comma) => {
                    self.bump()?;
                }
                Some(TokenKind::RParen) => break,
                _ => return Err(self.error_here("expected `,` or `)` in exposing list")),
            }
        }
        let close = self.expect(TokenKind::RParen, "`)`")?;
        Ok(Ranged::new(
            Exposing::Explicit(items),
            Range::new(open.start(), close.range.end),
        ))
    }

    fn parse_exposed_item(&mut self) -> Result<Ranged<ExposedItem>, ParseError> {
        let token = self.bump()?;
        let start = token.start();
        match token.kind {
            TokenKind::LowerName(name) => Ok(Ranged::new(
                ExposedItem::Function { name },
                token.range,
            )),
            TokenKind::UpperName(name) => {
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    let open = self.bump()?;
                    self.expect(TokenKind::DotDot, "`..`")?;
                    let close = self.expect(TokenKind::RParen, "`)`")?;
                    let open_range = Range::new(open.start(), close.range.end);
                    Ok(Ranged::new(
                        ExposedItem::TypeExpose {
                            name,
                            open_range: Some(open_range),
                        },
                        Range::new(start, close.range.end),
                    ))
                } else {
                    Ok(Ranged::new(
                        ExposedItem::TypeOrAlias { name },
                        token.range,
                    ))
                }
            }
            TokenKind::LParen => {
                let op = self.bump()?;
                let name = match op.kind {
                    TokenKind::Operator(name) => name,
                    TokenKind::Colon => ":".to_string(),
                    _ => return Err(ParseError::new("expected operator", op.start())),
                };
                let close = self.expect(TokenKind::RParen, "`)`")?;
                Ok(Ranged::new(
                    ExposedItem::Infix { name },
                    Range::new(start, close.range.end),
                ))
            }
            _ => Err(ParseError::new("expected exposing item", start)),
        }
    }

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        let kw = self.expect(TokenKind::KwImport, "`import`")?;
        let module_name = self.parse_module_name()?;
        let mut end = module_name.range.end;

        let alias = if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::KwAs)) {
            self.bump()?;
            let token = self.bump()?;
            match token.kind {
                TokenKind::UpperName(name) => {
                    end = token.range.end;
                    Some(Ident::new(name, token.range))
                }
                _ => return Err(ParseError::new("expected import alias", token.start())),
            }
        } else {
            None
        };

        let exposing = if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::KwExposing)) {
            self.bump()?;
            let list = self.parse_exposing_list()?;
            end = list.range.end;
            Some(list)
        } else {
            None
        };

        Ok(Import {
            module_name,
            alias,
            exposing,
            range: Range::new(kw.start(), end),
        })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
        let documentation = self.take_doc_comment()?;

        let token = self
            .peek()
            .ok_or_else(|| ParseError::new("expected declaration", self.last_end))?;
        if token.start().column != 1 {
            return Err(self.error_here("expected declaration to start at column 1"));
        }

        match &token.kind {
            TokenKind::KwType => self.parse_type_declaration(documentation),
            TokenKind::LowerName(name) if name == "port" && self.is_port_declaration() => {
                self.parse_port_declaration()
            }
            TokenKind::LowerName(name) if name == "infix" => self.parse_infix_declaration(),
            TokenKind::LowerName(_) => {
                let function = self.parse_function(1, documentation)?;
                Ok(Declaration::Function(function))
            }
            TokenKind::LParen | TokenKind::LBrace | TokenKind::Underscore => {
                let pattern = self.parse_pattern(1)?;
                self.expect(TokenKind::Eq, "`=`")?;
                let expression = self.parse_expression(1)?;
                let range = Range::new(pattern.range.start, expression.range.end);
                Ok(Declaration::Destructuring(DestructuringDecl {
                    pattern,
                    expression,
                    range,
                }))
            }
            _ => Err(self.error_here("expected declaration")),
        }
    }

    fn take_doc_comment(&mut self) -> Result<Option<Ranged<String>>, ParseError> {
        if let Some(Token {
            kind: TokenKind::DocComment(_),
            ..
        }) = self.peek()
        {
            let token = self.bump()?;
            if let TokenKind::DocComment(text) = token.kind {
                return Ok(Some(Ranged::new(text, token.range)));
            }
        }
        Ok(None)
    }

    fn is_port_declaration(&self) -> bool {
        matches!(
            (self.peek_at(1).map(|t| &t.kind), self.peek_at(2).map(|t| &t.kind)),
            (Some(TokenKind::LowerName(_)), Some(TokenKind::Colon))
        )
    }

    fn parse_port_declaration(&mut self) -> Result<Declaration, ParseError> {
        let kw = self.bump()?; // port
        let name = self.parse_lower_ident()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let type_annotation = self.parse_type(1)?;
        let range = Range::new(kw.start(), type_annotation.range.end);
        let signature_range = Range::new(name.range.start, type_annotation.range.end);
        Ok(Declaration::Port(PortDecl {
            signature: Signature {
                name,
                type_annotation,
                range: signature_range,
            },
            range,
        }))
    }

    fn parse_infix_declaration(&mut self) -> Result<Declaration, ParseError> {
        let kw = self.bump()?; // infix
        let direction = self.parse_lower_ident()?;
        let precedence = match self.bump()? {
            Token {
                kind: TokenKind::Int(value),
                ..
            } => value,
            token => return Err(ParseError::new("expected precedence", token.start())),
        };
        self.expect(TokenKind::LParen, "`(`")?;
        let op_token = self.bump()?;
        let operator = match op_token.kind {
            TokenKind::Operator(name) => Ident::new(name, op_token.range),
            _ => return Err(ParseError::new("expected operator", op_token.start())),
        };
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Eq, "`=`")?;
        let function = self.parse_lower_ident()?;
        let range = Range::new(kw.start(), function.range.end);
        Ok(Declaration::Infix(InfixDecl {
            direction: direction.node,
            precedence,
            operator,
            function,
            range,
        }))
    }

    fn parse_type_declaration(
        &mut self,
        documentation: Option<Ranged<String>>,
    ) -> Result<Declaration, ParseError> {
        let kw = self.expect(TokenKind::KwType, "`type`")?;

        let is_alias = self
            .peek()
            .is_some_and(|t| t.lower_name() == Some("alias"));
        if is_alias {
            self.bump()?;
            let name = self.parse_upper_ident()?;
            let generics = self.parse_generics()?;
            self.expect(TokenKind::Eq, "`=`")?;
            let type_annotation = self.parse_type(1)?;
            let range = Range::new(kw.start(), type_annotation.range.end);
            return Ok(Declaration::TypeAlias(TypeAliasDecl {
                documentation,
                name,
                generics,
                type_annotation,
                range,
            }));
        }

        let name = self.parse_upper_ident()?;
        let generics = self.parse_generics()?;
        self.expect(TokenKind::Eq, "`=`")?;
        let mut constructors = vec![self.parse_constructor()?];
        while self.continues(1) && matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Bar)) {
            self.bump()?;
            constructors.push(self.parse_constructor()?);
        }
        let end = constructors
            .last()
            .map(|c| c.range.end)
            .unwrap_or(name.range.end);
        Ok(Declaration::CustomType(CustomTypeDecl {
            documentation,
            name,
            generics,
            constructors,
            range: Range::new(kw.start(), end),
        }))
    }

    fn parse_generics(&mut self) -> Result<Vec<Ident>, ParseError> {
        let mut generics = Vec::new();
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LowerName(_))) {
            generics.push(self.parse_lower_ident()?);
        }
        Ok(generics)
    }

    fn parse_constructor(&mut self) -> Result<Constructor, ParseError> {
        let name = self.parse_upper_ident()?;
        let mut arguments = Vec::new();
        let mut end = name.range.end;
        while self.continues(1) && self.starts_type_atom() {
            let arg = self.parse_type_atom(1)?;
            end = arg.range.end;
            arguments.push(arg);
        }
        Ok(Constructor {
            range: Range::new(name.range.start, end),
            name,
            arguments,
        })
    }

    /// A function declaration: optional `name : Type` signature line, then
    /// `name args = body`. `indent` is the column the declaration starts at;
    /// everything in it must sit to the right of that column.
    fn parse_function(
        &mut self,
        indent: u32,
        documentation: Option<Ranged<String>>,
    ) -> Result<FunctionDecl, ParseError> {
        let first_name = self.parse_lower_ident()?;
        let start = first_name.range.start;

        let signature = if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Colon)) {
            self.bump()?;
            let type_annotation = self.parse_type(indent)?;
            let range = Range::new(first_name.range.start, type_annotation.range.end);
            Some(Signature {
                name: first_name.clone(),
                type_annotation,
                range,
            })
        } else {
            None
        };

        let name = if signature.is_some() {
            let impl_name = self.parse_lower_ident()?;
            if impl_name.node != first_name.node {
                return Err(ParseError::new(
                    format!(
                        "expected implementation of `{}` after its signature",
                        first_name.node
                    ),
                    impl_name.range.start,
                ));
            }
            impl_name
        } else {
            first_name
        };

        let mut arguments = Vec::new();
        while !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Eq)) {
            arguments.push(self.parse_simple_pattern(indent)?);
        }
        self.expect(TokenKind::Eq, "`=`")?;
        let body = self.parse_expression(indent)?;
        let range = Range::new(start, body.range.end);
        Ok(FunctionDecl {
            documentation,
            signature,
            name,
            arguments,
            body,
            range,
        })
    }

    fn parse_lower_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::LowerName(name) => Ok(Ident::new(name, token.range)),
            _ => Err(ParseError::new("expected a lowercase name", token.start())),
        }
    }

    fn parse_upper_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::UpperName(name) => Ok(Ident::new(name, token.range)),
            _ => Err(ParseError::new("expected an uppercase name", token.start())),
        }
    }

    /// A dotted reference as written at a use site: `foo`, `Just`,
    /// `Json.Decode.string`. Upper segments accumulate as the qualifier
    /// until a lower segment (value) or the final upper segment (type or
    /// constructor) is reached.
    fn parse_qualified_ref(&mut self) -> Result<Ranged<QualifiedNameRef>, ParseError> {
        let first = self.bump()?;
        let start = first.start();
        let mut end = first.range.end;
        match first.kind {
            TokenKind::LowerName(name) => Ok(Ranged::new(
                QualifiedNameRef {
                    module_parts: vec![],
                    name,
                },
                Range::new(start, end),
            )),
            TokenKind::UpperName(name) => {
                let mut segments = vec![name];
                while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dot))
                    && self.adjacent()
                {
                    self.bump()?;
                    if !self.adjacent() {
                        return Err(self.error_here("expected name after `.`"));
                    }
                    let token = self.bump()?;
                    match token.kind {
                        TokenKind::UpperName(seg) => {
                            end = token.range.end;
                            segments.push(seg);
                        }
                        TokenKind::LowerName(seg) => {
                            end = token.range.end;
                            return Ok(Ranged::new(
                                QualifiedNameRef {
                                    module_parts: segments,
                                    name: seg,
                                },
                                Range::new(start, end),
                            ));
                        }
                        _ => {
                            return Err(ParseError::new("expected name after `.`", token.start()))
                        }
                    }
                }
                let name = segments.pop().unwrap();
                Ok(Ranged::new(
                    QualifiedNameRef {
                        module_parts: segments,
                        name,
                    },
                    Range::new(start, end),
                ))
            }
            _ => Err(ParseError::new("expected a name", start)),
        }
    }

    // ------------------------------------------------------------------
    // Type annotations
    // ------------------------------------------------------------------

    fn parse_type(&mut self, indent: u32) -> Result<TypeAnnotation, ParseError> {
        let left = self.parse_type_application(indent)?;
        if self.continues(indent) && matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Arrow))
        {
            self.bump()?;
            let right = self.parse_type(indent)?;
            let range = Range::new(left.range.start, right.range.end);
            return Ok(TypeAnnotation::new(
                TypeAnnotationKind::FunctionType(Box::new(left), Box::new(right)),
                range,
            ));
        }
        Ok(left)
    }

    fn parse_type_application(&mut self, indent: u32) -> Result<TypeAnnotation, ParseError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::UpperName(_))) {
            let name = self.parse_qualified_ref()?;
            let mut args = Vec::new();
            let mut end = name.range.end;
            while self.continues(indent) && self.starts_type_atom() {
                let arg = self.parse_type_atom(indent)?;
                end = arg.range.end;
                args.push(arg);
            }
            let range = Range::new(name.range.start, end);
            return Ok(TypeAnnotation::new(
                TypeAnnotationKind::Typed { name, args },
                range,
            ));
        }
        self.parse_type_atom(indent)
    }

    fn starts_type_atom(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            Some(
                TokenKind::UpperName(_)
                    | TokenKind::LowerName(_)
                    | TokenKind::LParen
                    | TokenKind::LBrace
            )
        )
    }

    fn parse_type_atom(&mut self, indent: u32) -> Result<TypeAnnotation, ParseError> {
        let token = self
            .peek()
            .ok_or_else(|| ParseError::new("expected type", self.last_end))?;
        match &token.kind {
            TokenKind::LowerName(_) => {
                let ident = self.parse_lower_ident()?;
                Ok(TypeAnnotation::new(
                    TypeAnnotationKind::GenericType(ident.node),
                    ident.range,
                ))
            }
            TokenKind::UpperName(_) => {
                let name = self.parse_qualified_ref()?;
                let range = name.range;
                Ok(TypeAnnotation::new(
                    TypeAnnotationKind::Typed { name, args: vec![] },
                    range,
                ))
            }
            TokenKind::LParen => {
                let open = self.bump()?;
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
                    let close = self.bump()?;
                    return Ok(TypeAnnotation::new(
                        TypeAnnotationKind::Unit,
                        Range::new(open.start(), close.range.end),
                    ));
                }
                let mut items = vec![self.parse_type(indent)?];
                while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                    self.bump()?;
                    items.push(self.parse_type(indent)?);
                }
                let close = self.expect(TokenKind::RParen, "`)`")?;
                let range = Range::new(open.start(), close.range.end);
                if items.len() == 1 {
                    let inner = items.pop().unwrap();
                    Ok(TypeAnnotation::new(inner.kind, range))
                } else {
                    Ok(TypeAnnotation::new(TypeAnnotationKind::Tupled(items), range))
                }
            }
            TokenKind::LBrace => {
                let open = self.bump()?;
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RBrace)) {
                    let close = self.bump()?;
                    return Ok(TypeAnnotation::new(
                        TypeAnnotationKind::Record(vec![]),
                        Range::new(open.start(), close.range.end),
                    ));
                }
                // `{ r | f : T }` extends a record variable; a plain record
                // starts straight into `field :`.
                let is_generic = matches!(
                    (self.peek().map(|t| &t.kind), self.peek_at(1).map(|t| &t.kind)),
                    (Some(TokenKind::LowerName(_)), Some(TokenKind::Bar))
                );
                if is_generic {
                    let base = self.parse_lower_ident()?;
                    self.expect(TokenKind::Bar, "`|`")?;
                    let fields = self.parse_record_fields(indent)?;
                    let close = self.expect(TokenKind::RBrace, "`}`")?;
                    return Ok(TypeAnnotation::new(
                        TypeAnnotationKind::GenericRecord { base, fields },
                        Range::new(open.start(), close.range.end),
                    ));
                }
                let fields = self.parse_record_fields(indent)?;
                let close = self.expect(TokenKind::RBrace, "`}`")?;
                Ok(TypeAnnotation::new(
                    TypeAnnotationKind::Record(fields),
                    Range::new(open.start(), close.range.end),
                ))
            }
            _ => Err(self.error_here("expected type")),
        }
    }

    fn parse_record_fields(&mut self, indent: u32) -> Result<Vec<RecordField>, ParseError> {
        let mut fields = Vec::new();
        loop {
            let name = self.parse_lower_ident()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let type_annotation = self.parse_type(indent)?;
            fields.push(RecordField {
                name,
                type_annotation,
            });
            if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                self.bump()?;
            } else {
                break;
            }
        }
        Ok(fields)
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    /// Full pattern grammar: constructor applications, `::` chains, and
    /// `as` aliases. Used in case branches and inside parens.
    fn parse_pattern(&mut self, indent: u32) -> Result<Pattern, ParseError> {
        let pattern = self.parse_uncons_pattern(indent)?;
        if self.continues(indent) && matches!(self.peek().map(|t| &t.kind), Some(TokenKind::KwAs))
        {
            self.bump()?;
            let alias = self.parse_lower_ident()?;
            let range = Range::new(pattern.range.start, alias.range.end);
            return Ok(Pattern::new(
                PatternKind::As(Box::new(pattern), alias),
                range,
            ));
        }
        Ok(pattern)
    }

    fn parse_uncons_pattern(&mut self, indent: u32) -> Result<Pattern, ParseError> {
        let head = self.parse_app_pattern(indent)?;
        if self.continues(indent)
            && matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Operator(op)) if op == "::")
        {
            self.bump()?;
            let tail = self.parse_uncons_pattern(indent)?;
            let range = Range::new(head.range.start, tail.range.end);
            return Ok(Pattern::new(
                PatternKind::UnCons(Box::new(head), Box::new(tail)),
                range,
            ));
        }
        Ok(head)
    }

    fn parse_app_pattern(&mut self, indent: u32) -> Result<Pattern, ParseError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::UpperName(_))) {
            let name = self.parse_qualified_ref()?;
            let mut args = Vec::new();
            let mut end = name.range.end;
            while self.continues(indent) && self.starts_simple_pattern() {
                let arg = self.parse_simple_pattern(indent)?;
                end = arg.range.end;
                args.push(arg);
            }
            let range = Range::new(name.range.start, end);
            return Ok(Pattern::new(PatternKind::Named { name, args }, range));
        }
        self.parse_simple_pattern(indent)
    }

    fn starts_simple_pattern(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            Some(
                TokenKind::LowerName(_)
                    | TokenKind::UpperName(_)
                    | TokenKind::Underscore
                    | TokenKind::LParen
                    | TokenKind::LBrace
                    | TokenKind::LBracket
                    | TokenKind::Int(_)
                    | TokenKind::Hex(_)
                    | TokenKind::Float(_)
                    | TokenKind::Str(_)
                    | TokenKind::Char(_)
            )
        )
    }

    /// Argument-position pattern: no bare constructor applications and no
    /// `::`/`as` — those need parens.
    fn parse_simple_pattern(&mut self, indent: u32) -> Result<Pattern, ParseError> {
        let token = self
            .peek()
            .ok_or_else(|| ParseError::new("expected pattern", self.last_end))?;
        match &token.kind {
            TokenKind::Underscore => {
                let token = self.bump()?;
                Ok(Pattern::new(PatternKind::Wildcard, token.range))
            }
            TokenKind::LowerName(_) => {
                let ident = self.parse_lower_ident()?;
                Ok(Pattern::new(PatternKind::Var(ident.node), ident.range))
            }
            TokenKind::UpperName(_) => {
                let name = self.parse_qualified_ref()?;
                let range = name.range;
                Ok(Pattern::new(
                    PatternKind::Named { name, args: vec![] },
                    range,
                ))
            }
            TokenKind::Int(value) => {
                let value = *value;
                let token = self.bump()?;
                Ok(Pattern::new(PatternKind::Int(value), token.range))
            }
            TokenKind::Hex(value) => {
                let value = *value;
                let token = self.bump()?;
                Ok(Pattern::new(PatternKind::Hex(value), token.range))
            }
            TokenKind::Float(value) => {
                let value = *value;
                let token = self.bump()?;
                Ok(Pattern::new(PatternKind::Float(value), token.range))
            }
            TokenKind::Str(_) => {
                let token = self.bump()?;
                match token.kind {
                    TokenKind::Str(text) => {
                        Ok(Pattern::new(PatternKind::String(text), token.range))
                    }
                    _ => unreachable!(),
                }
            }
            TokenKind::Char(value) => {
                let value = *value;
                let token = self.bump()?;
                Ok(Pattern::new(PatternKind::Char(value), token.range))
            }
            TokenKind::LParen => {
                let open = self.bump()?;
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
                    let close = self.bump()?;
                    return Ok(Pattern::new(
                        PatternKind::Unit,
                        Range::new(open.start(), close.range.end),
                    ));
                }
                let mut items = vec![self.parse_pattern(indent)?];
                while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                    self.bump()?;
                    items.push(self.parse_pattern(indent)?);
                }
                let close = self.expect(TokenKind::RParen, "`)`")?;
                let range = Range::new(open.start(), close.range.end);
                if items.len() == 1 {
                    Ok(Pattern::new(
                        PatternKind::Parenthesized(Box::new(items.pop().unwrap())),
                        range,
                    ))
                } else {
                    Ok(Pattern::new(PatternKind::Tuple(items), range))
                }
            }
            TokenKind::LBrace => {
                let open = self.bump()?;
                let mut fields = Vec::new();
                if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RBrace)) {
                    loop {
                        fields.push(self.parse_lower_ident()?);
                        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                            self.bump()?;
                        } else {
                            break;
                        }
                    }
                }
                let close = self.expect(TokenKind::RBrace, "`}`")?;
                Ok(Pattern::new(
                    PatternKind::Record(fields),
                    Range::new(open.start(), close.range.end),
                ))
            }
            TokenKind::LBracket => {
                let open = self.bump()?;
                let mut items = Vec::new();
                if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RBracket)) {
                    loop {
                        items.push(self.parse_pattern(indent)?);
                        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                            self.bump()?;
                        } else {
                            break;
                        }
                    }
                }
                let close = self.expect(TokenKind::RBracket, "`]`")?;
                Ok(Pattern::new(
                    PatternKind::List(items),
                    Range::new(open.start(), close.range.end),
                ))
            }
            _ => Err(self.error_here("expected pattern")),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self, indent: u32) -> Result<Expression, ParseError> {
        self.parse_binary(indent, 0)
    }

    fn parse_binary(&mut self, indent: u32, min_prec: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_application(indent)?;
        loop {
            if !self.continues(indent) {
                break;
            }
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Operator(op)) => op.clone(),
                _ => break,
            };
            let (prec, assoc) = operator_info(&op);
            if prec < min_prec {
                break;
            }
            self.bump()?;
            let next_min = match assoc {
                Assoc::Right => prec,
                Assoc::Left => prec + 1,
            };
            let right = self.parse_binary(indent, next_min)?;
            let range = Range::new(left.range.start, right.range.end);
            left = Expression::new(
                ExpressionKind::OperatorApplication {
                    operator: op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                range,
            );
        }
        Ok(left)
    }

    fn parse_application(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let first = self.parse_atom(indent)?;
        let mut items = vec![first];
        while self.continues(indent) && self.starts_atom() {
            items.push(self.parse_atom(indent)?);
        }
        if items.len() == 1 {
            Ok(items.pop().unwrap())
        } else {
            let range = Range::new(
                items.first().unwrap().range.start,
                items.last().unwrap().range.end,
            );
            Ok(Expression::new(ExpressionKind::Application(items), range))
        }
    }

    fn starts_atom(&self) -> bool {
        match self.peek().map(|t| &t.kind) {
            Some(
                TokenKind::LowerName(_)
                | TokenKind::UpperName(_)
                | TokenKind::Int(_)
                | TokenKind::Hex(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::Glsl(_)
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Backslash
                | TokenKind::KwIf
                | TokenKind::KwCase
                | TokenKind::KwLet,
            ) => true,
            // `.field` as a function value
            Some(TokenKind::Dot) => true,
            _ => false,
        }
    }

    fn parse_atom(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let expr = self.parse_atom_inner(indent)?;
        self.parse_record_access(expr)
    }

    /// Postfix `.field` chains, which bind tighter than application and
    /// require the dot to touch the expression.
    fn parse_record_access(&mut self, mut expr: Expression) -> Result<Expression, ParseError> {
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dot)) && self.adjacent() {
            self.bump()?;
            if !self.adjacent() {
                return Err(self.error_here("expected field name after `.`"));
            }
            let name = self.parse_lower_ident()?;
            let range = Range::new(expr.range.start, name.range.end);
            expr = Expression::new(
                ExpressionKind::RecordAccess {
                    expression: Box::new(expr),
                    name,
                },
                range,
            );
        }
        Ok(expr)
    }

    fn parse_atom_inner(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let token = self
            .peek()
            .ok_or_else(|| ParseError::new("expected expression", self.last_end))?
            .clone();
        match token.kind {
            TokenKind::LowerName(_) | TokenKind::UpperName(_) => {
                let name = self.parse_qualified_ref()?;
                Ok(Expression::new(
                    ExpressionKind::FunctionOrValue {
                        module_parts: name.node.module_parts,
                        name: name.node.name,
                    },
                    name.range,
                ))
            }
            TokenKind::Int(value) => {
                self.bump()?;
                Ok(Expression::new(ExpressionKind::Integer(value), token.range))
            }
            TokenKind::Hex(value) => {
                self.bump()?;
                Ok(Expression::new(ExpressionKind::Hex(value), token.range))
            }
            TokenKind::Float(value) => {
                self.bump()?;
                Ok(Expression::new(
                    ExpressionKind::Floatable(value),
                    token.range,
                ))
            }
            TokenKind::Str(text) => {
                self.bump()?;
                Ok(Expression::new(ExpressionKind::Literal(text), token.range))
            }
            TokenKind::Char(value) => {
                self.bump()?;
                Ok(Expression::new(
                    ExpressionKind::CharLiteral(value),
                    token.range,
                ))
            }
            TokenKind::Glsl(body) => {
                self.bump()?;
                Ok(Expression::new(
                    ExpressionKind::GlslExpression(body),
                    token.range,
                ))
            }
            TokenKind::Dot => {
                let dot = self.bump()?;
                if !self.adjacent() {
                    return Err(self.error_here("expected field name after `.`"));
                }
                let name = self.parse_lower_ident()?;
                let range = Range::new(dot.start(), name.range.end);
                Ok(Expression::new(
                    ExpressionKind::RecordAccessFunction(name.node),
                    range,
                ))
            }
            TokenKind::Backslash => self.parse_lambda(indent),
            TokenKind::KwIf => self.parse_if(indent),
            TokenKind::KwCase => self.parse_case(indent),
            TokenKind::KwLet => self.parse_let(indent),
            TokenKind::LParen => self.parse_paren_expression(indent),
            TokenKind::LBracket => self.parse_list(indent),
            TokenKind::LBrace => self.parse_record(indent),
            TokenKind::Operator(ref op) if op == "-" => {
                let minus = self.bump()?;
                if !self.adjacent() {
                    return Err(self.error_here("expected expression after unary `-`"));
                }
                let operand = self.parse_atom(indent)?;
                let range = Range::new(minus.start(), operand.range.end);
                Ok(Expression::new(
                    ExpressionKind::Negation(Box::new(operand)),
                    range,
                ))
            }
            _ => Err(self.error_here("expected expression")),
        }
    }

    fn parse_lambda(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let backslash = self.expect(TokenKind::Backslash, "`\\`")?;
        let mut patterns = Vec::new();
        while !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Arrow)) {
            patterns.push(self.parse_simple_pattern(indent)?);
        }
        self.expect(TokenKind::Arrow, "`->`")?;
        let expression = self.parse_expression(indent)?;
        let range = Range::new(backslash.start(), expression.range.end);
        Ok(Expression::new(
            ExpressionKind::Lambda {
                patterns,
                expression: Box::new(expression),
            },
            range,
        ))
    }

    fn parse_if(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let kw = self.expect(TokenKind::KwIf, "`if`")?;
        let condition = self.parse_expression(indent)?;
        self.expect(TokenKind::KwThen, "`then`")?;
        let then_branch = self.parse_expression(indent)?;
        self.expect(TokenKind::KwElse, "`else`")?;
        let else_branch = self.parse_expression(indent)?;
        let range = Range::new(kw.start(), else_branch.range.end);
        Ok(Expression::new(
            ExpressionKind::IfBlock {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            range,
        ))
    }

    fn parse_case(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let kw = self.expect(TokenKind::KwCase, "`case`")?;
        let scrutinee = self.parse_expression(indent)?;
        self.expect(TokenKind::KwOf, "`of`")?;

        // The first branch fixes the column every other branch must start at.
        let branch_col = self
            .peek()
            .ok_or_else(|| ParseError::new("expected case branch", self.last_end))?
            .start()
            .column;
        if branch_col <= indent {
            return Err(self.error_here("case branch must be indented"));
        }

        let mut cases = Vec::new();
        loop {
            let pattern = self.parse_pattern(branch_col)?;
            self.expect(TokenKind::Arrow, "`->`")?;
            let expression = self.parse_expression(branch_col)?;
            cases.push(CaseBranch {
                pattern,
                expression,
            });
            match self.peek() {
                Some(token) if token.start().column == branch_col => continue,
                _ => break,
            }
        }
        let end = cases
            .last()
            .map(|c| c.expression.range.end)
            .unwrap_or(self.last_end);
        Ok(Expression::new(
            ExpressionKind::CaseExpression {
                expression: Box::new(scrutinee),
                cases,
            },
            Range::new(kw.start(), end),
        ))
    }

    fn parse_let(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let kw = self.expect(TokenKind::KwLet, "`let`")?;
        let decl_col = self
            .peek()
            .ok_or_else(|| ParseError::new("expected let binding", self.last_end))?
            .start()
            .column;
        if decl_col <= indent {
            return Err(self.error_here("let binding must be indented"));
        }

        let mut declarations = Vec::new();
        loop {
            declarations.push(self.parse_let_declaration(decl_col)?);
            match self.peek() {
                Some(token) if token.kind == TokenKind::KwIn => break,
                Some(token) if token.start().column == decl_col => continue,
                _ => break,
            }
        }
        self.expect(TokenKind::KwIn, "`in`")?;
        let body = self.parse_expression(indent)?;
        let range = Range::new(kw.start(), body.range.end);
        Ok(Expression::new(
            ExpressionKind::LetExpression {
                declarations,
                expression: Box::new(body),
            },
            range,
        ))
    }

    fn parse_let_declaration(&mut self, indent: u32) -> Result<LetDeclaration, ParseError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::LowerName(_)) => {
                let function = self.parse_function(indent, None)?;
                Ok(LetDeclaration::Function(function))
            }
            _ => {
                let pattern = self.parse_pattern(indent)?;
                self.expect(TokenKind::Eq, "`=`")?;
                let expression = self.parse_expression(indent)?;
                let range = Range::new(pattern.range.start, expression.range.end);
                Ok(LetDeclaration::Destructuring {
                    pattern,
                    expression,
                    range,
                })
            }
        }
    }

    fn parse_paren_expression(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let open = self.expect(TokenKind::LParen, "`(`")?;
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::RParen) => {
                let close = self.bump()?;
                Ok(Expression::new(
                    ExpressionKind::Unit,
                    Range::new(open.start(), close.range.end),
                ))
            }
            Some(TokenKind::Operator(op)) => {
                // `(+)`, `(::)` — an operator as a value.
                let op = op.clone();
                self.bump()?;
                let close = self.expect(TokenKind::RParen, "`)`")?;
                Ok(Expression::new(
                    ExpressionKind::PrefixOperator(op),
                    Range::new(open.start(), close.range.end),
                ))
            }
            _ => {
                let mut items = vec![self.parse_expression(indent)?];
                while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                    self.bump()?;
                    items.push(self.parse_expression(indent)?);
                }
                let close = self.expect(TokenKind::RParen, "`)`")?;
                let range = Range::new(open.start(), close.range.end);
                if items.len() == 1 {
                    Ok(Expression::new(
                        ExpressionKind::Parenthesized(Box::new(items.pop().unwrap())),
                        range,
                    ))
                } else {
                    Ok(Expression::new(ExpressionKind::Tupled(items), range))
                }
            }
        }
    }

    fn parse_list(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let open = self.expect(TokenKind::LBracket, "`[`")?;
        let mut items = Vec::new();
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RBracket)) {
            loop {
                items.push(self.parse_expression(indent)?);
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                    self.bump()?;
                } else {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RBracket, "`]`")?;
        Ok(Expression::new(
            ExpressionKind::ListExpr(items),
            Range::new(open.start(), close.range.end),
        ))
    }

    fn parse_record(&mut self, indent: u32) -> Result<Expression, ParseError> {
        let open = self.expect(TokenKind::LBrace, "`{`")?;
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RBrace)) {
            let close = self.bump()?;
            return Ok(Expression::new(
                ExpressionKind::RecordExpr(vec![]),
                Range::new(open.start(), close.range.end),
            ));
        }

        let is_update = matches!(
            (self.peek().map(|t| &t.kind), self.peek_at(1).map(|t| &t.kind)),
            (Some(TokenKind::LowerName(_)), Some(TokenKind::Bar))
        );
        if is_update {
            let name = self.parse_lower_ident()?;
            self.expect(TokenKind::Bar, "`|`")?;
            let setters = self.parse_record_setters(indent)?;
            let close = self.expect(TokenKind::RBrace, "`}`")?;
            return Ok(Expression::new(
                ExpressionKind::RecordUpdate { name, setters },
                Range::new(open.start(), close.range.end),
            ));
        }

        let setters = self.parse_record_setters(indent)?;
        let close = self.expect(TokenKind::RBrace, "`}`")?;
        Ok(Expression::new(
            ExpressionKind::RecordExpr(setters),
            Range::new(open.start(), close.range.end),
        ))
    }

    fn parse_record_setters(
        &mut self,
        indent: u32,
    ) -> Result<Vec<Ranged<RecordSetter>>, ParseError> {
        let mut setters = Vec::new();
        loop {
            let name = self.parse_lower_ident()?;
            self.expect(TokenKind::Eq, "`=`")?;
            let expression = self.parse_expression(indent)?;
            let range = Range::new(name.range.start, expression.range.end);
            setters.push(Ranged::new(RecordSetter { name, expression }, range));
            if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                self.bump()?;
            } else {
                break;
            }
        }
        Ok(setters)
    }
}
