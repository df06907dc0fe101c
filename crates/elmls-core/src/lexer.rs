//! Hand-written scanner producing ranged tokens. Columns and lines are
//! 1-based; a token's end position is the boundary just past its last
//! character, so adjacency checks (`Foo.bar`) compare `end == start`.

use crate::error::ParseError;
use crate::span::{Position, Range};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LowerName(String),
    UpperName(String),
    Int(i64),
    Hex(i64),
    Float(f64),
    Str(String),
    Char(char),
    Glsl(String),
    Operator(String),
    DocComment(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Eq,
    Arrow,
    Colon,
    Bar,
    Backslash,
    Dot,
    DotDot,
    Underscore,
    KwModule,
    KwExposing,
    KwAs,
    KwImport,
    KwType,
    KwIf,
    KwThen,
    KwElse,
    KwCase,
    KwOf,
    KwLet,
    KwIn,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range,
}

impl Token {
    pub fn start(&self) -> Position {
        self.range.start
    }

    /// Lowercase identifier text, for contextual keywords (`alias`, `port`,
    /// `effect`, `where`, `infix` are plain names outside their position).
    pub fn lower_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::LowerName(name) => Some(name),
            _ => None,
        }
    }
}

pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub comments: Vec<crate::ast::Ranged<String>>,
}

pub fn tokenize(source: &str) -> Result<LexOutput, ParseError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    comments: Vec<crate::ast::Ranged<String>>,
}

const OPERATOR_CHARS: &str = "+-/*=.<>:&|^?%!";

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.get(self.index).copied()?;
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        self.tokens.push(Token {
            kind,
            range: Range::new(start, self.pos()),
        });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.pos())
    }

    fn run(mut self) -> Result<LexOutput, ParseError> {
        while let Some(ch) = self.peek() {
            let start = self.pos();
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '-' if self.peek_at(1) == Some('-') => self.line_comment(start),
                '{' if self.peek_at(1) == Some('-') => self.block_comment(start)?,
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' if self.looks_like_glsl() => self.glsl(start)?,
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                ',' => self.single(TokenKind::Comma),
                '\\' => self.single(TokenKind::Backslash),
                '_' if !is_ident_char(self.peek_at(1)) => self.single(TokenKind::Underscore),
                '"' => self.string(start)?,
                '\'' => self.char_literal(start)?,
                c if c.is_ascii_digit() => self.number(start)?,
                c if c.is_lowercase() || c == '_' => self.name(start, false),
                c if c.is_uppercase() => self.name(start, true),
                c if OPERATOR_CHARS.contains(c) => self.operator(start),
                c => return Err(self.error(format!("unexpected character `{c}`"))),
            }
        }
        Ok(LexOutput {
            tokens: self.tokens,
            comments: self.comments,
        })
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos();
        self.bump();
        self.push(kind, start);
    }

    fn line_comment(&mut self, start: Position) {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.bump();
        }
        self.comments
            .push(crate::ast::Ranged::new(text, Range::new(start, self.pos())));
    }

    fn block_comment(&mut self, start: Position) -> Result<(), ParseError> {
        self.bump(); // {
        self.bump(); // -
        let is_doc = self.peek() == Some('|');
        if is_doc {
            self.bump();
        }
        let mut depth = 1usize;
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated block comment")),
                Some('{') if self.peek_at(1) == Some('-') => {
                    depth += 1;
                    text.push('{');
                    text.push('-');
                    self.bump();
                    self.bump();
                }
                Some('-') if self.peek_at(1) == Some('}') => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    text.push('-');
                    text.push('}');
                }
                Some(ch) => {
                    text.push(ch);
                    self.bump();
                }
            }
        }
        let range = Range::new(start, self.pos());
        if is_doc {
            self.tokens.push(Token {
                kind: TokenKind::DocComment(text.trim().to_string()),
                range,
            });
        } else {
            self.comments
                .push(crate::ast::Ranged::new(format!("{{-{text}-}}"), range));
        }
        Ok(())
    }

    fn looks_like_glsl(&self) -> bool {
        const MARKER: &str = "[glsl|";
        self.chars[self.index..]
            .iter()
            .take(MARKER.len())
            .collect::<String>()
            == MARKER
    }

    fn glsl(&mut self, start: Position) -> Result<(), ParseError> {
        for _ in 0.."[glsl|".len() {
            self.bump();
        }
        let mut body = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated glsl block")),
                Some('|') if self.peek_at(1) == Some(']') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(ch) => {
                    body.push(ch);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::Glsl(body), start);
        Ok(())
    }

    fn string(&mut self, start: Position) -> Result<(), ParseError> {
        let triple = self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"');
        let quotes = if triple { 3 } else { 1 };
        for _ in 0..quotes {
            self.bump();
        }
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal")),
                Some('"') => {
                    if triple {
                        if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
                            for _ in 0..3 {
                                self.bump();
                            }
                            break;
                        }
                        text.push('"');
                        self.bump();
                    } else {
                        self.bump();
                        break;
                    }
                }
                Some('\\') => {
                    self.bump();
                    text.push(self.escape()?);
                }
                Some('\n') if !triple => return Err(self.error("unterminated string literal")),
                Some(ch) => {
                    text.push(ch);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::Str(text), start);
        Ok(())
    }

    fn char_literal(&mut self, start: Position) -> Result<(), ParseError> {
        self.bump(); // '
        let ch = match self.peek() {
            None => return Err(self.error("unterminated character literal")),
            Some('\\') => {
                self.bump();
                self.escape()?
            }
            Some(ch) => {
                self.bump();
                ch
            }
        };
        if self.peek() != Some('\'') {
            return Err(self.error("unterminated character literal"));
        }
        self.bump();
        self.push(TokenKind::Char(ch), start);
        Ok(())
    }

    fn escape(&mut self) -> Result<char, ParseError> {
        let ch = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape sequence"))?;
        match ch {
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            '\\' => Ok('\\'),
            '\'' => Ok('\''),
            '"' => Ok('"'),
            'u' => {
                if self.bump() != Some('{') {
                    return Err(self.error("expected `{` in unicode escape"));
                }
                let mut digits = String::new();
                while let Some(d) = self.peek() {
                    if d == '}' {
                        break;
                    }
                    digits.push(d);
                    self.bump();
                }
                if self.bump() != Some('}') {
                    return Err(self.error("expected `}` in unicode escape"));
                }
                u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("invalid unicode escape"))
            }
            other => Err(self.error(format!("unknown escape `\\{other}`"))),
        }
    }

    fn number(&mut self, start: Position) -> Result<(), ParseError> {
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(d) = self.peek() {
                if !d.is_ascii_hexdigit() {
                    break;
                }
                digits.push(d);
                self.bump();
            }
            let value = i64::from_str_radix(&digits, 16)
                .map_err(|_| self.error("invalid hexadecimal literal"))?;
            self.push(TokenKind::Hex(value), start);
            return Ok(());
        }

        let mut text = String::new();
        let mut is_float = false;
        while let Some(d) = self.peek() {
            if d.is_ascii_digit() {
                text.push(d);
                self.bump();
            } else if d == '.' && !is_float && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push(d);
                self.bump();
            } else if (d == 'e' || d == 'E')
                && self
                    .peek_at(1)
                    .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
            {
                is_float = true;
                text.push(d);
                self.bump();
                if matches!(self.peek(), Some('-') | Some('+')) {
                    text.push(self.bump().unwrap());
                }
            } else {
                break;
            }
        }
        if is_float {
            let value: f64 = text.parse().map_err(|_| self.error("invalid float literal"))?;
            self.push(TokenKind::Float(value), start);
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error("integer literal out of range"))?;
            self.push(TokenKind::Int(value), start);
        }
        Ok(())
    }

    fn name(&mut self, start: Position, upper: bool) {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        let kind = if upper {
            TokenKind::UpperName(text)
        } else {
            match text.as_str() {
                "module" => TokenKind::KwModule,
                "exposing" => TokenKind::KwExposing,
                "as" => TokenKind::KwAs,
                "import" => TokenKind::KwImport,
                "type" => TokenKind::KwType,
                "if" => TokenKind::KwIf,
                "then" => TokenKind::KwThen,
                "else" => TokenKind::KwElse,
                "case" => TokenKind::KwCase,
                "of" => TokenKind::KwOf,
                "let" => TokenKind::KwLet,
                "in" => TokenKind::KwIn,
                _ => TokenKind::LowerName(text),
            }
        };
        self.push(kind, start);
    }

    fn operator(&mut self, start: Position) {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if OPERATOR_CHARS.contains(ch) {
                text.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "=" => TokenKind::Eq,
            "->" => TokenKind::Arrow,
            ":" => TokenKind::Colon,
            "|" => TokenKind::Bar,
            "." => TokenKind::Dot,
            ".." => TokenKind::DotDot,
            _ => TokenKind::Operator(text),
        };
        self.push(kind, start);
    }
}

fn is_ident_char(ch: Option<char>) -> bool {
    ch.is_some_and(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_names_and_keywords() {
        assert_eq!(
            kinds("module Main exposing"),
            vec![
                TokenKind::KwModule,
                TokenKind::UpperName("Main".to_string()),
                TokenKind::KwExposing,
            ]
        );
    }

    #[test]
    fn contextual_keywords_stay_names() {
        assert_eq!(
            kinds("port alias where"),
            vec![
                TokenKind::LowerName("port".to_string()),
                TokenKind::LowerName("alias".to_string()),
                TokenKind::LowerName("where".to_string()),
            ]
        );
    }

    #[test]
    fn scans_qualified_name_as_adjacent_tokens() {
        let tokens = tokenize("List.map").unwrap().tokens;
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].range.end, tokens[1].range.start);
        assert_eq!(tokens[1].range.end, tokens[2].range.start);
    }

    #[test]
    fn distinguishes_structural_operators() {
        assert_eq!(
            kinds("= -> : | .. . ++"),
            vec![
                TokenKind::Eq,
                TokenKind::Arrow,
                TokenKind::Colon,
                TokenKind::Bar,
                TokenKind::DotDot,
                TokenKind::Dot,
                TokenKind::Operator("++".to_string()),
            ]
        );
    }

    #[test]
    fn scans_literals() {
        assert_eq!(
            kinds("42 0x2A 1.5 \"hi\" 'x'"),
            vec![
                TokenKind::Int(42),
                TokenKind::Hex(42),
                TokenKind::Float(1.5),
                TokenKind::Str("hi".to_string()),
                TokenKind::Char('x'),
            ]
        );
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        assert_eq!(
            kinds("\"\"\"a\nb\"\"\""),
            vec![TokenKind::Str("a\nb".to_string())]
        );
    }

    #[test]
    fn doc_comment_becomes_a_token_plain_comments_do_not() {
        let out = tokenize("{-| docs -}\n{- plain -}\n-- line\nx = 1").unwrap();
        assert!(matches!(&out.tokens[0].kind, TokenKind::DocComment(d) if d == "docs"));
        assert_eq!(out.comments.len(), 2);
    }

    #[test]
    fn nested_block_comments() {
        let out = tokenize("{- outer {- inner -} still -} x").unwrap();
        assert_eq!(out.comments.len(), 1);
        assert_eq!(out.tokens.len(), 1);
    }

    #[test]
    fn ranges_are_one_based_with_exclusive_end_boundary() {
        let tokens = tokenize("add a").unwrap().tokens;
        assert_eq!(tokens[0].range, Range::from_coords(1, 1, 1, 4));
        assert_eq!(tokens[1].range, Range::from_coords(1, 5, 1, 6));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(tokenize("\"abc").is_err());
    }
}
