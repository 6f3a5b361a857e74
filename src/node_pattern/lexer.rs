//! NodePattern DSL lexer.
//!
//! Tokenizes NodePattern strings like `(send nil? :field ...)`. Every token
//! carries the byte offset where it starts so later stages can point at the
//! offending spot.

use super::{PatternSyntaxError, SyntaxErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Capture,  // $
    Wildcard, // _
    Rest,     // ...
    Negation, // !
    Pipe,     // | inside alternatives
    Caret,    // ^ (parent node ref)
    Backtick, // ` (descend operator)
    HelperCall(String),    // #method_name or #method_name?
    ParamRef(String),      // %1, %param
    SymbolLiteral(String), // :sym
    IntLiteral(i64),
    StringLiteral(String),
    NilPredicate,          // nil?
    TypePredicate(String), // int?, str?, sym?, etc.
    Ident(String),         // node type names: send, block, def, etc.
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            source: input,
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos + ahead).copied()
    }

    fn skip_whitespace(&mut self) {
        while self
            .peek()
            .is_some_and(|ch| matches!(ch, b' ' | b'\t' | b'\n' | b'\r'))
        {
            self.pos += 1;
        }
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn is_ident_char(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'-'
    }

    fn error(&self, kind: SyntaxErrorKind, offset: usize) -> PatternSyntaxError {
        PatternSyntaxError::new(kind, offset, self.source)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, PatternSyntaxError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek() else { break };
            let offset = self.pos;

            let token = match ch {
                b'(' | b')' | b'{' | b'}' | b'[' | b']' | b'$' | b'|' | b'^' | b'`' | b'!' => {
                    self.pos += 1;
                    match ch {
                        b'(' => Token::LParen,
                        b')' => Token::RParen,
                        b'{' => Token::LBrace,
                        b'}' => Token::RBrace,
                        b'[' => Token::LBracket,
                        b']' => Token::RBracket,
                        b'$' => Token::Capture,
                        b'|' => Token::Pipe,
                        b'^' => Token::Caret,
                        b'`' => Token::Backtick,
                        _ => Token::Negation,
                    }
                }
                b'.' => {
                    if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                        self.pos += 3;
                        Token::Rest
                    } else {
                        return Err(self.error(SyntaxErrorKind::UnexpectedChar('.'), offset));
                    }
                }
                b'#' => {
                    self.pos += 1;
                    Token::HelperCall(self.read_while(|c| Self::is_ident_char(c) || c == b'?'))
                }
                b'%' => {
                    self.pos += 1;
                    Token::ParamRef(self.read_while(|c| c.is_ascii_alphanumeric() || c == b'_'))
                }
                b':' => {
                    self.pos += 1;
                    if self.peek() == Some(b':') {
                        self.pos += 1;
                        Token::Ident("cbase".to_string())
                    } else {
                        // Operator method names: :==, :<=>, :[], :!, :+, ...
                        let name = if self
                            .peek()
                            .is_some_and(|c| b"=<>!~+*&|^/%-.".contains(&c))
                        {
                            self.read_while(|c| b"=<>!~+*&|^/%-.[]".contains(&c))
                        } else if self.peek() == Some(b'[') {
                            self.read_while(|c| b"[]=".contains(&c))
                        } else {
                            self.read_while(|c| {
                                Self::is_ident_char(c) || c == b'?' || c == b'!' || c == b'='
                            })
                        };
                        if name.is_empty() {
                            return Err(self.error(SyntaxErrorKind::UnexpectedChar(':'), offset));
                        }
                        Token::SymbolLiteral(name)
                    }
                }
                b'\'' | b'"' => {
                    self.pos += 1;
                    let s = self.read_while(move |c| c != ch);
                    if self.peek() != Some(ch) {
                        return Err(self.error(SyntaxErrorKind::UnterminatedString, offset));
                    }
                    self.pos += 1;
                    Token::StringLiteral(s)
                }
                b'_' => {
                    // Could be just _ (wildcard) or an identifier starting with _
                    let word = self.read_while(|c| Self::is_ident_char(c) || c == b'?');
                    if word == "_" {
                        Token::Wildcard
                    } else {
                        Token::Ident(word)
                    }
                }
                _ if ch.is_ascii_digit()
                    || (ch == b'-' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) =>
                {
                    self.pos += 1;
                    let digits = self.read_while(|c| c.is_ascii_digit());
                    let literal = format!("{}{digits}", ch as char);
                    let value = literal.parse::<i64>().map_err(|_| {
                        self.error(SyntaxErrorKind::UnexpectedToken(literal.clone()), offset)
                    })?;
                    Token::IntLiteral(value)
                }
                _ if ch.is_ascii_alphabetic() => {
                    let word = self.read_while(|c| Self::is_ident_char(c) || c == b'?');
                    match word.strip_suffix('?') {
                        Some("nil") => Token::NilPredicate,
                        Some(ty) => Token::TypePredicate(ty.to_string()),
                        None => Token::Ident(word),
                    }
                }
                _ => {
                    let bad = self.source[offset..].chars().next().unwrap_or('?');
                    return Err(self.error(SyntaxErrorKind::UnexpectedChar(bad), offset));
                }
            };

            tokens.push(Spanned { token, offset });
        }

        Ok(tokens)
    }
}
