//! Token types for the Lava lexer.
//!
//! The lexer uses **registry-backed IDs** for language vocabulary:
//! - `Keyword(KeywordId)` for reserved words
//! - `Operator(OperatorId)` for operators
//! - `Punctuation(PunctuationId)` for punctuation tokens
//!
//! Contextual keywords (`record`, `struct`, `var`, ...) are plain identifiers.

use crate::span::Span;
use lava_core::lang::keywords::{self, KeywordId};
use lava_core::lang::operators::{self, OperatorId};
use lava_core::lang::punctuation::{self, PunctuationId};

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(KeywordId),
    Operator(OperatorId),
    Punctuation(PunctuationId),

    Ident(String),
    /// Integer literal without `L` suffix. Kept wide so `-2147483648` can be folded later.
    Int(i64),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),

    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self, id: KeywordId) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == id)
    }

    pub fn is_operator(&self, id: OperatorId) -> bool {
        matches!(self, TokenKind::Operator(o) if *o == id)
    }

    pub fn is_punctuation(&self, id: PunctuationId) -> bool {
        matches!(self, TokenKind::Punctuation(p) if *p == id)
    }

    /// Return the identifier text, if this is an identifier.
    pub fn ident(&self) -> Option<&str> {
        match self {
            TokenKind::Ident(s) => Some(s),
            _ => None,
        }
    }

    /// Return `true` if this is the given contextual keyword (an identifier with that spelling).
    pub fn is_contextual(&self, word: &str) -> bool {
        self.ident() == Some(word)
    }

    /// Short human-readable description for "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Keyword(k) => format!("`{}`", keywords::as_str(*k)),
            TokenKind::Operator(o) => format!("`{}`", operators::as_str(*o)),
            TokenKind::Punctuation(p) => format!("`{}`", punctuation::as_str(*p)),
            TokenKind::Ident(s) => format!("identifier `{s}`"),
            TokenKind::Int(_) | TokenKind::Long(_) => "integer literal".to_string(),
            TokenKind::Float(_) | TokenKind::Double(_) => "floating-point literal".to_string(),
            TokenKind::Char(_) => "character literal".to_string(),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
