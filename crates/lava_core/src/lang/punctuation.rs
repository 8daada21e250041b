//! Punctuation vocabulary.
//!
//! Delimiters, separators and structural markers. Operators live in [`crate::lang::operators`].
//!
//! ## Examples
//! ```rust
//! use lava_core::lang::punctuation::{self, PunctuationId};
//!
//! assert_eq!(punctuation::from_str("::"), Some(PunctuationId::ColonColon));
//! assert_eq!(punctuation::as_str(PunctuationId::Ellipsis), "...");
//! ```

/// Stable identifier for punctuation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationId {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,
    Ellipsis,
    At,
    ColonColon,
    Question,
    Colon,
    Arrow,
}

/// Registry of punctuation spellings, longest spellings first so greedy matching works.
pub const PUNCTUATION: &[(PunctuationId, &str)] = &[
    (PunctuationId::Ellipsis, "..."),
    (PunctuationId::ColonColon, "::"),
    (PunctuationId::Arrow, "->"),
    (PunctuationId::LParen, "("),
    (PunctuationId::RParen, ")"),
    (PunctuationId::LBracket, "["),
    (PunctuationId::RBracket, "]"),
    (PunctuationId::LBrace, "{"),
    (PunctuationId::RBrace, "}"),
    (PunctuationId::Semicolon, ";"),
    (PunctuationId::Comma, ","),
    (PunctuationId::Dot, "."),
    (PunctuationId::At, "@"),
    (PunctuationId::Question, "?"),
    (PunctuationId::Colon, ":"),
];

/// Look up punctuation by exact spelling.
pub fn from_str(spelling: &str) -> Option<PunctuationId> {
    PUNCTUATION.iter().find(|(_, s)| *s == spelling).map(|(id, _)| *id)
}

/// Return the spelling of a punctuation token.
pub fn as_str(id: PunctuationId) -> &'static str {
    PUNCTUATION
        .iter()
        .find(|(p, _)| *p == id)
        .map(|(_, s)| *s)
        .unwrap_or("?")
}

/// Match the longest punctuation spelling at the start of `rest`.
pub fn match_prefix(rest: &str) -> Option<(PunctuationId, usize)> {
    PUNCTUATION
        .iter()
        .find(|(_, s)| rest.starts_with(s))
        .map(|(id, s)| (*id, s.len()))
}
