//! Define the reserved keyword vocabulary for the Lava language.
//!
//! This module is the single source of truth for reserved words: a stable identifier ([`KeywordId`]) plus a const
//! metadata table ([`KEYWORDS`]).
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - `record`, `struct`, `var`, `sealed`, `permits` and `module` are *contextual*: the lexer emits them as identifiers
//!   and the parser recognizes them by position. See [`is_contextual`].
//!
//! ## Examples
//! ```rust
//! use lava_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("interface"), Some(KeywordId::Interface));
//! assert_eq!(keywords::from_str("record"), None);
//! assert!(keywords::is_contextual("record"));
//! ```

/// Stable identifier for every reserved keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordId {
    // Declarations
    Package,
    Import,
    Class,
    Interface,
    Enum,
    Extends,
    Implements,
    Throws,

    // Modifiers
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Native,
    Synchronized,
    Transient,
    Volatile,
    Strictfp,
    Default,

    // Primitive type names
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,

    // Statements
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Break,
    Continue,
    Return,
    Throw,
    Try,
    Catch,
    Finally,
    Assert,
    Goto,
    Const,

    // Expressions
    New,
    This,
    Super,
    Instanceof,
    True,
    False,
    Null,
}

/// High-level grouping for documentation and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    Declaration,
    Modifier,
    PrimitiveType,
    Statement,
    Expression,
    Literal,
}

/// Metadata for a keyword.
#[derive(Debug, Clone, Copy)]
pub struct KeywordInfo {
    pub id: KeywordId,
    pub canonical: &'static str,
    pub category: KeywordCategory,
}

const fn info(id: KeywordId, canonical: &'static str, category: KeywordCategory) -> KeywordInfo {
    KeywordInfo { id, canonical, category }
}

use KeywordCategory as C;

/// Registry of all reserved keywords.
pub const KEYWORDS: &[KeywordInfo] = &[
    info(KeywordId::Package, "package", C::Declaration),
    info(KeywordId::Import, "import", C::Declaration),
    info(KeywordId::Class, "class", C::Declaration),
    info(KeywordId::Interface, "interface", C::Declaration),
    info(KeywordId::Enum, "enum", C::Declaration),
    info(KeywordId::Extends, "extends", C::Declaration),
    info(KeywordId::Implements, "implements", C::Declaration),
    info(KeywordId::Throws, "throws", C::Declaration),
    info(KeywordId::Public, "public", C::Modifier),
    info(KeywordId::Protected, "protected", C::Modifier),
    info(KeywordId::Private, "private", C::Modifier),
    info(KeywordId::Static, "static", C::Modifier),
    info(KeywordId::Final, "final", C::Modifier),
    info(KeywordId::Abstract, "abstract", C::Modifier),
    info(KeywordId::Native, "native", C::Modifier),
    info(KeywordId::Synchronized, "synchronized", C::Modifier),
    info(KeywordId::Transient, "transient", C::Modifier),
    info(KeywordId::Volatile, "volatile", C::Modifier),
    info(KeywordId::Strictfp, "strictfp", C::Modifier),
    info(KeywordId::Default, "default", C::Modifier),
    info(KeywordId::Boolean, "boolean", C::PrimitiveType),
    info(KeywordId::Byte, "byte", C::PrimitiveType),
    info(KeywordId::Char, "char", C::PrimitiveType),
    info(KeywordId::Short, "short", C::PrimitiveType),
    info(KeywordId::Int, "int", C::PrimitiveType),
    info(KeywordId::Long, "long", C::PrimitiveType),
    info(KeywordId::Float, "float", C::PrimitiveType),
    info(KeywordId::Double, "double", C::PrimitiveType),
    info(KeywordId::Void, "void", C::PrimitiveType),
    info(KeywordId::If, "if", C::Statement),
    info(KeywordId::Else, "else", C::Statement),
    info(KeywordId::For, "for", C::Statement),
    info(KeywordId::While, "while", C::Statement),
    info(KeywordId::Do, "do", C::Statement),
    info(KeywordId::Switch, "switch", C::Statement),
    info(KeywordId::Case, "case", C::Statement),
    info(KeywordId::Break, "break", C::Statement),
    info(KeywordId::Continue, "continue", C::Statement),
    info(KeywordId::Return, "return", C::Statement),
    info(KeywordId::Throw, "throw", C::Statement),
    info(KeywordId::Try, "try", C::Statement),
    info(KeywordId::Catch, "catch", C::Statement),
    info(KeywordId::Finally, "finally", C::Statement),
    info(KeywordId::Assert, "assert", C::Statement),
    info(KeywordId::Goto, "goto", C::Statement),
    info(KeywordId::Const, "const", C::Statement),
    info(KeywordId::New, "new", C::Expression),
    info(KeywordId::This, "this", C::Expression),
    info(KeywordId::Super, "super", C::Expression),
    info(KeywordId::Instanceof, "instanceof", C::Expression),
    info(KeywordId::True, "true", C::Literal),
    info(KeywordId::False, "false", C::Literal),
    info(KeywordId::Null, "null", C::Literal),
];

/// Words with a meaning only in specific positions; lexed as identifiers.
pub const CONTEXTUAL: &[&str] = &["record", "struct", "var", "sealed", "permits", "module", "non-sealed"];

/// Look up a keyword by its spelling.
pub fn from_str(spelling: &str) -> Option<KeywordId> {
    KEYWORDS.iter().find(|k| k.canonical == spelling).map(|k| k.id)
}

/// Return the canonical spelling of a keyword.
pub fn as_str(id: KeywordId) -> &'static str {
    info_for(id).canonical
}

/// Return the registry entry for a keyword.
pub fn info_for(id: KeywordId) -> &'static KeywordInfo {
    KEYWORDS
        .iter()
        .find(|k| k.id == id)
        .expect("INVARIANT: every KeywordId has a registry entry")
}

/// Return `true` for contextual keywords (`record`, `struct`, ...).
pub fn is_contextual(spelling: &str) -> bool {
    CONTEXTUAL.contains(&spelling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_round_trip() {
        for k in KEYWORDS {
            assert_eq!(from_str(k.canonical), Some(k.id), "{}", k.canonical);
            assert_eq!(as_str(k.id), k.canonical);
        }
    }

    #[test]
    fn test_contextual_words_are_not_reserved() {
        for w in CONTEXTUAL {
            assert_eq!(from_str(w), None, "{w} must stay an identifier");
        }
    }
}
