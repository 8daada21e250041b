//! Operator vocabulary with binary precedence.
//!
//! `>` is always lexed on its own: `List<List<String>>` must close two type-argument lists, so the expression parser
//! glues adjacent `>` tokens back into shift operators when it needs them.
//!
//! ## Examples
//! ```rust
//! use lava_core::lang::operators::{self, OperatorId};
//!
//! assert_eq!(operators::from_str("&&"), Some(OperatorId::AndAnd));
//! assert!(operators::precedence(OperatorId::Star) > operators::precedence(OperatorId::Plus));
//! ```

/// Stable identifier for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Not,
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    /// `>>`, only produced by the expression parser from two adjacent `>` tokens.
    Shr,
    /// `>>>`, only produced by the expression parser from three adjacent `>` tokens.
    UShr,
    PlusPlus,
    MinusMinus,
}

/// Lexer spellings, longest first. `Shr`/`UShr` are deliberately absent.
pub const OPERATORS: &[(OperatorId, &str)] = &[
    (OperatorId::ShlAssign, "<<="),
    (OperatorId::EqEq, "=="),
    (OperatorId::NotEq, "!="),
    (OperatorId::LtEq, "<="),
    (OperatorId::GtEq, ">="),
    (OperatorId::AndAnd, "&&"),
    (OperatorId::OrOr, "||"),
    (OperatorId::PlusPlus, "++"),
    (OperatorId::MinusMinus, "--"),
    (OperatorId::PlusAssign, "+="),
    (OperatorId::MinusAssign, "-="),
    (OperatorId::StarAssign, "*="),
    (OperatorId::SlashAssign, "/="),
    (OperatorId::PercentAssign, "%="),
    (OperatorId::AndAssign, "&="),
    (OperatorId::OrAssign, "|="),
    (OperatorId::XorAssign, "^="),
    (OperatorId::Shl, "<<"),
    (OperatorId::Assign, "="),
    (OperatorId::Lt, "<"),
    (OperatorId::Gt, ">"),
    (OperatorId::Not, "!"),
    (OperatorId::Tilde, "~"),
    (OperatorId::Plus, "+"),
    (OperatorId::Minus, "-"),
    (OperatorId::Star, "*"),
    (OperatorId::Slash, "/"),
    (OperatorId::Percent, "%"),
    (OperatorId::Amp, "&"),
    (OperatorId::Pipe, "|"),
    (OperatorId::Caret, "^"),
];

/// Look up an operator by exact spelling.
pub fn from_str(spelling: &str) -> Option<OperatorId> {
    OPERATORS.iter().find(|(_, s)| *s == spelling).map(|(id, _)| *id)
}

/// Return the spelling of an operator.
pub fn as_str(id: OperatorId) -> &'static str {
    match id {
        OperatorId::Shr => ">>",
        OperatorId::UShr => ">>>",
        _ => OPERATORS.iter().find(|(o, _)| *o == id).map(|(_, s)| *s).unwrap_or("?"),
    }
}

/// Match the longest operator spelling at the start of `rest`.
pub fn match_prefix(rest: &str) -> Option<(OperatorId, usize)> {
    OPERATORS.iter().find(|(_, s)| rest.starts_with(s)).map(|(id, s)| (*id, s.len()))
}

/// Binary precedence (higher binds tighter). `0` means "not a binary operator".
pub fn precedence(id: OperatorId) -> u8 {
    match id {
        OperatorId::OrOr => 1,
        OperatorId::AndAnd => 2,
        OperatorId::Pipe => 3,
        OperatorId::Caret => 4,
        OperatorId::Amp => 5,
        OperatorId::EqEq | OperatorId::NotEq => 6,
        OperatorId::Lt | OperatorId::Gt | OperatorId::LtEq | OperatorId::GtEq => 7,
        OperatorId::Shl | OperatorId::Shr | OperatorId::UShr => 8,
        OperatorId::Plus | OperatorId::Minus => 9,
        OperatorId::Star | OperatorId::Slash | OperatorId::Percent => 10,
        _ => 0,
    }
}

/// Return `true` for `==`, `!=`, `<`, `>`, `<=`, `>=`.
pub fn is_comparison(id: OperatorId) -> bool {
    matches!(precedence(id), 6 | 7)
}
