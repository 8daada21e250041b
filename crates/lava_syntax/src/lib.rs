//! Shared syntax layer for the Lava language: spans, tokens, lexer, diagnostics.
//!
//! ## Notes
//! - This crate is intentionally “syntax-only”: it does not know about classes, libraries or types. The structural
//!   parser that turns tokens into class skeletons lives with `CompileUnit` in the `lava` crate, because its later
//!   stages need the symbol table.
//! - Vocabulary identity (keywords/operators/punctuation) comes from `lava_core::lang` registries.
//!
//! ## Examples
//! ```rust
//! use lava_syntax::lexer;
//!
//! let tokens = lexer::lex("package a.b; class C {}").unwrap();
//! assert_eq!(tokens.len(), 10); // 9 tokens + EOF
//! ```

pub mod diagnostics;
pub mod lexer;
pub mod span;

pub use diagnostics::{Diagnostic, Severity, SyntaxError};
pub use span::Span;
