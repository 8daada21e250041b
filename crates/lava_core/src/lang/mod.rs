//! Lava language vocabulary registries.
//!
//! Callers work with **stable IDs** (`KeywordId`, `PunctuationId`, `OperatorId`, `PrimitiveKind`) and look up
//! spellings/metadata via registry tables instead of scattering string comparisons through the compiler.
//!
//! ## Notes
//! - Registries are intentionally **pure**: no AST types, no IO, no side effects.
//! - The lexer and the structural parser enforce syntax; registries only provide spellings and metadata.
//!
//! ## Examples
//! ```rust
//! use lava_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("extends"), Some(KeywordId::Extends));
//! assert_eq!(keywords::as_str(KeywordId::Extends), "extends");
//! ```

pub mod keywords;
pub mod operators;
pub mod primitives;
pub mod punctuation;
pub mod well_known;
