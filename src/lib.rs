#![forbid(unsafe_code)]
//! Lava compiler front-end
//!
//! Lava is a superset of Java that compiles to JVM class files. This crate takes source files from text to class
//! skeletons: it lexes and parses every compile unit, resolves names against the classpath and the other units,
//! checks annotations, constants and method bodies, and hands finished [`class::ClassNode`]s to code generation.
//!
//! ## Layout
//!
//! - [`session`] - Driver: owns the global context and runs units through the stages
//! - [`unit`] - One compile unit and its stages
//! - [`context`] - Registry of every class visible to the compile
//! - [`library`] - Classpath entries: directories, jars, symbol caches
//! - [`resolve`] - Per-class resolution helper (hierarchy, members, generics)
//! - [`local`] - Checking context for code inside a class
//! - [`types`] - Type model, descriptors and signatures
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a compiler bug (logic error), use `.expect("INVARIANT: reason")` with a
//!   clear explanation.

pub mod cache;
pub mod class;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod library;
pub mod local;
pub mod resolve;
pub mod session;
pub mod types;
pub mod unit;

pub use config::CompilerConfig;
pub use context::GlobalContext;
pub use error::SessionError;
pub use session::Session;
