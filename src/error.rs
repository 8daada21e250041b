//! Session-level error types.
//!
//! Two kinds of failure exist outside the diagnostic stream:
//!
//! - [`SessionError`] is fatal to the whole compilation (duplicate unit names, an unreadable classpath entry, a
//!   corrupted symbol cache).
//! - [`ClassNotFound`] is recoverable: lookups that need a missing class return it and the caller decides whether to
//!   turn it into a diagnostic.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("duplicate compile unit `{name}`")]
    DuplicateUnit { name: String },

    #[error("corrupted symbol cache {}: {reason}", path.display())]
    CorruptSymbolCache { path: PathBuf, reason: String },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open archive {}: {reason}", path.display())]
    Archive { path: PathBuf, reason: String },
}

impl SessionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A class needed to complete a computation could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("class `{name}` (required by `{needed_by}`) not found")]
pub struct ClassNotFound {
    pub name: String,
    pub needed_by: String,
}

impl ClassNotFound {
    pub fn new(name: impl Into<String>, needed_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            needed_by: needed_by.into(),
        }
    }
}
