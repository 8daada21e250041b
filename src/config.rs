//! Compiler configuration.
//!
//! Everything a [`crate::session::Session`] needs to know before it opens its first library: where classes come
//! from, how many worker threads the last stage may use, and how diagnostics are escalated.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no classpath is given explicitly.
pub const CLASSPATH_ENV: &str = "CLASSPATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Classpath entries in lookup order (directories, jars, symbol caches).
    pub classpath: Vec<PathBuf>,
    /// Prebuilt symbol cache consulted before the classpath entries.
    pub symbol_cache: Option<PathBuf>,
    /// Worker threads for the final stage. `1` keeps everything on the calling thread.
    pub threads: usize,
    /// Report warnings as errors (they then also block code generation).
    pub warnings_as_errors: bool,
    /// Stop recording diagnostics after this many errors. `0` means no limit.
    pub max_errors: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            classpath: Vec::new(),
            symbol_cache: None,
            threads: 1,
            warnings_as_errors: false,
            max_errors: 100,
        }
    }
}

impl CompilerConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_symbol_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.symbol_cache = Some(path.into());
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_warnings_as_errors(mut self, on: bool) -> Self {
        self.warnings_as_errors = on;
        self
    }

    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }
}

/// Resolve the effective classpath the way `javac` does: the explicit argument, then `$CLASSPATH`, then `.`.
pub fn resolve_classpath(explicit: Option<&str>) -> Vec<PathBuf> {
    let from_env = env::var_os(CLASSPATH_ENV).filter(|v| !v.is_empty());
    match (explicit, from_env) {
        (Some(cp), _) => split_classpath(cp),
        (None, Some(cp)) => env::split_paths(&cp).collect(),
        (None, None) => vec![Path::new(".").to_path_buf()],
    }
}

/// Split a classpath string on the platform separator, dropping empty entries.
pub fn split_classpath(cp: &str) -> Vec<PathBuf> {
    env::split_paths(cp).filter(|p| !p.as_os_str().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = CompilerConfig::new()
            .with_threads(0)
            .with_warnings_as_errors(true)
            .with_symbol_cache("rt.lsym");
        assert_eq!(config.threads, 1);
        assert!(config.warnings_as_errors);
        assert_eq!(config.symbol_cache.as_deref(), Some(Path::new("rt.lsym")));
        assert_eq!(config.max_errors, 100);
    }

    #[test]
    fn test_explicit_classpath_wins() {
        let sep = if cfg!(windows) { ";" } else { ":" };
        let cp = resolve_classpath(Some(&format!("a{sep}{sep}b.jar")));
        assert_eq!(cp, vec![PathBuf::from("a"), PathBuf::from("b.jar")]);
    }
}
