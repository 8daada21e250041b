//! CLI module for the Lava compiler
//!
//! ## Commands
//!
//! - `check <FILES>...` - Compile source files through every stage and report diagnostics
//! - `cache build` - Write a symbol cache for a classpath
//! - `cache list <FILE>` - List the classes stored in a symbol cache
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::error::SessionError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self::new(message, ExitCode(code))
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::failure(format!("error: {err}"))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// The Lava compiler front-end
#[derive(Parser, Debug)]
#[command(name = "lava")]
#[command(version = VERSION)]
#[command(about = "The Lava compiler front-end", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile source files and report diagnostics
    Check {
        /// Source files to compile together
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
        /// Classpath (defaults to $CLASSPATH, then `.`)
        #[arg(long, visible_alias = "cp", value_name = "CP")]
        classpath: Option<String>,
        /// Symbol cache consulted before the classpath
        #[arg(long = "symbol-cache", value_name = "FILE")]
        symbol_cache: Option<PathBuf>,
        /// Worker threads for method bodies
        #[arg(long, default_value_t = 1)]
        threads: usize,
        /// Treat warnings as errors
        #[arg(long)]
        werror: bool,
        /// Stop recording diagnostics after this many errors (0 = no limit)
        #[arg(long = "max-errors", default_value_t = 100)]
        max_errors: usize,
    },

    /// Build or inspect symbol caches
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Write every class of a classpath into a symbol cache
    Build {
        #[arg(long, visible_alias = "cp", value_name = "CP")]
        classpath: String,
        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// List the classes in a symbol cache
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Check {
            files,
            classpath,
            symbol_cache,
            threads,
            werror,
            max_errors,
        } => {
            let mut config = crate::config::CompilerConfig::new()
                .with_classpath(crate::config::resolve_classpath(classpath.as_deref()))
                .with_threads(threads)
                .with_warnings_as_errors(werror)
                .with_max_errors(max_errors);
            if let Some(path) = symbol_cache {
                config = config.with_symbol_cache(path);
            }
            commands::check_files(&files, config)
        }
        Command::Cache {
            action: CacheCommand::Build { classpath, output },
        } => commands::cache_build(&classpath, &output),
        Command::Cache {
            action: CacheCommand::List { file },
        } => commands::cache_list(&file),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::try_parse_from(["lava", "check", "A.java", "B.java", "--cp", "lib", "--threads", "4"]).unwrap();
        if let Command::Check {
            files,
            classpath,
            threads,
            max_errors,
            werror,
            ..
        } = cli.command
        {
            assert_eq!(files, [PathBuf::from("A.java"), PathBuf::from("B.java")]);
            assert_eq!(classpath.as_deref(), Some("lib"));
            assert_eq!(threads, 4);
            assert_eq!(max_errors, 100);
            assert!(!werror);
        } else {
            panic!("Expected Check command");
        }
    }

    #[test]
    fn test_cli_check_requires_files() {
        assert!(Cli::try_parse_from(["lava", "check"]).is_err());
    }

    #[test]
    fn test_cli_parse_cache() {
        let cli = Cli::try_parse_from(["lava", "cache", "build", "--classpath", "rt.jar", "-o", "rt.lsym"]).unwrap();
        assert!(matches!(cli.command, Command::Cache { action: CacheCommand::Build { .. } }));

        let cli = Cli::try_parse_from(["lava", "cache", "list", "rt.lsym"]).unwrap();
        if let Command::Cache {
            action: CacheCommand::List { file },
        } = cli.command
        {
            assert_eq!(file, PathBuf::from("rt.lsym"));
        } else {
            panic!("Expected cache list");
        }
    }
}
