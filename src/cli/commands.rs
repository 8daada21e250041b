//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::{Path, PathBuf};

use lava_syntax::Diagnostic;

use crate::config::{CompilerConfig, split_classpath};
use crate::library::{Library, SymbolCache, SymbolCacheWriter, open_classpath_entry};
use crate::session::Session;

use super::{CliError, CliResult, ExitCode};

// ============================================================================
// check
// ============================================================================

/// Compile `files` together and print every diagnostic.
///
/// Exits with `1` if any error was reported, even when the compile itself ran to the end.
pub fn check_files(files: &[PathBuf], config: CompilerConfig) -> CliResult<ExitCode> {
    let mut session = Session::new(config)?;
    for file in files {
        session.add_file(file)?;
    }
    let compiled = session.compile();
    print_diagnostics(&session);
    compiled?;

    let diagnostics = session.diagnostics();
    let errors = diagnostics.iter().filter(|d| d.severity.is_error()).count();
    let warnings = diagnostics.len() - errors;
    if session.has_error() {
        eprintln!("{errors} error(s), {warnings} warning(s)");
        return Ok(ExitCode::FAILURE);
    }
    let classes = session.units().len() + session.context().generated_classes().len();
    if warnings > 0 {
        eprintln!("{warnings} warning(s)");
    }
    println!("checked {} file(s), {classes} class(es)", files.len());
    Ok(ExitCode::SUCCESS)
}

fn print_diagnostics(session: &Session) {
    for diagnostic in session.diagnostics() {
        eprintln!("{}", render(session, &diagnostic));
    }
}

fn render(session: &Session, diagnostic: &Diagnostic) -> String {
    match session.source_of(&diagnostic.unit) {
        Some(file) => diagnostic.render(&file.name, &file.text),
        None => diagnostic.to_string(),
    }
}

// ============================================================================
// cache
// ============================================================================

/// Read every class of `classpath` and write them to a symbol cache at `output`.
pub fn cache_build(classpath: &str, output: &Path) -> CliResult<ExitCode> {
    let entries = split_classpath(classpath);
    if entries.is_empty() {
        return Err(CliError::failure("error: empty classpath"));
    }
    let mut writer = SymbolCacheWriter::new();
    for entry in &entries {
        let library = open_classpath_entry(entry)?;
        tracing::info!(library = library.name(), classes = library.content().len(), "adding library");
        writer.add_library(library.as_ref());
    }
    writer.write(output)?;
    println!("wrote {} class(es) to {}", writer.len(), output.display());
    Ok(ExitCode::SUCCESS)
}

/// Print the internal names stored in a symbol cache, sorted.
pub fn cache_list(file: &Path) -> CliResult<ExitCode> {
    let cache = SymbolCache::open(file)?;
    let mut names: Vec<&String> = cache.content().iter().collect();
    names.sort();
    for name in names {
        println!("{name}");
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_check_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Good.java");
        let bad = dir.path().join("Bad.java");
        fs::write(&good, "class Good { int f() { return 1; } }").unwrap();
        fs::write(&bad, "class Bad extends Nowhere {}").unwrap();

        let config = || CompilerConfig::new().with_classpath(vec![dir.path().to_path_buf()]);
        assert_eq!(check_files(&[good.clone()], config()).unwrap(), ExitCode::SUCCESS);
        assert_eq!(check_files(&[good, bad], config()).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn test_check_missing_file_is_an_error() {
        let err = check_files(&[PathBuf::from("/no/such/File.java")], CompilerConfig::new()).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
    }

    #[test]
    fn test_cache_build_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("empty.lsym");
        let classes = dir.path().join("classes");
        fs::create_dir(&classes).unwrap();
        let cp = classes.to_string_lossy().into_owned();
        assert_eq!(cache_build(&cp, &output).unwrap(), ExitCode::SUCCESS);
        assert_eq!(cache_list(&output).unwrap(), ExitCode::SUCCESS);
        assert!(cache_build("", &output).is_err());
    }
}
