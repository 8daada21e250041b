//! Compilation session: source files in, finished class skeletons out.
//!
//! A [`Session`] owns the [`GlobalContext`] and every compile unit. Sources are added first; [`Session::compile`]
//! then drives all pending units through the stages together, and [`Session::finish`] hands the skeletons to code
//! generation when nothing went wrong.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use lava_syntax::Diagnostic;

use crate::class::ClassNode;
use crate::config::CompilerConfig;
use crate::context::GlobalContext;
use crate::error::SessionError;
use crate::library::{SymbolCache, open_classpath_entry};
use crate::unit::{CompileUnit, SourceFile, run_pipeline};

pub struct Session {
    ctx: GlobalContext,
    config: CompilerConfig,
    files: Vec<Arc<SourceFile>>,
    /// Added but not compiled yet.
    pending: Vec<CompileUnit>,
    units: Vec<CompileUnit>,
}

impl Session {
    /// Open the libraries named by `config`: the symbol cache first, then the classpath in order.
    ///
    /// Classpath entries that do not exist are skipped, the way `javac` does.
    pub fn new(config: CompilerConfig) -> Result<Self, SessionError> {
        let mut ctx = GlobalContext::new();
        ctx.configure(&config);
        if let Some(path) = &config.symbol_cache {
            ctx.add_library(Arc::new(SymbolCache::open(path)?));
        }
        for entry in &config.classpath {
            if !entry.exists() {
                tracing::warn!(path = %entry.display(), "skipping missing classpath entry");
                continue;
            }
            ctx.add_library(open_classpath_entry(entry)?);
        }
        Ok(Self {
            ctx,
            config,
            files: Vec::new(),
            pending: Vec::new(),
            units: Vec::new(),
        })
    }

    pub fn context(&self) -> &GlobalContext {
        &self.ctx
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Queue a source text; `name` labels it in diagnostics.
    pub fn add_source(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let file = SourceFile::new(name.into(), text.into());
        self.files.push(Arc::clone(&file));
        self.pending.push(CompileUnit::new(file));
    }

    pub fn add_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let text = fs::read_to_string(path).map_err(|e| SessionError::io(path, e))?;
        self.add_source(path.display().to_string(), text);
        Ok(())
    }

    pub fn files(&self) -> &[Arc<SourceFile>] {
        &self.files
    }

    /// Run every pending unit through all stages.
    ///
    /// Fails only on a fatal session error; everything else ends up in [`Session::diagnostics`].
    #[tracing::instrument(level = "info", skip_all, fields(files = self.pending.len()))]
    pub fn compile(&mut self) -> Result<(), SessionError> {
        let pending = std::mem::take(&mut self.pending);
        let units = run_pipeline(pending, &self.ctx, self.config.threads)?;
        tracing::debug!(units = units.len(), errors = self.ctx.error_count(), "compiled");
        self.units.extend(units);
        Ok(())
    }

    pub fn units(&self) -> &[CompileUnit] {
        &self.units
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.ctx.diagnostics()
    }

    pub fn has_error(&self) -> bool {
        self.ctx.has_error()
    }

    /// Source a diagnostic's unit label refers to: a class of this session (or one generated inside it) or a file.
    pub fn source_of(&self, unit: &str) -> Option<&Arc<SourceFile>> {
        let outer = unit.split('$').next().unwrap_or(unit);
        self.units
            .iter()
            .find(|u| u.name() == unit)
            .or_else(|| self.units.iter().find(|u| u.name() == outer))
            .map(CompileUnit::file)
            .or_else(|| self.files.iter().find(|f| f.name == unit))
    }

    /// Finished skeletons of the compile units followed by the generated classes, or `None` if an error was reported.
    pub fn finish(self) -> Option<Vec<ClassNode>> {
        if self.ctx.has_error() {
            return None;
        }
        let generated = self.ctx.generated_classes();
        let mut out: Vec<ClassNode> = self.units.into_iter().map(CompileUnit::finish).collect();
        out.extend(generated.into_iter().map(Arc::unwrap_or_clone));
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_syntax::diagnostics::codes;

    #[test]
    fn test_finish_returns_units_and_generated_classes() {
        let mut session = Session::new(CompilerConfig::default()).unwrap();
        session.add_source(
            "A.java",
            "package p; public class A { Runnable r = new Runnable() { public void run() {} }; static class In {} }",
        );
        session.compile().unwrap();
        assert!(!session.has_error(), "{:?}", session.diagnostics());
        let names: Vec<String> = session.finish().unwrap().into_iter().map(|n| n.name).collect();
        assert_eq!(names, ["p/A", "p/A$In", "p/A$1"]);
    }

    #[test]
    fn test_finish_withheld_on_error() {
        let mut session = Session::new(CompilerConfig::default()).unwrap();
        session.add_source("B.java", "class B extends Missing {}");
        session.compile().unwrap();
        assert!(session.has_error());
        assert_eq!(session.diagnostics()[0].code, codes::CLASS_PARENT_UNRESOLVED);
        assert!(session.source_of("B").is_some());
        assert!(session.finish().is_none());
    }

    #[test]
    fn test_duplicate_unit_is_fatal() {
        let mut session = Session::new(CompilerConfig::default()).unwrap();
        session.add_source("A1.java", "package p; class A {}");
        session.add_source("A2.java", "package p; class A {}");
        let err = session.compile().unwrap_err();
        assert!(matches!(err, SessionError::DuplicateUnit { .. }));
        assert_eq!(session.diagnostics()[0].code, codes::CLASS_DUPLICATE_UNIT);
    }

    #[test]
    fn test_missing_classpath_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = CompilerConfig::default().with_classpath(vec![dir.path().join("nope"), dir.path().to_path_buf()]);
        let session = Session::new(config).unwrap();
        assert_eq!(session.context().libraries().len(), 1);
    }

    #[test]
    fn test_add_file_reports_io_errors() {
        let mut session = Session::new(CompilerConfig::default()).unwrap();
        let err = session.add_file(Path::new("/definitely/not/here.java")).unwrap_err();
        assert!(matches!(err, SessionError::Io { .. }));
    }
}
