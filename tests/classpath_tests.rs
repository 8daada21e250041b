//! Classpath and symbol-cache round trips through the filesystem

use std::fs;

use lava::class::{ClassOrigin, Constant};
use lava::library::{Library, SymbolCache, SymbolCacheWriter};
use lava::{CompilerConfig, Session, SessionError};
use lava_syntax::diagnostics::codes;

/// Compile `text` and return its finished classes.
fn build_library(text: &str) -> Vec<lava::class::ClassNode> {
    let mut session = Session::new(CompilerConfig::default()).unwrap();
    session.add_source("Base.java", text);
    session.compile().unwrap();
    assert!(!session.has_error(), "{:?}", session.diagnostics());
    session.finish().unwrap()
}

#[test]
fn test_compiled_classes_serve_as_a_symbol_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.lsym");
    let classes = build_library(
        "package lib; public class Base { public static final int K = 5; public static class Inner {} }",
    );
    let mut writer = SymbolCacheWriter::new();
    for class in &classes {
        writer.add(class);
    }
    assert_eq!(writer.len(), 2);
    writer.write(&path).unwrap();

    let cache = SymbolCache::open(&path).unwrap();
    assert!(cache.content().contains("lib/Base"));
    assert!(cache.content().contains("lib/Base$Inner"));

    let mut session = Session::new(CompilerConfig::default().with_symbol_cache(&path)).unwrap();
    session.add_source(
        "U.java",
        "import lib.Base; class U extends Base { static final int TWICE = Base.K * 2; }",
    );
    session.compile().unwrap();
    assert!(!session.has_error(), "{:?}", session.diagnostics());
    let base = session.context().get_class_info("lib/Base").unwrap();
    assert_eq!(base.origin, ClassOrigin::Library);
    assert_eq!(session.units()[0].node().fields[0].constant, Some(Constant::Int(10)));
}

#[test]
fn test_classes_outside_the_cache_stay_unresolved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.lsym");
    SymbolCacheWriter::new().write(&path).unwrap();

    let mut session = Session::new(CompilerConfig::default().with_symbol_cache(&path)).unwrap();
    session.add_source("V.java", "class V extends lib.Base {}");
    session.compile().unwrap();
    let codes: Vec<&str> = session.diagnostics().iter().map(|d| d.code).collect();
    assert_eq!(codes, [codes::CLASS_PARENT_UNRESOLVED]);
}

#[test]
fn test_corrupt_cache_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.lsym");
    fs::write(&path, b"not a cache").unwrap();
    let err = Session::new(CompilerConfig::default().with_symbol_cache(&path)).err().unwrap();
    assert!(matches!(err, SessionError::CorruptSymbolCache { .. }));
}

#[test]
fn test_empty_directory_on_the_classpath() {
    let dir = tempfile::tempdir().unwrap();
    let config = CompilerConfig::default().with_classpath(vec![dir.path().to_path_buf()]);
    let mut session = Session::new(config).unwrap();
    session.add_source("W.java", "class W { java.util.List<String> names; }");
    session.compile().unwrap();
    assert!(!session.has_error(), "{:?}", session.diagnostics());
}
