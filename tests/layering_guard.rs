//! Layering guardrails for the shared crates.
//!
//! `lava_core` is the dependency-free vocabulary crate and `lava_syntax` may only build on `lava_core` plus the
//! ambient error/logging crates. These tests scan the manifests and fail if a layer reaches upward.

/// Names listed in the `[dependencies]` table of `manifest`.
fn dependencies(manifest: &str) -> Vec<String> {
    let mut in_dependencies = false;
    let mut names = Vec::new();

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Strip inline comments for robustness.
        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if let Some((name, _)) = line_no_comment.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[test]
fn core_has_no_dependencies() {
    let deps = dependencies(include_str!("../crates/lava_core/Cargo.toml"));
    assert!(deps.is_empty(), "`lava_core` must stay dependency-free, found {deps:?}");
}

#[test]
fn syntax_does_not_depend_on_the_compiler() {
    let deps = dependencies(include_str!("../crates/lava_syntax/Cargo.toml"));
    assert!(deps.iter().any(|d| d == "lava_core"));
    for dep in &deps {
        assert!(
            ["lava_core", "thiserror", "miette", "tracing"].contains(&dep.as_str()),
            "`lava_syntax` must not depend on `{dep}`"
        );
    }
}
