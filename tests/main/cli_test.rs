//! CLI contract tests.

use std::fs;
use std::path::PathBuf;

fn main_source() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/main.rs");
    match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => panic!("main source should load from {}: {err}", path.display()),
    }
}

#[test]
fn main_defines_primary_subcommands() {
    let source = main_source();
    assert!(source.contains("Start"));
    assert!(source.contains("CheckConfig"));
}

#[test]
fn main_builds_registry_from_manifest() {
    let source = main_source();
    assert!(source.contains("ActionRegistry::from_manifest"));
    assert!(source.contains("spawn_event_pump"));
    assert!(source.contains("subscribe_termination"));
}

#[test]
fn main_routes_stdout_through_one_sink() {
    let source = main_source();
    assert!(source.contains("StdoutSink::stdout"));
    assert!(source.contains("wire::handle_line"));
    assert!(!source.contains("println!(\"{line}\")"));
}
