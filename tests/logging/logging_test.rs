//! Tests for `src/logging.rs`.

use chatlink::config::LoggingConfig;
use chatlink::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // The global subscriber can only be installed once per process, so the
    // result is ignored; the directory is created either way.
    let _result = chatlink::logging::init_production(&logs_dir, "info");
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_tolerates_existing_subscriber() {
    chatlink::logging::init_cli("debug");
    chatlink::logging::init_cli("debug");
}

#[test]
fn init_without_logs_dir_needs_no_guard() {
    let config = LoggingConfig {
        level: "warn".to_owned(),
        logs_dir: None,
    };
    let guard = chatlink::logging::init(&config).expect("stderr logging");
    assert!(guard.is_none());
}
