//! Coverage for config file loading.

use std::fs;

use chatlink::config::Config;
use chatlink::session::CancelPolicy;

#[test]
fn missing_file_yields_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let config = match Config::load_from(&tmp.path().join("absent.toml")) {
        Ok(config) => config,
        Err(err) => panic!("missing config should fall back to defaults: {err}"),
    };
    assert_eq!(config.hub.client_type, "wechat");
    assert_eq!(config.session.cancel_policy, CancelPolicy::KeepWaiting);
}

#[test]
fn full_file_is_loaded() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    fs::write(
        &path,
        r#"
[hub]
client_id = "hub-client-9"
client_type = "padchat"
channel_buffer_size = 16

[session]
cancel_policy = "abandon"
drain_timeout_secs = 2

[mock]
step_delay_ms = 10
qr_base_url = "https://qr.example"

[logging]
level = "debug"
logs_dir = "/tmp/chatlink-logs"
"#,
    )
    .expect("should write config");

    let config = match Config::load_from(&path) {
        Ok(config) => config,
        Err(err) => panic!("config should load: {err}"),
    };
    assert_eq!(config.hub.client_id, "hub-client-9");
    assert_eq!(config.hub.client_type, "padchat");
    assert_eq!(config.hub.channel_buffer_size, 16);
    assert_eq!(config.session.cancel_policy, CancelPolicy::Abandon);
    assert_eq!(config.session.drain_timeout_secs, 2);
    assert_eq!(config.mock.step_delay_ms, 10);
    assert_eq!(config.mock.qr_base_url, "https://qr.example");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.logs_dir.as_deref(),
        Some(std::path::Path::new("/tmp/chatlink-logs"))
    );
}

#[test]
fn malformed_file_reports_path() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    fs::write(&path, "[hub\nclient_id = ").expect("should write config");

    let err = match Config::load_from(&path) {
        Ok(_) => panic!("malformed config should fail"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("config.toml"));
}
