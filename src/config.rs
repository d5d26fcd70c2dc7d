//! Configuration loading.
//!
//! Loads `config.toml` from `$CHATLINK_CONFIG_PATH` or `~/.chatlink/`.
//! A missing file yields defaults. Environment variables override file
//! values.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::hub::ClientInfo;
use crate::session::CancelPolicy;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CHATLINK_CONFIG_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hub identity and transport settings.
    pub hub: HubConfig,
    /// Session policy.
    pub session: SessionConfig,
    /// Scripted client settings.
    pub mock: MockConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Hub identity and transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Hub-assigned client id.
    pub client_id: String,
    /// Client type reported to the hub.
    pub client_type: String,
    /// Outbound event queue capacity.
    pub channel_buffer_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_type: default_client_type(),
            channel_buffer_size: 64,
        }
    }
}

impl HubConfig {
    /// Client identity stamped on every hub envelope.
    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            client_id: self.client_id.clone(),
            client_type: self.client_type.clone(),
        }
    }
}

/// Session policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// What to do when a login is cancelled on the phone.
    pub cancel_policy: CancelPolicy,
    /// How long to wait for queued hub events before exiting after a fatal
    /// session event.
    pub drain_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cancel_policy: CancelPolicy::default(),
            drain_timeout_secs: 5,
        }
    }
}

/// Scripted client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Delay between scripted scan steps in milliseconds.
    pub step_delay_ms: u64,
    /// Base url for generated QR codes.
    pub qr_base_url: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 1500,
            qr_base_url: "https://login.chatlink.invalid/qr".to_owned(),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs. Stderr only when unset.
    pub logs_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            logs_dir: None,
        }
    }
}

fn default_client_id() -> String {
    "chatlink".to_owned()
}

fn default_client_type() -> String {
    "wechat".to_owned()
}

impl Config {
    /// Load from the default location with env overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path_with(|key| std::env::var(key).ok())?;
        Self::load_from(&path)
    }

    /// Load from `path` with env overrides applied. A missing file yields
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to read config at {}: {e}",
                    path.display()
                ))
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML document without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply env overrides through a resolver, so tests avoid `set_var`.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CHATLINK_CLIENT_ID") {
            self.hub.client_id = v;
        }
        if let Some(v) = env("CHATLINK_CLIENT_TYPE") {
            self.hub.client_type = v;
        }
        if let Some(v) = env("CHATLINK_CANCEL_POLICY") {
            match v.parse() {
                Ok(policy) => self.session.cancel_policy = policy,
                Err(e) => tracing::warn!(
                    var = "CHATLINK_CANCEL_POLICY",
                    value = %v,
                    error = %e,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("CHATLINK_LOG_LEVEL") {
            self.logging.level = v;
        }
    }
}

/// Resolve the config file path using a custom env resolver.
///
/// # Errors
///
/// Returns an error if no env override is set and the home directory
/// cannot be determined.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// Resolve the default config directory (`~/.chatlink/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".chatlink"))
}
