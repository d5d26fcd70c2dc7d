//! Line protocol for hub commands.
//!
//! One JSON command per line in, one [`CommandReply`] per command out.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ActionRegistry;

/// One hub command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HubCommand {
    /// Registered action name.
    pub action: String,
    /// Action arguments; `null` when omitted.
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Outcome of one hub command.
///
/// Exactly one of `result` and `error` is present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReply {
    /// Echo of the command's action; empty when the line did not decode.
    pub action: String,
    /// Whether the command succeeded.
    pub ok: bool,
    /// Handler result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandReply {
    fn success(action: String, result: serde_json::Value) -> Self {
        Self {
            action,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(action: String, error: String) -> Self {
        Self {
            action,
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}

/// Decode one line and dispatch it through `registry`.
///
/// Never fails: decode and handler errors become `ok: false` replies.
pub async fn handle_line(registry: &ActionRegistry, line: &str) -> CommandReply {
    let command: HubCommand = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "malformed hub command");
            return CommandReply::failure(String::new(), format!("malformed command: {e}"));
        }
    };
    handle_command(registry, command).await
}

/// Dispatch an already decoded command.
pub async fn handle_command(registry: &ActionRegistry, command: HubCommand) -> CommandReply {
    debug!(action = %command.action, "hub command received");
    match registry.dispatch(&command.action, command.args).await {
        Ok(result) => CommandReply::success(command.action, result),
        Err(e) => {
            warn!(action = %command.action, error = %e, "hub command failed");
            CommandReply::failure(command.action, e.to_string())
        }
    }
}
