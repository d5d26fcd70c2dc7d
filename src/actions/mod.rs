//! Hub command surface.
//!
//! Commands the hub can invoke are listed in a fixed [`MANIFEST`]. Each
//! entry names a factory that binds a handler to the adapter; the registry
//! is built once at startup and never changes afterwards. [`wire`] decodes
//! command lines and shapes the replies.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::session::{SessionAdapter, SessionError};

pub mod is_authenticated;
pub mod login;
pub mod logout;
pub mod resend_login_status;
pub mod wire;

/// Errors from hub command dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// No handler is registered under this name.
    #[error("unknown action: {0}")]
    Unknown(String),

    /// The command arguments did not match the handler's shape.
    #[error("invalid arguments for {action}: {source}")]
    InvalidArgs {
        /// Action name.
        action: &'static str,
        /// Decode failure.
        source: serde_json::Error,
    },

    /// The adapter rejected the command.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A hub command handler bound to an adapter.
#[async_trait]
pub trait HubAction: Send + Sync {
    /// Run the command with its JSON arguments and return a JSON result.
    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, ActionError>;
}

/// Binds a handler to the adapter it operates on.
pub type ActionFactory = fn(Arc<SessionAdapter>) -> Box<dyn HubAction>;

/// Every command the hub may send, by wire name.
pub const MANIFEST: &[(&str, ActionFactory)] = &[
    ("login", login::bind as ActionFactory),
    ("logout", logout::bind as ActionFactory),
    ("resendLoginStatus", resend_login_status::bind as ActionFactory),
    ("tryToSendLoginInfoToHub", resend_login_status::bind as ActionFactory),
    ("isAuthenticated", is_authenticated::bind as ActionFactory),
];

/// Read-only table of bound command handlers.
pub struct ActionRegistry {
    actions: HashMap<&'static str, Box<dyn HubAction>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

impl ActionRegistry {
    /// Bind every [`MANIFEST`] entry to `adapter`.
    pub fn from_manifest(adapter: Arc<SessionAdapter>) -> Self {
        Self::from_entries(adapter, MANIFEST)
    }

    /// Bind an explicit list of entries to `adapter`. Later duplicates win.
    pub fn from_entries(
        adapter: Arc<SessionAdapter>,
        entries: &[(&'static str, ActionFactory)],
    ) -> Self {
        let mut actions = HashMap::with_capacity(entries.len());
        for (name, factory) in entries {
            if actions.insert(*name, factory(Arc::clone(&adapter))).is_some() {
                warn!(action = *name, "duplicate action registration, keeping the last one");
            }
        }
        debug!(count = actions.len(), "hub actions registered");
        Self { actions }
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.actions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Run the command registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unknown`] for unregistered names, otherwise
    /// whatever the handler returns.
    pub async fn dispatch(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ActionError> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| ActionError::Unknown(name.to_owned()))?;
        debug!(action = name, "dispatching hub action");
        action.invoke(args).await
    }
}
