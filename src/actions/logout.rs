//! `logout`: release the session. A no-op without one.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ActionError, HubAction};
use crate::session::{LogoutOutcome, SessionAdapter};

struct Logout {
    adapter: Arc<SessionAdapter>,
}

/// Bind the `logout` handler.
pub fn bind(adapter: Arc<SessionAdapter>) -> Box<dyn HubAction> {
    Box::new(Logout { adapter })
}

#[async_trait]
impl HubAction for Logout {
    async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, ActionError> {
        Ok(match self.adapter.logout().await? {
            LogoutOutcome::NoSession => serde_json::Value::Null,
            LogoutOutcome::LoggedOut => serde_json::Value::Bool(true),
        })
    }
}
