//! `resendLoginStatus`: re-send `LOGIN_DONE` after a hub reconnect.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ActionError, HubAction};
use crate::session::SessionAdapter;

struct ResendLoginStatus {
    adapter: Arc<SessionAdapter>,
}

/// Bind the `resendLoginStatus` handler.
pub fn bind(adapter: Arc<SessionAdapter>) -> Box<dyn HubAction> {
    Box::new(ResendLoginStatus { adapter })
}

#[async_trait]
impl HubAction for ResendLoginStatus {
    async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, ActionError> {
        let sent = self.adapter.resend_login_status().await;
        Ok(serde_json::Value::Bool(sent))
    }
}
