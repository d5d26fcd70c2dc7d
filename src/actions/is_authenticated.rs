//! `isAuthenticated`: whether a logged-in session exists.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ActionError, HubAction};
use crate::session::SessionAdapter;

struct IsAuthenticated {
    adapter: Arc<SessionAdapter>,
}

/// Bind the `isAuthenticated` handler.
pub fn bind(adapter: Arc<SessionAdapter>) -> Box<dyn HubAction> {
    Box::new(IsAuthenticated { adapter })
}

#[async_trait]
impl HubAction for IsAuthenticated {
    async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, ActionError> {
        Ok(serde_json::Value::Bool(self.adapter.is_authenticated().await))
    }
}
