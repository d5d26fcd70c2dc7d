//! `login`: start a session, or re-announce the live one.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{ActionError, HubAction};
use crate::client::LoginInfo;
use crate::session::{LoginOutcome, SessionAdapter};

struct Login {
    adapter: Arc<SessionAdapter>,
}

/// Bind the `login` handler.
pub fn bind(adapter: Arc<SessionAdapter>) -> Box<dyn HubAction> {
    Box::new(Login { adapter })
}

#[async_trait]
impl HubAction for Login {
    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, ActionError> {
        // `null` args mean "no credentials", not a decode error.
        let info = if args.is_null() {
            LoginInfo::default()
        } else {
            serde_json::from_value(args).map_err(|source| ActionError::InvalidArgs {
                action: "login",
                source,
            })?
        };
        let outcome = self.adapter.login(info).await?;
        Ok(match outcome {
            LoginOutcome::Started => json!("started"),
            LoginOutcome::AlreadyActive => json!("already_active"),
        })
    }
}
