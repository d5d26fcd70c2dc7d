//! Hub-facing event surface.
//!
//! The hub only understands three lifecycle events. Each is wrapped in a
//! [`HubEnvelope`] carrying the configured client id and type before it
//! leaves the process. Delivery is fire-and-forget: a sink never reports
//! failure back to the adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

pub mod sink;

/// `LOGIN_SCAN` url sentinel: scanned, confirm on the phone.
pub const CONFIRM_ON_PHONE: &str = "CONFIRM_ON_PHONE";

/// `LOGIN_SCAN` url sentinel: login cancelled on the phone.
pub const CANCEL_ON_PHONE: &str = "CANCEL_ON_PHONE";

/// Normalized lifecycle event understood by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    /// QR scan progress: a url to show, or one of the sentinels.
    LoginScan {
        /// QR url or sentinel.
        url: String,
        /// Wire scan status code.
        status: u8,
    },
    /// The account is logged in. Safe to deliver any number of times.
    LoginDone {
        /// Id of the logged-in account.
        user_name: String,
    },
    /// The session is over.
    LogoutDone {
        /// Human-readable reason; `None` sends an empty object.
        reason: Option<String>,
    },
}

impl HubEvent {
    /// Event name on the hub wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginScan { .. } => "LOGIN_SCAN",
            Self::LoginDone { .. } => "LOGIN_DONE",
            Self::LogoutDone { .. } => "LOGOUT_DONE",
        }
    }

    /// Event payload on the hub wire.
    pub fn body(&self) -> serde_json::Value {
        match self {
            Self::LoginScan { url, status } => json!({ "url": url, "status": status }),
            Self::LoginDone { user_name } => json!({ "userName": user_name }),
            Self::LogoutDone { reason: Some(reason) } => json!(reason),
            Self::LogoutDone { reason: None } => json!({}),
        }
    }
}

/// Which client this process speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Hub-assigned client id.
    pub client_id: String,
    /// Client type, e.g. `wechat`.
    pub client_type: String,
}

/// A hub event ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubEnvelope {
    /// Hub-assigned client id.
    pub client_id: String,
    /// Client type.
    pub client_type: String,
    /// Event name.
    pub event: String,
    /// Event payload.
    pub body: serde_json::Value,
    /// When the adapter emitted the event.
    pub sent_at: DateTime<Utc>,
}

impl HubEnvelope {
    /// Wrap `event` for `client`, stamped now.
    pub fn new(client: &ClientInfo, event: &HubEvent) -> Self {
        Self {
            client_id: client.client_id.clone(),
            client_type: client.client_type.clone(),
            event: event.name().to_owned(),
            body: event.body(),
            sent_at: Utc::now(),
        }
    }
}

/// Destination for hub events.
#[async_trait]
pub trait HubEventSink: Send + Sync {
    /// Deliver an event. Never fails from the caller's point of view.
    async fn send(&self, event: HubEvent);

    /// Push the contact and room lists to the hub after the client is ready.
    async fn sync_contacts(&self) {
        tracing::debug!("contact sync not supported by this sink");
    }
}
