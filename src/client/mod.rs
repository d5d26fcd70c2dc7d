//! Messaging client collaborator surface.
//!
//! The session adapter never talks to a concrete messaging protocol. It
//! drives an opaque [`ClientSession`] built by a [`ClientFactory`] and
//! consumes the lifecycle events the session pushes through its
//! [`EventSender`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

pub mod mock;

/// Identity id reported before the client has authenticated.
pub const PLACEHOLDER_IDENTITY_ID: &str = "mockingUser";

/// Errors from the messaging client collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The session could not be constructed.
    #[error("failed to create client session: {0}")]
    Create(String),

    /// The session failed to start.
    #[error("client start failed: {0}")]
    Start(String),

    /// The session failed to log out.
    #[error("client logout failed: {0}")]
    Logout(String),

    /// The adapter side of the event channel is gone.
    #[error("event channel closed")]
    Disconnected,
}

/// The logged-in account as reported by the client's `login` event.
///
/// Replaced in full on every `login` event, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Account identifier.
    pub id: String,
    /// Any further profile fields the client reports.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    /// Identity with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// The identity cached before any `login` event arrives.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_IDENTITY_ID)
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Credentials the hub passes along with a `login` command.
///
/// Their shape is the client's concern; the adapter forwards them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginInfo {
    /// Hub-side user identifier.
    pub user_id: String,
    /// Opaque session token.
    pub token: String,
    /// Opaque client-specific resume blob.
    pub wx_data: String,
}

/// QR scan progress, decoded from the client's numeric status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Code 0: a QR code is waiting to be scanned.
    NeedScan,
    /// Code 1: scanned, waiting for confirmation on the phone.
    ScannedAwaitingConfirm,
    /// Code 2: confirmed on the phone; a `login` event follows.
    Confirmed,
    /// Code 3: the QR code expired.
    Expired,
    /// Code 4: the user cancelled on the phone.
    CancelledOnPhone,
    /// Any code outside the known set.
    Unknown(u8),
}

impl ScanStatus {
    /// Decode a wire status code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::NeedScan,
            1 => Self::ScannedAwaitingConfirm,
            2 => Self::Confirmed,
            3 => Self::Expired,
            4 => Self::CancelledOnPhone,
            other => Self::Unknown(other),
        }
    }

    /// The wire status code.
    pub fn code(self) -> u8 {
        match self {
            Self::NeedScan => 0,
            Self::ScannedAwaitingConfirm => 1,
            Self::Confirmed => 2,
            Self::Expired => 3,
            Self::CancelledOnPhone => 4,
            Self::Unknown(code) => code,
        }
    }
}

/// A raw lifecycle event emitted by a client session.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// QR scan progress.
    Scan {
        /// QR code URL.
        url: String,
        /// Scan status.
        status: ScanStatus,
    },
    /// The account finished logging in.
    Login(Identity),
    /// Contacts and rooms finished loading.
    Ready,
    /// The account logged out on the client side.
    Logout {
        /// Human-readable reason, if the client gave one.
        reason: Option<String>,
    },
    /// The client reported an error.
    Error(String),
    /// Periodic liveness signal.
    Heartbeat(serde_json::Value),
    /// Incoming friend request.
    Friendship {
        /// Requesting contact.
        from: String,
    },
    /// Incoming or outgoing chat message.
    Message {
        /// Sending contact or room.
        from: String,
        /// Message text.
        text: String,
    },
    /// Members joined a room.
    RoomJoin {
        /// Room identifier.
        room: String,
        /// Contacts that joined.
        invitees: Vec<String>,
    },
    /// A room topic changed.
    RoomTopic {
        /// Room identifier.
        room: String,
        /// New topic.
        new_topic: String,
        /// Previous topic.
        old_topic: String,
        /// Contact that made the change.
        changer: String,
    },
    /// Members left a room.
    RoomLeave {
        /// Room identifier.
        room: String,
        /// Contacts that left.
        leavers: Vec<String>,
    },
    /// The account was invited to a room.
    RoomInvite {
        /// Room identifier.
        room: String,
        /// Contacts that sent the invitation.
        inviters: Vec<String>,
    },
}

impl ClientEvent {
    /// Wire name of the event, used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan { .. } => "scan",
            Self::Login(_) => "login",
            Self::Ready => "ready",
            Self::Logout { .. } => "logout",
            Self::Error(_) => "error",
            Self::Heartbeat(_) => "heartbeat",
            Self::Friendship { .. } => "friendship",
            Self::Message { .. } => "message",
            Self::RoomJoin { .. } => "room-join",
            Self::RoomTopic { .. } => "room-topic",
            Self::RoomLeave { .. } => "room-leave",
            Self::RoomInvite { .. } => "room-invite",
        }
    }
}

/// A client event tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    /// Session that emitted the event.
    pub session_id: Uuid,
    /// The event itself.
    pub event: ClientEvent,
}

/// Sending half handed to a client session at construction.
///
/// Tags every event with the owning session id so the adapter can drop
/// events from sessions it has already torn down.
#[derive(Debug, Clone)]
pub struct EventSender {
    session_id: Uuid,
    tx: mpsc::Sender<SessionEvent>,
}

impl EventSender {
    /// Wrap a channel for the given session.
    pub fn new(session_id: Uuid, tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { session_id, tx }
    }

    /// Id of the session this sender belongs to.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Deliver an event to the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Disconnected`] if the adapter stopped listening.
    pub async fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.tx
            .send(SessionEvent {
                session_id: self.session_id,
                event,
            })
            .await
            .map_err(|_| ClientError::Disconnected)
    }
}

/// A connected messaging client.
#[async_trait]
pub trait ClientSession: Send + Sync {
    /// Begin the login flow. Lifecycle events follow through the session's
    /// [`EventSender`].
    async fn start(&self) -> Result<(), ClientError>;
    /// Log the account out and release the client.
    async fn logout(&self) -> Result<(), ClientError>;
    /// Whether the client currently reports an authenticated account.
    fn is_logged_in(&self) -> bool;
}

/// Builds client sessions on behalf of the adapter.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Construct a session for the given credentials. The session must emit
    /// its lifecycle events through `events`.
    async fn create(
        &self,
        login: &LoginInfo,
        events: EventSender,
    ) -> Result<Arc<dyn ClientSession>, ClientError>;
}
