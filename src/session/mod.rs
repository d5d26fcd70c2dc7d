//! Session adapter: owns at most one client session and keeps the hub in
//! step with its lifecycle.
//!
//! All mutable state lives behind one async mutex. Handle creation runs
//! entirely under that lock, so two concurrent `login` calls can never both
//! observe "no session" and build two clients. Hub notifications are sent
//! after the lock is released.
//!
//! `LOGIN_DONE` is sent from three places: a `login` event, a duplicate
//! `login` command while a session exists, and [`SessionAdapter::resend_login_status`].
//! Duplicates are expected and the hub treats them as no-ops.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{
    ClientError, ClientEvent, ClientFactory, ClientSession, EventSender, Identity, LoginInfo,
    SessionEvent,
};
use crate::hub::{HubEvent, HubEventSink};

pub mod translate;

use self::translate::{translate, Effect};

/// Client event channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors from adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The client collaborator failed; passed through unchanged.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A fatal client event already ended this adapter.
    #[error("session terminated: {0}")]
    Terminated(Termination),
}

/// Where the login flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    None,
    /// Session created, QR code waiting to be scanned.
    AwaitingScan,
    /// Scanned, waiting for confirmation on the phone.
    ScanConfirmedPendingPhone,
    /// Logged in.
    Authenticated,
    /// Logged out by the client. Transient: the adapter resets to `None`.
    LoggedOut,
    /// The QR code expired. Terminal.
    ScanExpired,
    /// Cancelled on the phone; the session keeps waiting for a new scan.
    ScanCancelled,
}

/// What to do when the user cancels a login on the phone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Keep the session and wait for another scan.
    #[default]
    KeepWaiting,
    /// Log the session out; the hub must send a fresh `login`.
    Abandon,
}

impl FromStr for CancelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_waiting" | "keep-waiting" => Ok(Self::KeepWaiting),
            "abandon" => Ok(Self::Abandon),
            other => Err(format!("unknown cancel policy: {other}")),
        }
    }
}

/// Why the adapter ended for good. Published once on the termination channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The QR code expired before anyone scanned it.
    ScanExpired,
    /// The client logged out.
    LoggedOut {
        /// Reason forwarded to the hub.
        reason: String,
    },
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScanExpired => write!(f, "login QR code expired"),
            Self::LoggedOut { reason } => write!(f, "logged out: {reason}"),
        }
    }
}

/// Result of a `login` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A new session was created and started.
    Started,
    /// A session already existed; `LOGIN_DONE` was re-sent instead.
    AlreadyActive,
}

/// Result of a `logout` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// There was no session; nothing happened.
    NoSession,
    /// The session was logged out and released.
    LoggedOut,
}

struct Inner {
    handle: Option<Arc<dyn ClientSession>>,
    session_id: Option<Uuid>,
    state: SessionState,
    identity: Identity,
    terminated: Option<Termination>,
}

/// Bridges one messaging client session to the hub.
pub struct SessionAdapter {
    inner: Mutex<Inner>,
    factory: Arc<dyn ClientFactory>,
    sink: Arc<dyn HubEventSink>,
    cancel_policy: CancelPolicy,
    events_tx: mpsc::Sender<SessionEvent>,
    termination_tx: watch::Sender<Option<Termination>>,
}

impl std::fmt::Debug for SessionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAdapter")
            .field("cancel_policy", &self.cancel_policy)
            .finish_non_exhaustive()
    }
}

impl SessionAdapter {
    /// Create an adapter with no session.
    ///
    /// Returns the receiving end of the client event channel; feed it to
    /// [`spawn_event_pump`] (or call [`handle_event`](Self::handle_event)
    /// directly).
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        sink: Arc<dyn HubEventSink>,
        cancel_policy: CancelPolicy,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (termination_tx, _) = watch::channel(None);
        let adapter = Self {
            inner: Mutex::new(Inner {
                handle: None,
                session_id: None,
                state: SessionState::None,
                identity: Identity::placeholder(),
                terminated: None,
            }),
            factory,
            sink,
            cancel_policy,
            events_tx,
            termination_tx,
        };
        (adapter, events_rx)
    }

    /// Start a session, or re-announce the existing one.
    ///
    /// With a session already present no client is created; `LOGIN_DONE` is
    /// re-sent with the cached identity. Otherwise a client is built and
    /// started, and its `start()` failure is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Client`] if the client cannot be created or
    /// started, and [`SessionError::Terminated`] after a fatal event.
    pub async fn login(&self, login: LoginInfo) -> Result<LoginOutcome, SessionError> {
        let mut inner = self.inner.lock().await;
        if let Some(termination) = &inner.terminated {
            return Err(SessionError::Terminated(termination.clone()));
        }

        if inner.handle.is_some() {
            let identity = inner.identity.clone();
            drop(inner);
            info!(user_id = %login.user_id, "login requested with live session, resending status");
            self.notify_login_done(&identity).await;
            return Ok(LoginOutcome::AlreadyActive);
        }

        let session_id = Uuid::new_v4();
        let sender = EventSender::new(session_id, self.events_tx.clone());
        let session = self.factory.create(&login, sender).await?;
        inner.handle = Some(Arc::clone(&session));
        inner.session_id = Some(session_id);
        inner.state = SessionState::AwaitingScan;
        drop(inner);

        info!(%session_id, user_id = %login.user_id, "client session created, starting");
        session.start().await?;
        Ok(LoginOutcome::Started)
    }

    /// Log the session out.
    ///
    /// The handle is detached under the lock before the client is told to
    /// log out; a concurrent `login` sees no session. The handle is gone
    /// whether or not the client's logout succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Client`] if the client's logout fails. The
    /// adapter has already dropped the session by then.
    pub async fn logout(&self) -> Result<LogoutOutcome, SessionError> {
        let (session, session_id) = {
            let mut inner = self.inner.lock().await;
            let Some(session) = inner.handle.take() else {
                debug!("logout requested without a session");
                return Ok(LogoutOutcome::NoSession);
            };
            let session_id = inner.session_id.take().unwrap_or_else(Uuid::nil);
            inner.state = SessionState::None;
            (session, session_id)
        };

        let result = session.logout().await;

        match result {
            Ok(()) => {
                info!(%session_id, "client session logged out");
                Ok(LogoutOutcome::LoggedOut)
            }
            Err(e) => {
                warn!(%session_id, error = %e, "client logout failed, session released anyway");
                Err(e.into())
            }
        }
    }

    /// Re-send `LOGIN_DONE` for the current session, if there is one.
    ///
    /// Used when the hub transport reconnects. Returns whether anything was
    /// sent. Session state is untouched.
    pub async fn resend_login_status(&self) -> bool {
        let identity = {
            let inner = self.inner.lock().await;
            if inner.handle.is_none() {
                return false;
            }
            inner.identity.clone()
        };
        self.notify_login_done(&identity).await;
        true
    }

    /// Whether a session exists and the client reports it as logged in.
    pub async fn is_authenticated(&self) -> bool {
        let inner = self.inner.lock().await;
        inner
            .handle
            .as_ref()
            .is_some_and(|session| session.is_logged_in())
    }

    /// Current login flow state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Cached identity.
    pub async fn identity(&self) -> Identity {
        self.inner.lock().await.identity.clone()
    }

    /// Whether a session handle exists.
    pub async fn has_session(&self) -> bool {
        self.inner.lock().await.handle.is_some()
    }

    /// Why the adapter ended, if it has.
    pub async fn termination(&self) -> Option<Termination> {
        self.inner.lock().await.terminated.clone()
    }

    /// Watch for the one-time termination signal.
    pub fn subscribe_termination(&self) -> watch::Receiver<Option<Termination>> {
        self.termination_tx.subscribe()
    }

    /// Apply one client event.
    ///
    /// Events from sessions other than the current one, and every event
    /// after termination, are dropped.
    pub async fn handle_event(&self, event: SessionEvent) {
        let SessionEvent { session_id, event } = event;
        debug!(%session_id, event = event.name(), "client event");

        let translation = translate(&event, self.cancel_policy);
        let sync_contacts = translation.effect == Effect::SyncContacts;

        let mut login_done = None;
        let mut abandoned = None;
        let mut terminated = None;
        {
            let mut inner = self.inner.lock().await;
            if inner.terminated.is_some() {
                debug!(%session_id, event = event.name(), "adapter terminated, event dropped");
                return;
            }
            if inner.session_id != Some(session_id) {
                debug!(%session_id, event = event.name(), "event from stale session dropped");
                return;
            }

            if let Some(next) = translation.next_state {
                if next != inner.state {
                    debug!(from = ?inner.state, to = ?next, "session state change");
                }
                inner.state = next;
            }

            match translation.effect {
                Effect::None | Effect::SyncContacts => {}
                Effect::AdoptIdentity(identity) => {
                    info!(%session_id, user = %identity.id, "client logged in");
                    inner.identity = identity;
                    login_done = Some(inner.identity.clone());
                }
                Effect::Abandon => {
                    inner.session_id = None;
                    abandoned = inner.handle.take();
                }
                Effect::Terminate(termination) => {
                    inner.handle = None;
                    inner.session_id = None;
                    if inner.state == SessionState::LoggedOut {
                        inner.state = SessionState::None;
                    }
                    inner.terminated = Some(termination.clone());
                    terminated = Some(termination);
                }
            }
        }

        log_passthrough(&event);

        if let Some(hub_event) = translation.hub_event {
            self.sink.send(hub_event).await;
        }
        if let Some(identity) = login_done {
            self.notify_login_done(&identity).await;
        }
        if sync_contacts {
            info!(%session_id, "client ready, syncing contacts");
            self.sink.sync_contacts().await;
        }
        if let Some(session) = abandoned {
            info!(%session_id, "login cancelled on phone, abandoning session");
            if let Err(e) = session.logout().await {
                warn!(%session_id, error = %e, "logout of abandoned session failed");
            }
        }
        if let Some(termination) = terminated {
            warn!(%session_id, reason = %termination, "session terminated");
            self.termination_tx.send_replace(Some(termination));
        }
    }

    async fn notify_login_done(&self, identity: &Identity) {
        debug!(user = %identity.id, "notifying hub of login");
        self.sink
            .send(HubEvent::LoginDone {
                user_name: identity.id.clone(),
            })
            .await;
    }
}

fn log_passthrough(event: &ClientEvent) {
    match event {
        ClientEvent::Error(message) => warn!(error = %message, "client error"),
        ClientEvent::Heartbeat(data) => debug!(?data, "client heartbeat"),
        ClientEvent::Friendship { from } => debug!(from = %from, "friend request"),
        ClientEvent::Message { from, .. } => debug!(from = %from, "message received"),
        ClientEvent::RoomJoin { room, invitees } => {
            debug!(room = %room, ?invitees, "room join");
        }
        ClientEvent::RoomTopic {
            room,
            new_topic,
            old_topic,
            changer,
        } => debug!(
            room = %room,
            new_topic = %new_topic,
            old_topic = %old_topic,
            changer = %changer,
            "room topic"
        ),
        ClientEvent::RoomLeave { room, leavers } => debug!(room = %room, ?leavers, "room leave"),
        ClientEvent::RoomInvite { room, inviters } => {
            debug!(room = %room, ?inviters, "room invite");
        }
        ClientEvent::Scan { .. }
        | ClientEvent::Login(_)
        | ClientEvent::Ready
        | ClientEvent::Logout { .. } => {}
    }
}

/// Drive `adapter` from its client event channel.
///
/// Runs until the adapter terminates or every event sender is gone.
pub fn spawn_event_pump(
    adapter: Arc<SessionAdapter>,
    mut events_rx: mpsc::Receiver<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            adapter.handle_event(event).await;
            if adapter.termination().await.is_some() {
                info!("adapter terminated, event pump stopping");
                return;
            }
        }
        debug!("client event channel closed");
    })
}
