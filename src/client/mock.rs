//! Scripted in-process messaging client.
//!
//! Plays a fixed sequence of lifecycle events after `start()`, which is
//! enough to drive the full login flow without a real messaging protocol.
//! The binary uses it as its client; tests use it to inject failures and
//! count lifecycle calls.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    ClientError, ClientEvent, ClientFactory, ClientSession, EventSender, Identity, LoginInfo,
    ScanStatus,
};

/// One scripted step.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Emit a `scan` event with the session's QR url.
    Scan(ScanStatus),
    /// Mark the session logged in and emit a `login` event whose identity is
    /// the hub `userId` (or the placeholder when it is empty).
    Login,
    /// Emit an arbitrary event.
    Event(ClientEvent),
}

/// Ordered steps, each played after its delay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockScript {
    steps: Vec<(Duration, MockStep)>,
}

impl MockScript {
    /// An empty script: the session starts and stays silent.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Append a step played `delay` after the previous one.
    #[must_use]
    pub fn then(mut self, delay: Duration, step: MockStep) -> Self {
        self.steps.push((delay, step));
        self
    }

    /// The happy path: need-scan, scanned, confirmed, login, ready.
    pub fn standard(step_delay: Duration) -> Self {
        Self::silent()
            .then(Duration::ZERO, MockStep::Scan(ScanStatus::NeedScan))
            .then(step_delay, MockStep::Scan(ScanStatus::ScannedAwaitingConfirm))
            .then(step_delay, MockStep::Scan(ScanStatus::Confirmed))
            .then(Duration::ZERO, MockStep::Login)
            .then(Duration::ZERO, MockStep::Event(ClientEvent::Ready))
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Lifecycle call counters shared by a factory and its sessions.
#[derive(Debug, Default)]
pub struct MockStats {
    created: AtomicUsize,
    started: AtomicUsize,
    logged_out: AtomicUsize,
}

impl MockStats {
    /// Sessions constructed.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// `start()` calls.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// `logout()` calls.
    pub fn logged_out(&self) -> usize {
        self.logged_out.load(Ordering::SeqCst)
    }
}

/// Builds [`MockClient`] sessions.
#[derive(Debug)]
pub struct MockFactory {
    script: MockScript,
    qr_base_url: String,
    fail_create: Option<String>,
    fail_start: Option<String>,
    fail_logout: Option<String>,
    stats: Arc<MockStats>,
    last: Mutex<Option<Arc<MockClient>>>,
}

impl MockFactory {
    /// Factory whose sessions play `script`.
    pub fn new(script: MockScript, qr_base_url: impl Into<String>) -> Self {
        Self {
            script,
            qr_base_url: qr_base_url.into(),
            fail_create: None,
            fail_start: None,
            fail_logout: None,
            stats: Arc::new(MockStats::default()),
            last: Mutex::new(None),
        }
    }

    /// Make session construction fail with `reason`.
    #[must_use]
    pub fn failing_create(mut self, reason: impl Into<String>) -> Self {
        self.fail_create = Some(reason.into());
        self
    }

    /// Make every session's `start()` fail with `reason`.
    #[must_use]
    pub fn failing_start(mut self, reason: impl Into<String>) -> Self {
        self.fail_start = Some(reason.into());
        self
    }

    /// Make every session's `logout()` fail with `reason`.
    #[must_use]
    pub fn failing_logout(mut self, reason: impl Into<String>) -> Self {
        self.fail_logout = Some(reason.into());
        self
    }

    /// Shared lifecycle counters.
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    /// The most recently constructed session, if any.
    pub fn last_session(&self) -> Option<Arc<MockClient>> {
        match self.last.lock() {
            Ok(last) => last.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn create(
        &self,
        login: &LoginInfo,
        events: EventSender,
    ) -> Result<Arc<dyn ClientSession>, ClientError> {
        if let Some(reason) = &self.fail_create {
            return Err(ClientError::Create(reason.clone()));
        }

        let identity = if login.user_id.is_empty() {
            Identity::placeholder()
        } else {
            Identity::new(login.user_id.clone())
        };
        let qr_url = format!(
            "{}/{}",
            self.qr_base_url.trim_end_matches('/'),
            events.session_id()
        );

        let client = Arc::new(MockClient {
            events,
            script: self.script.clone(),
            identity,
            qr_url,
            fail_start: self.fail_start.clone(),
            fail_logout: self.fail_logout.clone(),
            logged_in: Arc::new(AtomicBool::new(false)),
            player: Mutex::new(None),
            stats: Arc::clone(&self.stats),
        });
        self.stats.created.fetch_add(1, Ordering::SeqCst);

        match self.last.lock() {
            Ok(mut last) => *last = Some(Arc::clone(&client)),
            Err(poisoned) => *poisoned.into_inner() = Some(Arc::clone(&client)),
        }

        debug!(session_id = %client.events.session_id(), "mock client created");
        Ok(client)
    }
}

/// A scripted client session.
#[derive(Debug)]
pub struct MockClient {
    events: EventSender,
    script: MockScript,
    identity: Identity,
    qr_url: String,
    fail_start: Option<String>,
    fail_logout: Option<String>,
    logged_in: Arc<AtomicBool>,
    player: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<MockStats>,
}

impl MockClient {
    /// Push an event as if the client had emitted it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Disconnected`] if the adapter stopped listening.
    pub async fn emit(&self, event: ClientEvent) -> Result<(), ClientError> {
        if let ClientEvent::Login(_) = event {
            self.logged_in.store(true, Ordering::SeqCst);
        }
        self.events.send(event).await
    }

    /// The QR url this session reports in `scan` events.
    pub fn qr_url(&self) -> &str {
        &self.qr_url
    }

    fn stop_player(&self) {
        let handle = match self.player.lock() {
            Ok(mut player) => player.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

#[async_trait]
impl ClientSession for MockClient {
    async fn start(&self) -> Result<(), ClientError> {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.fail_start {
            return Err(ClientError::Start(reason.clone()));
        }

        let events = self.events.clone();
        let steps = self.script.steps.clone();
        let identity = self.identity.clone();
        let qr_url = self.qr_url.clone();
        let logged_in = Arc::clone(&self.logged_in);

        let handle = tokio::spawn(async move {
            for (delay, step) in steps {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let event = match step {
                    MockStep::Scan(status) => ClientEvent::Scan {
                        url: qr_url.clone(),
                        status,
                    },
                    MockStep::Login => {
                        logged_in.store(true, Ordering::SeqCst);
                        ClientEvent::Login(identity.clone())
                    }
                    MockStep::Event(event) => event,
                };
                if events.send(event).await.is_err() {
                    debug!("adapter stopped listening, mock script ends");
                    return;
                }
            }
        });

        match self.player.lock() {
            Ok(mut player) => *player = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }
        info!(session_id = %self.events.session_id(), "mock client started");
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.stats.logged_out.fetch_add(1, Ordering::SeqCst);
        self.stop_player();
        self.logged_in.store(false, Ordering::SeqCst);
        if let Some(reason) = &self.fail_logout {
            warn!(session_id = %self.events.session_id(), "mock logout failing on request");
            return Err(ClientError::Logout(reason.clone()));
        }
        info!(session_id = %self.events.session_id(), "mock client logged out");
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        self.stop_player();
    }
}
