//! Concrete [`HubEventSink`] implementations.
//!
//! [`ChannelSink`] is what the adapter talks to in the binary: it queues
//! envelopes so shutdown can wait for them. [`StdoutSink`] owns the process
//! stdout and writes one JSON document per line; it drains the channel and
//! also carries command replies, so lines from both never interleave.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ClientInfo, HubEnvelope, HubEvent, HubEventSink};

/// Forwards enveloped events to the hub transport over a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    client: ClientInfo,
    tx: mpsc::Sender<HubEnvelope>,
}

impl ChannelSink {
    /// Create a sink feeding `tx`.
    pub fn new(client: ClientInfo, tx: mpsc::Sender<HubEnvelope>) -> Self {
        Self { client, tx }
    }

    /// Envelopes queued but not yet taken by the transport.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity().saturating_sub(self.tx.capacity())
    }
}

#[async_trait]
impl HubEventSink for ChannelSink {
    async fn send(&self, event: HubEvent) {
        let envelope = HubEnvelope::new(&self.client, &event);
        debug!(event = %envelope.event, "queueing hub event");
        if self.tx.send(envelope).await.is_err() {
            warn!(event = event.name(), "hub transport closed, event dropped");
        }
    }
}

/// Writes hub envelopes, and anything else serializable, as JSON lines.
#[derive(Debug)]
pub struct StdoutSink<W = tokio::io::Stdout> {
    client: ClientInfo,
    out: tokio::sync::Mutex<W>,
}

impl StdoutSink {
    /// Sink on the process stdout.
    pub fn stdout(client: ClientInfo) -> Self {
        Self::with_writer(client, tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> StdoutSink<W> {
    /// Sink on an arbitrary writer.
    pub fn with_writer(client: ClientInfo, out: W) -> Self {
        Self {
            client,
            out: tokio::sync::Mutex::new(out),
        }
    }

    /// Serialize `value` and write it as a single line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await
    }

    /// Write every envelope from `rx` until the channel closes.
    pub async fn forward(&self, mut rx: mpsc::Receiver<HubEnvelope>) {
        while let Some(envelope) = rx.recv().await {
            if let Err(e) = self.write_json(&envelope).await {
                warn!(event = %envelope.event, error = %e, "failed to write hub envelope");
            }
        }
        debug!("hub envelope channel closed");
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> HubEventSink for StdoutSink<W> {
    async fn send(&self, event: HubEvent) {
        let envelope = HubEnvelope::new(&self.client, &event);
        if let Err(e) = self.write_json(&envelope).await {
            warn!(event = event.name(), error = %e, "failed to write hub event");
        }
    }
}

/// Keeps every event in memory. Used to observe the adapter in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<HubEvent>>,
    contact_syncs: Mutex<usize>,
}

impl RecordingSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order.
    pub fn events(&self) -> Vec<HubEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events received so far with the given hub name.
    pub fn named(&self, name: &str) -> Vec<HubEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.name() == name)
            .collect()
    }

    /// Number of contact sync requests.
    pub fn contact_syncs(&self) -> usize {
        match self.contact_syncs.lock() {
            Ok(count) => *count,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl HubEventSink for RecordingSink {
    async fn send(&self, event: HubEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }

    async fn sync_contacts(&self) {
        match self.contact_syncs.lock() {
            Ok(mut count) => *count = count.saturating_add(1),
            Err(poisoned) => {
                let mut count = poisoned.into_inner();
                *count = count.saturating_add(1);
            }
        }
    }
}
