//! Recording dispatcher for testing.
//!
//! Captures every notify and broadcast call, and can forward them to a
//! channel so async tests can wait for a dispatch with a timeout.

use super::{Notifier, PeerBroadcaster};
use eew_types::{AlertRecord, RelayEnvelope};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// One captured dispatch call.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// A [`Notifier::notify`] call.
    Notified(AlertRecord),
    /// A [`PeerBroadcaster::broadcast`] call.
    Broadcast(RelayEnvelope),
}

/// Implements both dispatch traits and records what it was given.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    inner: Arc<Mutex<RecordingInner>>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    calls: Vec<Dispatched>,
    tx: Option<mpsc::UnboundedSender<Dispatched>>,
}

impl RecordingDispatcher {
    /// Create a dispatcher that only records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher that also forwards every call to a channel.
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<Dispatched>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self::default();
        dispatcher.inner().tx = Some(tx);
        (dispatcher, rx)
    }

    fn inner(&self) -> MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Dispatched) {
        let mut inner = self.inner();
        if let Some(tx) = &inner.tx {
            // Receiver dropped: keep recording.
            let _ = tx.send(call.clone());
        }
        inner.calls.push(call);
    }

    /// Every call, in order.
    pub fn calls(&self) -> Vec<Dispatched> {
        self.inner().calls.clone()
    }

    /// Records passed to `notify`, in order.
    pub fn notified(&self) -> Vec<AlertRecord> {
        self.inner()
            .calls
            .iter()
            .filter_map(|c| match c {
                Dispatched::Notified(r) => Some(r.clone()),
                Dispatched::Broadcast(_) => None,
            })
            .collect()
    }

    /// Envelopes passed to `broadcast`, in order.
    pub fn broadcasts(&self) -> Vec<RelayEnvelope> {
        self.inner()
            .calls
            .iter()
            .filter_map(|c| match c {
                Dispatched::Broadcast(e) => Some(e.clone()),
                Dispatched::Notified(_) => None,
            })
            .collect()
    }
}

impl Notifier for RecordingDispatcher {
    fn notify(&self, record: &AlertRecord) {
        self.record(Dispatched::Notified(record.clone()));
    }
}

impl PeerBroadcaster for RecordingDispatcher {
    fn broadcast(&self, envelope: &RelayEnvelope) {
        self.record(Dispatched::Broadcast(envelope.clone()));
    }
}
