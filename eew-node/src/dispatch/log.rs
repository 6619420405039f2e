//! Dispatcher that only writes to the log.

use super::{Notifier, PeerBroadcaster};
use eew_types::{AlertRecord, RelayEnvelope};

/// Logs every dispatch at `info`. Used by the CLI harness.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl Notifier for LogDispatcher {
    fn notify(&self, record: &AlertRecord) {
        tracing::info!(
            event = %record.event_id,
            magnitude = record.magnitude,
            place = %record.place,
            timestamp_ms = record.timestamp_ms,
            "NOTIFY"
        );
    }
}

impl PeerBroadcaster for LogDispatcher {
    fn broadcast(&self, envelope: &RelayEnvelope) {
        tracing::info!(
            message_id = %envelope.message_id,
            origin = %envelope.origin,
            hops_remaining = envelope.hops_remaining,
            "BROADCAST"
        );
    }
}
