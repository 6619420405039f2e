//! Outbound alert dispatch.
//!
//! When an alert newly becomes live, the orchestrator hands it to a
//! [`Notifier`] (user-facing notification) and, as a [`RelayEnvelope`], to a
//! [`PeerBroadcaster`] (gossip to nearby devices). Both calls are
//! fire-and-forget: the core never waits for delivery.

mod log;
mod recording;

pub use log::LogDispatcher;
pub use recording::{Dispatched, RecordingDispatcher};

use eew_types::{AlertRecord, RelayEnvelope};

/// Delivers a user-facing notification.
pub trait Notifier: Send + Sync {
    /// Show `record` to the user. Must not block.
    fn notify(&self, record: &AlertRecord);
}

/// Relays an alert to peers over the short-range transport.
pub trait PeerBroadcaster: Send + Sync {
    /// Queue `envelope` for gossip. Must not block.
    ///
    /// Locally originated alerts arrive in a fresh envelope with the full hop
    /// budget; relayed alerts keep their message id with one hop consumed.
    fn broadcast(&self, envelope: &RelayEnvelope);
}
