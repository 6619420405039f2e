//! Ingest counters and status snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use eew_core::{CadenceMode, RelayRole};
use eew_types::{AlertRecord, ProviderTag};
use serde::Serialize;

/// Pipeline counters. All fields are monotonic.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// Poll cycles completed.
    pub cycles_total: AtomicU64,
    /// Candidate events seen (providers and peers).
    pub events_received: AtomicU64,
    /// Events dropped because they failed validation.
    pub malformed_dropped: AtomicU64,
    /// Events or messages dropped by the dedup ledger.
    pub duplicates_dropped: AtomicU64,
    /// Events dropped by the region filter.
    pub irrelevant_dropped: AtomicU64,
    /// Alerts that became live and were dispatched.
    pub dispatched_total: AtomicU64,
    /// Failed fetch attempts (timeouts included).
    pub fetch_failures: AtomicU64,
    /// Providers abandoned at the cycle deadline.
    pub providers_abandoned: AtomicU64,
    /// Peer messages accepted for processing.
    pub peer_messages: AtomicU64,
}

impl IngestMetrics {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            cycles_total: get(&self.cycles_total),
            events_received: get(&self.events_received),
            malformed_dropped: get(&self.malformed_dropped),
            duplicates_dropped: get(&self.duplicates_dropped),
            irrelevant_dropped: get(&self.irrelevant_dropped),
            dispatched_total: get(&self.dispatched_total),
            fetch_failures: get(&self.fetch_failures),
            providers_abandoned: get(&self.providers_abandoned),
            peer_messages: get(&self.peer_messages),
        }
    }
}

/// Plain copy of [`IngestMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub cycles_total: u64,
    pub events_received: u64,
    pub malformed_dropped: u64,
    pub duplicates_dropped: u64,
    pub irrelevant_dropped: u64,
    pub dispatched_total: u64,
    pub fetch_failures: u64,
    pub providers_abandoned: u64,
    pub peer_messages: u64,
}

/// Health of one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Unix ms of the last successful fetch.
    pub last_success_ms: Option<u64>,
    /// Message of the last failure.
    pub last_error: Option<String>,
    /// Failed cycles in a row. Reset by a success.
    pub consecutive_failures: u32,
}

/// Serializable node status.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    /// Node label.
    pub label: String,
    /// Crate version.
    pub version: String,
    /// Current poll cadence.
    pub cadence: CadenceMode,
    /// Current relay role, when a relay policy is attached.
    pub relay_role: Option<RelayRole>,
    /// Ids held by the dedup ledger.
    pub ledger_entries: usize,
    /// Live alert.
    pub live: Option<AlertRecord>,
    /// Last alert.
    pub last: Option<AlertRecord>,
    /// Per-provider health, sorted by provider.
    pub providers: Vec<(ProviderTag, ProviderStatus)>,
    /// Counters.
    pub metrics: MetricsSnapshot,
}
