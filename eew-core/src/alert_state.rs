//! Live/last alert reconciliation.
//!
//! "Live" is the alert currently flagged as active; "last" is the newest
//! relevant alert ever accepted. The pair is stored as one immutable
//! [`AlertSnapshot`] behind an [`ArcSwap`]. Writers build a new pair and
//! swap it in with read-copy-update, so a reader always sees a complete
//! pair and never a live record newer than its last record.
//!
//! The transition rules live in [`AlertSnapshot::merge`], which is a pure
//! function and is tested without any shared state.

use std::sync::Arc;

use arc_swap::ArcSwap;
use eew_types::AlertRecord;

/// Result of merging one candidate into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Candidate is now live (and last). The caller should dispatch it.
    BecameLive,
    /// Candidate replaced last only.
    UpdatedLast,
    /// Candidate was relevant but not newer than live or last.
    Stale,
    /// Candidate was not relevant; nothing changed.
    Irrelevant,
}

impl MergeOutcome {
    /// Whether the merge should trigger a dispatch.
    pub fn became_live(self) -> bool {
        self == MergeOutcome::BecameLive
    }
}

/// A consistent (live, last) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertSnapshot {
    /// Alert currently flagged live.
    pub live: Option<AlertRecord>,
    /// Newest relevant alert accepted so far.
    pub last: Option<AlertRecord>,
}

impl AlertSnapshot {
    /// Compute the next snapshot for a relevant candidate.
    ///
    /// - No live record, or candidate newer than live: candidate becomes
    ///   live and is written to last.
    /// - Otherwise the candidate replaces last only if newer than last.
    ///
    /// `last` only ever moves forward in time. When a candidate becomes live
    /// while an even newer record is already in last (possible once live has
    /// expired), last keeps the newer record.
    pub fn merge(&self, candidate: &AlertRecord) -> (AlertSnapshot, MergeOutcome) {
        let newer_than_live = self
            .live
            .as_ref()
            .map_or(true, |live| candidate.timestamp_ms > live.timestamp_ms);
        let newer_than_last = self
            .last
            .as_ref()
            .map_or(true, |last| candidate.timestamp_ms > last.timestamp_ms);

        let last = if newer_than_last {
            Some(candidate.clone())
        } else {
            self.last.clone()
        };

        if newer_than_live {
            let next = AlertSnapshot {
                live: Some(candidate.clone()),
                last,
            };
            (next, MergeOutcome::BecameLive)
        } else if newer_than_last {
            let next = AlertSnapshot {
                live: self.live.clone(),
                last,
            };
            (next, MergeOutcome::UpdatedLast)
        } else {
            (self.clone(), MergeOutcome::Stale)
        }
    }
}

/// Shared live/last alert state.
#[derive(Debug, Default)]
pub struct AlertState {
    current: ArcSwap<AlertSnapshot>,
}

impl AlertState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a candidate.
    ///
    /// Irrelevant candidates never touch the state.
    pub fn merge(&self, candidate: &AlertRecord, relevant: bool) -> MergeOutcome {
        if !relevant {
            return MergeOutcome::Irrelevant;
        }
        let previous = self
            .current
            .rcu(|current| Arc::new(current.merge(candidate).0));
        // rcu returns the snapshot the winning update was computed from.
        previous.merge(candidate).1
    }

    /// Clear live if it is older than `max_age_ms` at `now_ms`.
    ///
    /// Returns the expired record. Last is never touched.
    pub fn expire_live(&self, max_age_ms: u64, now_ms: u64) -> Option<AlertRecord> {
        let previous = self.current.rcu(|current| match &current.live {
            Some(live) if now_ms.saturating_sub(live.timestamp_ms) > max_age_ms => {
                Arc::new(AlertSnapshot {
                    live: None,
                    last: current.last.clone(),
                })
            }
            _ => Arc::clone(current),
        });
        previous
            .live
            .clone()
            .filter(|live| now_ms.saturating_sub(live.timestamp_ms) > max_age_ms)
    }

    /// Consistent (live, last) pair.
    pub fn snapshot(&self) -> Arc<AlertSnapshot> {
        self.current.load_full()
    }

    /// Current live record.
    pub fn live(&self) -> Option<AlertRecord> {
        self.current.load().live.clone()
    }

    /// Current last record.
    pub fn last(&self) -> Option<AlertRecord> {
        self.current.load().last.clone()
    }
}
