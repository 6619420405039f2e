//! Time-bounded set of seen identifiers.
//!
//! The ledger answers one question: "was this id seen within the retention
//! window?". It is used for both provider event keys (`afad:123`) and
//! peer message ids (`msg:<uuid>`).
//!
//! Entries are kept in an insertion-ordered queue plus a hash index, so the
//! sweep pops expired entries off the front instead of scanning the whole
//! set. An optional capacity evicts the oldest entry first. Both eviction
//! paths can only make the ledger forget (a repeat may be reprocessed);
//! they can never make it claim an id it has not seen.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::clock::Clock;

/// Default retention window (one hour).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct Entry {
    seq: u64,
    first_seen_ms: u64,
    id: String,
}

/// Time-indexed dedup store.
pub struct DedupLedger {
    clock: Arc<dyn Clock>,
    retention_ms: u64,
    max_entries: Option<usize>,
    queue: VecDeque<Entry>,
    // id -> (seq, first_seen_ms) of the queue entry that currently owns it
    index: HashMap<String, (u64, u64)>,
    next_seq: u64,
}

impl DedupLedger {
    /// Create a ledger with the default retention and no capacity limit.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            retention_ms: DEFAULT_RETENTION.as_millis() as u64,
            max_entries: None,
            queue: VecDeque::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Set the retention window.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention_ms = retention.as_millis() as u64;
        self
    }

    /// Cap the number of live entries. Values below 1 are treated as 1.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    /// Retention window.
    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// Check-and-record.
    ///
    /// Returns `true` if `id` was recorded within the retention window
    /// (nothing changes). Otherwise records `id` at the current time and
    /// returns `false`.
    pub fn seen(&mut self, id: &str) -> bool {
        let now = self.clock.now_ms();
        self.sweep_at(now);

        if let Some(&(_, first_seen_ms)) = self.index.get(id) {
            if !self.is_expired(first_seen_ms, now) {
                return true;
            }
            // Expired but not yet swept (clock stepped backwards earlier).
            // The stale queue entry no longer owns the id.
            self.index.remove(id);
        }

        if let Some(max) = self.max_entries {
            while self.index.len() >= max {
                if !self.pop_front() {
                    break;
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(Entry {
            seq,
            first_seen_ms: now,
            id: id.to_owned(),
        });
        self.index.insert(id.to_owned(), (seq, now));
        false
    }

    /// Read-only membership check. Does not record `id`.
    pub fn contains(&self, id: &str) -> bool {
        let now = self.clock.now_ms();
        self.index
            .get(id)
            .is_some_and(|&(_, first_seen_ms)| !self.is_expired(first_seen_ms, now))
    }

    /// Evict every expired entry at the front of the queue.
    ///
    /// Returns the number of ids forgotten.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.sweep_at(now)
    }

    /// Number of ids currently recorded (expired entries count until swept).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no ids are recorded.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn is_expired(&self, first_seen_ms: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(first_seen_ms) >= self.retention_ms
    }

    fn sweep_at(&mut self, now_ms: u64) -> usize {
        let before = self.index.len();
        while let Some(front) = self.queue.front() {
            if !self.is_expired(front.first_seen_ms, now_ms) {
                break;
            }
            self.pop_front();
        }
        before - self.index.len()
    }

    /// Pop the oldest queue entry, dropping its index slot if it still owns it.
    fn pop_front(&mut self) -> bool {
        let Some(entry) = self.queue.pop_front() else {
            return false;
        };
        if self
            .index
            .get(&entry.id)
            .is_some_and(|&(seq, _)| seq == entry.seq)
        {
            self.index.remove(&entry.id);
        }
        true
    }
}

impl std::fmt::Debug for DedupLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupLedger")
            .field("retention_ms", &self.retention_ms)
            .field("max_entries", &self.max_entries)
            .field("len", &self.index.len())
            .finish()
    }
}

/// A [`DedupLedger`] behind a mutex, cloneable across tasks.
///
/// Each call holds the lock for the whole check-and-insert, so two callers
/// racing on the same id get exactly one `false`.
#[derive(Debug, Clone)]
pub struct SharedDedupLedger {
    inner: Arc<Mutex<DedupLedger>>,
}

impl SharedDedupLedger {
    /// Wrap a ledger.
    pub fn new(ledger: DedupLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// See [`DedupLedger::seen`].
    pub fn seen(&self, id: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .seen(id)
    }

    /// See [`DedupLedger::contains`].
    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// See [`DedupLedger::sweep`].
    pub fn sweep(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sweep()
    }

    /// See [`DedupLedger::len`].
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// See [`DedupLedger::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
