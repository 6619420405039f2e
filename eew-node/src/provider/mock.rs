//! Mock provider for testing.
//!
//! Allows queueing responses, injecting failures and slowing fetches down.

use super::ProviderAdapter;
use crate::error::ProviderError;
use async_trait::async_trait;
use eew_types::{ProviderTag, RawEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock provider for testing.
///
/// Queued responses are returned in order; once the queue is empty every
/// fetch returns the standing event list. Clones share state.
#[derive(Debug, Clone)]
pub struct MockProvider {
    tag: ProviderTag,
    inner: Arc<Mutex<MockProviderInner>>,
}

#[derive(Debug, Default)]
struct MockProviderInner {
    standing: Vec<RawEvent>,
    queued: VecDeque<Result<Vec<RawEvent>, ProviderError>>,
    delay: Duration,
    fail_next: u32,
    calls: u32,
}

impl MockProvider {
    /// Create a mock provider that returns nothing.
    pub fn new(tag: ProviderTag) -> Self {
        Self {
            tag,
            inner: Arc::new(Mutex::new(MockProviderInner::default())),
        }
    }

    fn inner(&self) -> MutexGuard<'_, MockProviderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the events returned when no response is queued.
    pub fn set_events(&self, events: Vec<RawEvent>) {
        self.inner().standing = events;
    }

    /// Queue a successful response.
    pub fn push_events(&self, events: Vec<RawEvent>) {
        self.inner().queued.push_back(Ok(events));
    }

    /// Queue a failed response.
    pub fn push_error(&self, error: ProviderError) {
        self.inner().queued.push_back(Err(error));
    }

    /// Cause the next `count` fetches to fail with a network error.
    pub fn fail_next(&self, count: u32) {
        self.inner().fail_next = count;
    }

    /// Sleep this long inside every fetch.
    pub fn set_delay(&self, delay: Duration) {
        self.inner().delay = delay;
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> u32 {
        self.inner().calls
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn tag(&self) -> ProviderTag {
        self.tag
    }

    async fn fetch_latest(&self) -> Result<Vec<RawEvent>, ProviderError> {
        let (delay, result) = {
            let mut inner = self.inner();
            inner.calls += 1;

            let result = if inner.fail_next > 0 {
                inner.fail_next -= 1;
                Err(ProviderError::Network {
                    provider: self.tag,
                    reason: "injected failure".into(),
                })
            } else {
                match inner.queued.pop_front() {
                    Some(queued) => queued,
                    None => Ok(inner.standing.clone()),
                }
            };
            (inner.delay, result)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
