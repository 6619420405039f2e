//! Upstream seismic providers.
//!
//! A provider adapter fetches the latest events from one upstream feed and
//! hands them over as [`RawEvent`]s. Parsing the feed's own format is the
//! adapter's job; validation happens in the orchestrator.
//!
//! # Example
//!
//! ```ignore
//! let afad = MockProvider::new(ProviderTag::Afad);
//! afad.push_events(vec![event]);
//! let events = afad.fetch_latest().await?;
//! ```

mod mock;

pub use mock::MockProvider;

use async_trait::async_trait;
use eew_types::{ProviderTag, RawEvent};

use crate::error::ProviderError;

/// One upstream seismic feed.
///
/// Implementations must be cheap to call repeatedly; the orchestrator calls
/// `fetch_latest` once per attempt and wraps each call in its own timeout.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter talks to.
    fn tag(&self) -> ProviderTag;

    /// Fetch the provider's most recent events.
    ///
    /// May return events already delivered in a previous call; the
    /// orchestrator deduplicates.
    async fn fetch_latest(&self) -> Result<Vec<RawEvent>, ProviderError>;
}
