//! Replay scenario files.
//!
//! A scenario scripts what each provider returns per poll cycle and which
//! peer envelopes arrive after a given cycle:
//!
//! ```json
//! {
//!   "start_ms": 1700000000000,
//!   "providers": {
//!     "afad": [
//!       { "events": [{ "native_id": "1", "magnitude": 4.6, "lat": 40.1, "lon": 29.0, "origin_ms": 1699999990000 }] },
//!       { "error": "HTTP 503" }
//!     ]
//!   },
//!   "peers": [
//!     { "origin": "node-b", "after_cycle": 1, "event": { "provider": "emsc", "native_id": "x" } }
//!   ]
//! }
//! ```
//!
//! A provider's events default their `provider` field to the provider they
//! are scripted under. An error step fails every fetch attempt of its cycle,
//! retries included. Once a provider's script runs out it returns nothing.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use eew_node::{MockProvider, ProviderError};
use eew_types::{ProviderTag, RawEvent};
use serde::Deserialize;

/// A parsed scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Start the node clock here instead of at wall-clock time.
    #[serde(default)]
    pub start_ms: Option<u64>,

    /// Per-provider script, one step per cycle.
    #[serde(default)]
    pub providers: BTreeMap<ProviderTag, Vec<Step>>,

    /// Peer envelopes to deliver.
    #[serde(default)]
    pub peers: Vec<PeerMessage>,
}

/// What a provider returns in one cycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// A successful fetch.
    Events {
        /// Events returned.
        events: Vec<RawEvent>,
    },
    /// A failed fetch.
    Error {
        /// Failure reason.
        error: String,
    },
}

/// An envelope arriving from a peer.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerMessage {
    /// Label of the originating node.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Deliver after this cycle completes (1-based).
    #[serde(default = "default_after_cycle")]
    pub after_cycle: u32,

    /// Relayed event.
    pub event: RawEvent,
}

fn default_origin() -> String {
    "peer".to_string()
}

fn default_after_cycle() -> u32 {
    1
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Cycles needed to play every provider step and deliver every peer message.
    pub fn cycles(&self) -> u32 {
        let steps = self.providers.values().map(Vec::len).max().unwrap_or(0);
        let peers = self.peers.iter().map(|p| p.after_cycle).max().unwrap_or(0);
        u32::try_from(steps).unwrap_or(u32::MAX).max(peers).max(1)
    }

    /// Peer messages due after `cycle`.
    pub fn peers_after(&self, cycle: u32) -> impl Iterator<Item = &PeerMessage> {
        self.peers.iter().filter(move |p| p.after_cycle == cycle)
    }

    /// One mock provider per scripted tag, with the steps queued.
    ///
    /// `attempts_per_cycle` is the node's fetch attempts per cycle; an error
    /// step is queued that many times so retries stay inside its cycle.
    pub fn providers(&self, attempts_per_cycle: u32) -> Vec<MockProvider> {
        self.providers
            .iter()
            .map(|(&tag, steps)| {
                let provider = MockProvider::new(tag);
                for step in steps {
                    match step {
                        Step::Events { events } => provider.push_events(
                            events
                                .iter()
                                .cloned()
                                .map(|mut event| {
                                    event.provider = event.provider.or(Some(tag));
                                    event
                                })
                                .collect(),
                        ),
                        Step::Error { error } => {
                            for _ in 0..attempts_per_cycle.max(1) {
                                provider.push_error(ProviderError::Network {
                                    provider: tag,
                                    reason: error.clone(),
                                });
                            }
                        }
                    }
                }
                provider
            })
            .collect()
    }
}
