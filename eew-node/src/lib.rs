//! # eew-node
//!
//! Async runtime for the quakewire EEW relay.
//!
//! This is the crate an application embeds to run the alert pipeline.
//!
//! ## Features
//!
//! - **Concurrent ingest**: every provider is polled in parallel with
//!   per-attempt timeouts, retry backoff and a cycle deadline
//! - **Peer relay**: gossiped alerts enter through the same pipeline
//! - **Relay policy**: battery-driven relay role, refreshed on a timer
//! - **Pluggable collaborators**: providers, notifier, broadcaster and
//!   battery sampler are traits, with mocks for testing
//!
//! ## Example
//!
//! ```ignore
//! use eew_node::{AlertIngestOrchestrator, Config};
//!
//! let config = Config::from_file("node.toml".as_ref())?;
//! let orchestrator = AlertIngestOrchestrator::builder(config)
//!     .provider(Arc::new(afad))
//!     .notifier(Arc::new(notifier))
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! Arc::new(orchestrator).spawn(cancel.clone());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod battery;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod provider;

pub use battery::{spawn_refresh_task, BatterySampler, MockBattery, RelayPolicy};
pub use config::{Config, ConfigError};
pub use dispatch::{Dispatched, LogDispatcher, Notifier, PeerBroadcaster, RecordingDispatcher};
pub use error::{NodeError, ProviderError, Result, SamplerError};
pub use metrics::{IngestMetrics, MetricsSnapshot, NodeStatus, ProviderStatus};
pub use orchestrator::{AlertIngestOrchestrator, CycleReport, IngestOutcome, OrchestratorBuilder};
pub use provider::{MockProvider, ProviderAdapter};
