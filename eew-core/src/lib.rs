//! # eew-core
//!
//! Pure logic for the quakewire EEW relay (no I/O, instant tests).
//!
//! This crate implements the algorithms of the alert pipeline without any
//! network, disk or timer I/O:
//! - [`geo`] - great-circle distance and region relevance
//! - [`dedup`] - time-bounded ledger of seen ids
//! - [`alert_state`] - live/last alert reconciliation
//! - [`role`] - battery-driven relay roles
//! - [`cadence`] - adaptive poll interval
//! - [`backoff`] - retry schedule for provider fetches
//!
//! ## Design Philosophy
//!
//! Time comes in through the [`Clock`] trait or as an explicit `now_ms`
//! argument, so every rule here is deterministic under test. The async
//! runtime in `eew-node` owns the timers and the collaborators and calls
//! into these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alert_state;
pub mod backoff;
pub mod cadence;
pub mod clock;
pub mod dedup;
pub mod geo;
pub mod role;

pub use alert_state::{AlertSnapshot, AlertState, MergeOutcome};
pub use backoff::RetryPolicy;
pub use cadence::{CadenceMode, PollCadence};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dedup::{DedupLedger, SharedDedupLedger, DEFAULT_RETENTION};
pub use geo::{distance_km, is_within_radius, BoundingBox, RegionFilter, Relevance, EARTH_RADIUS_KM};
pub use role::{RelayRole, CARRIER_THRESHOLD, SOS_ONLY_THRESHOLD};
