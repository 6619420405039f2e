//! # eew-types
//!
//! Data model and peer wire format for the quakewire EEW relay.
//!
//! This crate provides the foundational types used across all quakewire crates:
//! - [`ProviderTag`], [`EventId`], [`MessageId`] - Identity types
//! - [`RawEvent`], [`SeismicEvent`], [`Coordinate`] - Events before and after validation
//! - [`AlertRecord`] - The live/last projection shown to the user
//! - [`RelayEnvelope`] - Gossip wrapper for peer-relayed alerts
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod alert;
mod envelope;
mod error;
mod event;
mod ids;

pub use alert::{AlertRecord, UNKNOWN_PLACE};
pub use envelope::{RelayEnvelope, DEFAULT_MAX_HOPS, ENVELOPE_VERSION};
pub use error::TypesError;
pub use event::{Coordinate, RawEvent, SeismicEvent};
pub use ids::{EventId, MessageId, ProviderTag};
