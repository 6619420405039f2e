//! RelayEnvelope - the wire wrapper for alerts gossiped between peers.

use serde::{Deserialize, Serialize};

use crate::{MessageId, RawEvent, TypesError};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Default hop budget for a freshly originated alert.
pub const DEFAULT_MAX_HOPS: u8 = 6;

/// The envelope wraps a relayed alert with gossip metadata.
///
/// The payload is a MessagePack-encoded [`RawEvent`]; it is decoded and
/// validated by the receiving node, never trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    /// Envelope format version.
    pub version: u8,
    /// Gossip message id, stable across hops.
    pub message_id: MessageId,
    /// Label of the device that originated the message.
    pub origin: String,
    /// Remaining hops before the message must not be forwarded.
    pub hops_remaining: u8,
    /// Unix timestamp (milliseconds) at origin - informational only.
    pub sent_at_ms: u64,
    /// MessagePack-encoded [`RawEvent`].
    pub payload: Vec<u8>,
}

impl RelayEnvelope {
    /// Wrap an event for relaying with a fresh message id.
    pub fn new(origin: impl Into<String>, event: &RawEvent, max_hops: u8) -> Result<Self, TypesError> {
        Ok(Self {
            version: ENVELOPE_VERSION,
            message_id: MessageId::new(),
            origin: origin.into(),
            hops_remaining: max_hops,
            sent_at_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            payload: event.to_bytes()?,
        })
    }

    /// Copy of this envelope with one hop consumed.
    ///
    /// Returns `None` when the hop budget is exhausted.
    pub fn forwarded(&self) -> Option<Self> {
        let hops_remaining = self.hops_remaining.checked_sub(1)?;
        if hops_remaining == 0 {
            return None;
        }
        Some(Self {
            hops_remaining,
            ..self.clone()
        })
    }

    /// Decode the payload.
    pub fn event(&self) -> Result<RawEvent, TypesError> {
        RawEvent::from_bytes(&self.payload)
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        rmp_serde::to_vec(self).map_err(TypesError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let envelope: Self = rmp_serde::from_slice(bytes).map_err(TypesError::Deserialization)?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(TypesError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }
}
