//! Identity types for seismic events and relayed messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Upstream source of a seismic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    /// Kandilli Observatory (Boğaziçi University).
    Kandilli,
    /// AFAD, the Turkish disaster authority.
    Afad,
    /// United States Geological Survey global feed.
    Usgs,
    /// European-Mediterranean Seismological Centre.
    Emsc,
    /// Locally generated or test events.
    Synthetic,
}

impl ProviderTag {
    /// All known providers, in default priority order.
    pub const ALL: [ProviderTag; 5] = [
        ProviderTag::Afad,
        ProviderTag::Kandilli,
        ProviderTag::Usgs,
        ProviderTag::Emsc,
        ProviderTag::Synthetic,
    ];

    /// Lowercase name used in ledger keys, config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::Kandilli => "kandilli",
            ProviderTag::Afad => "afad",
            ProviderTag::Usgs => "usgs",
            ProviderTag::Emsc => "emsc",
            ProviderTag::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderTag {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kandilli" => Ok(ProviderTag::Kandilli),
            "afad" => Ok(ProviderTag::Afad),
            "usgs" => Ok(ProviderTag::Usgs),
            "emsc" => Ok(ProviderTag::Emsc),
            "synthetic" => Ok(ProviderTag::Synthetic),
            other => Err(TypesError::UnknownProvider(other.to_string())),
        }
    }
}

/// Provider-scoped event identifier.
///
/// Two providers reporting the same physical earthquake produce two
/// distinct ids; nothing in the pipeline correlates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Which provider issued the id.
    pub provider: ProviderTag,
    /// The provider's own identifier for the event.
    pub native_id: String,
}

impl EventId {
    /// Create a new event id.
    pub fn new(provider: ProviderTag, native_id: impl Into<String>) -> Self {
        Self {
            provider,
            native_id: native_id.into(),
        }
    }

    /// Key under which this event is recorded in the dedup ledger.
    pub fn ledger_key(&self) -> String {
        format!("{}:{}", self.provider, self.native_id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.native_id)
    }
}

/// Identifier of a message gossiped between peers.
///
/// UUID v4 for locally originated messages; foreign ids are accepted
/// verbatim since peers are not authenticated.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new random MessageId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an id received from a peer.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this message is recorded in the dedup ledger.
    ///
    /// Namespaced so a peer cannot collide with a provider event key.
    pub fn ledger_key(&self) -> String {
        format!("msg:{}", self.0)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.0.chars().take(8).collect();
        write!(f, "MessageId({})", short)
    }
}
