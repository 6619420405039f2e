//! User-facing alert projection.

use serde::{Deserialize, Serialize};

use crate::{Coordinate, EventId, RawEvent, SeismicEvent};

/// Place label used when the provider did not supply one.
pub const UNKNOWN_PLACE: &str = "Unknown location";

/// The "live" or "last" alert shown to the user.
///
/// Built from a [`SeismicEvent`]; carries enough of the event to be
/// rebuilt on a peer that receives it through a broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Event the record was built from.
    pub event_id: EventId,
    /// Magnitude of the event.
    pub magnitude: f64,
    /// Place label.
    pub place: String,
    /// Origin time of the event, Unix milliseconds.
    pub timestamp_ms: u64,
    /// Epicenter of the event.
    pub epicenter: Coordinate,
}

impl AlertRecord {
    /// Wire form of the underlying event, for peer relay payloads.
    pub fn to_raw(&self) -> RawEvent {
        RawEvent {
            provider: Some(self.event_id.provider),
            native_id: Some(self.event_id.native_id.clone()),
            magnitude: Some(self.magnitude),
            lat: Some(self.epicenter.lat),
            lon: Some(self.epicenter.lon),
            origin_ms: Some(self.timestamp_ms),
            place: (self.place != UNKNOWN_PLACE).then(|| self.place.clone()),
            depth_km: None,
        }
    }
}

impl From<&SeismicEvent> for AlertRecord {
    fn from(event: &SeismicEvent) -> Self {
        Self {
            event_id: event.id().clone(),
            magnitude: event.magnitude(),
            place: event.place().unwrap_or(UNKNOWN_PLACE).to_string(),
            timestamp_ms: event.origin_ms(),
            epicenter: event.epicenter(),
        }
    }
}
