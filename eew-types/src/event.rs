//! Seismic events as delivered by providers and peers.
//!
//! Providers and peers hand over a [`RawEvent`], where any field may be
//! missing. [`SeismicEvent`] is the validated, immutable form the rest of
//! the pipeline works with.

use serde::{Deserialize, Serialize};

use crate::{EventId, ProviderTag, TypesError};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate without validation.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Unvalidated event as parsed by a provider adapter or decoded from a peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// Provider that produced the event.
    pub provider: Option<ProviderTag>,
    /// Provider-native identifier.
    pub native_id: Option<String>,
    /// Magnitude on the provider's reported scale.
    pub magnitude: Option<f64>,
    /// Epicenter latitude.
    pub lat: Option<f64>,
    /// Epicenter longitude.
    pub lon: Option<f64>,
    /// Origin time, Unix milliseconds.
    pub origin_ms: Option<u64>,
    /// Human-readable place label.
    pub place: Option<String>,
    /// Hypocenter depth in kilometres.
    pub depth_km: Option<f64>,
}

impl RawEvent {
    /// Serialize to MessagePack bytes (peer payload format).
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        rmp_serde::to_vec_named(self).map_err(TypesError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        rmp_serde::from_slice(bytes).map_err(TypesError::Deserialization)
    }
}

/// A validated seismic event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    id: EventId,
    magnitude: f64,
    epicenter: Coordinate,
    origin_ms: u64,
    place: Option<String>,
    depth_km: Option<f64>,
}

impl SeismicEvent {
    /// Construct a validated event.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::Malformed`] if the id is empty, the magnitude
    /// is not finite, or the epicenter is out of range.
    pub fn new(
        id: EventId,
        magnitude: f64,
        epicenter: Coordinate,
        origin_ms: u64,
    ) -> Result<Self, TypesError> {
        if id.native_id.trim().is_empty() {
            return Err(TypesError::Malformed("empty native id"));
        }
        if !magnitude.is_finite() {
            return Err(TypesError::Malformed("magnitude is not finite"));
        }
        if !epicenter.is_valid() {
            return Err(TypesError::Malformed("epicenter out of range"));
        }
        Ok(Self {
            id,
            magnitude,
            epicenter,
            origin_ms,
            place: None,
            depth_km: None,
        })
    }

    /// Attach a place label.
    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    /// Attach a depth in kilometres. Non-finite depths are discarded.
    pub fn with_depth_km(mut self, depth_km: f64) -> Self {
        self.depth_km = depth_km.is_finite().then_some(depth_km);
        self
    }

    /// Provider-scoped identifier.
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Issuing provider.
    pub fn provider(&self) -> ProviderTag {
        self.id.provider
    }

    /// Reported magnitude.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Epicenter location.
    pub fn epicenter(&self) -> Coordinate {
        self.epicenter
    }

    /// Origin time, Unix milliseconds.
    pub fn origin_ms(&self) -> u64 {
        self.origin_ms
    }

    /// Place label, if the provider supplied one.
    pub fn place(&self) -> Option<&str> {
        self.place.as_deref()
    }

    /// Depth in kilometres, if known.
    pub fn depth_km(&self) -> Option<f64> {
        self.depth_km
    }

    /// Convert back into the wire form used for peer payloads.
    pub fn to_raw(&self) -> RawEvent {
        RawEvent {
            provider: Some(self.id.provider),
            native_id: Some(self.id.native_id.clone()),
            magnitude: Some(self.magnitude),
            lat: Some(self.epicenter.lat),
            lon: Some(self.epicenter.lon),
            origin_ms: Some(self.origin_ms),
            place: self.place.clone(),
            depth_km: self.depth_km,
        }
    }
}

impl TryFrom<RawEvent> for SeismicEvent {
    type Error = TypesError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let provider = raw.provider.ok_or(TypesError::Malformed("missing provider"))?;
        let native_id = raw.native_id.ok_or(TypesError::Malformed("missing id"))?;
        let magnitude = raw.magnitude.ok_or(TypesError::Malformed("missing magnitude"))?;
        let (lat, lon) = match (raw.lat, raw.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(TypesError::Malformed("missing coordinates")),
        };
        let origin_ms = raw.origin_ms.ok_or(TypesError::Malformed("missing timestamp"))?;

        let mut event = SeismicEvent::new(
            EventId::new(provider, native_id),
            magnitude,
            Coordinate::new(lat, lon),
            origin_ms,
        )?;
        if let Some(place) = raw.place.filter(|p| !p.trim().is_empty()) {
            event = event.with_place(place);
        }
        if let Some(depth) = raw.depth_km {
            event = event.with_depth_km(depth);
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_raw() -> RawEvent {
        RawEvent {
            provider: Some(ProviderTag::Afad),
            native_id: Some("20230206011734".into()),
            magnitude: Some(7.7),
            lat: Some(37.288),
            lon: Some(37.043),
            origin_ms: Some(1_675_646_254_000),
            place: Some("Pazarcık (Kahramanmaraş)".into()),
            depth_km: Some(8.6),
        }
    }

    #[test]
    fn complete_raw_event_validates() {
        let event = SeismicEvent::try_from(complete_raw()).unwrap();
        assert_eq!(event.id().ledger_key(), "afad:20230206011734");
        assert_eq!(event.magnitude(), 7.7);
        assert_eq!(event.place(), Some("Pazarcık (Kahramanmaraş)"));
        assert_eq!(event.depth_km(), Some(8.6));
    }

    #[test]
    fn missing_id_is_malformed() {
        let raw = RawEvent {
            native_id: None,
            ..complete_raw()
        };
        assert!(matches!(
            SeismicEvent::try_from(raw),
            Err(TypesError::Malformed(_))
        ));
    }

    #[test]
    fn missing_magnitude_is_malformed() {
        let raw = RawEvent {
            magnitude: None,
            ..complete_raw()
        };
        assert!(SeismicEvent::try_from(raw).is_err());
    }

    #[test]
    fn half_a_coordinate_is_malformed() {
        let raw = RawEvent {
            lon: None,
            ..complete_raw()
        };
        assert!(SeismicEvent::try_from(raw).is_err());
    }

    #[test]
    fn out_of_range_latitude_is_malformed() {
        let raw = RawEvent {
            lat: Some(200.0),
            ..complete_raw()
        };
        assert!(SeismicEvent::try_from(raw).is_err());
    }

    #[test]
    fn nan_magnitude_is_malformed() {
        let raw = RawEvent {
            magnitude: Some(f64::NAN),
            ..complete_raw()
        };
        assert!(SeismicEvent::try_from(raw).is_err());
    }

    #[test]
    fn blank_place_is_dropped() {
        let raw = RawEvent {
            place: Some("   ".into()),
            ..complete_raw()
        };
        let event = SeismicEvent::try_from(raw).unwrap();
        assert_eq!(event.place(), None);
    }

    #[test]
    fn to_raw_preserves_fields() {
        let event = SeismicEvent::try_from(complete_raw()).unwrap();
        assert_eq!(event.to_raw(), complete_raw());
    }

    #[test]
    fn raw_event_msgpack_decodes_partial_payload() {
        // Peers may omit optional fields entirely.
        let partial = RawEvent {
            provider: Some(ProviderTag::Usgs),
            native_id: Some("us7000abcd".into()),
            ..RawEvent::default()
        };
        let bytes = partial.to_bytes().unwrap();
        assert_eq!(RawEvent::from_bytes(&bytes).unwrap(), partial);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(RawEvent::from_bytes(&[0xc1, 0xff, 0x00]).is_err());
    }
}
