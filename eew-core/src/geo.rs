//! Distance and relevance math.
//!
//! All functions here are pure and safe to call from any thread.

use eew_types::{Coordinate, SeismicEvent};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres (haversine).
///
/// The haversine term is clamped to `[0, 1]` so rounding near the poles or
/// across the antimeridian cannot produce NaN.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Whether `point` lies within `radius_km` of `epicenter` (inclusive).
pub fn is_within_radius(epicenter: Coordinate, point: Coordinate, radius_km: f64) -> bool {
    distance_km(epicenter, point) <= radius_km
}

/// A latitude/longitude box given by its north-west and south-east corners.
///
/// When the west edge lies east of the east edge the box wraps across the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// North-west corner.
    pub north_west: Coordinate,
    /// South-east corner.
    pub south_east: Coordinate,
}

impl BoundingBox {
    /// Create a box from its corners.
    pub fn new(north_west: Coordinate, south_east: Coordinate) -> Self {
        Self {
            north_west,
            south_east,
        }
    }

    /// Whether the box spans the antimeridian.
    pub fn wraps_antimeridian(&self) -> bool {
        self.north_west.lon > self.south_east.lon
    }

    /// Whether `point` falls inside the box, edges included.
    pub fn contains(&self, point: Coordinate) -> bool {
        let lat_ok = point.lat <= self.north_west.lat && point.lat >= self.south_east.lat;
        let lon_ok = if self.wraps_antimeridian() {
            point.lon >= self.north_west.lon || point.lon <= self.south_east.lon
        } else {
            point.lon >= self.north_west.lon && point.lon <= self.south_east.lon
        };
        lat_ok && lon_ok
    }
}

/// Result of checking an event against a [`RegionFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relevance {
    /// The event concerns this device.
    Relevant,
    /// Magnitude under the configured threshold.
    BelowThreshold {
        /// Event magnitude.
        magnitude: f64,
        /// Configured threshold.
        threshold: f64,
    },
    /// Epicenter outside the configured bounding box.
    OutsideRegion,
    /// Epicenter farther from the device than the configured radius.
    OutOfRange {
        /// Distance from the device to the epicenter.
        distance_km: f64,
    },
}

impl Relevance {
    /// Whether the event passed every check.
    pub fn is_relevant(&self) -> bool {
        matches!(self, Relevance::Relevant)
    }
}

/// Externally configured relevance rules for incoming events.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFilter {
    /// Optional bounding box the epicenter must fall in.
    pub bounds: Option<BoundingBox>,
    /// Minimum magnitude (inclusive).
    pub min_magnitude: f64,
    /// Device location and radius; when set, the epicenter must be within range.
    pub proximity: Option<(Coordinate, f64)>,
}

impl RegionFilter {
    /// A filter that only applies a magnitude threshold.
    pub fn magnitude_only(min_magnitude: f64) -> Self {
        Self {
            bounds: None,
            min_magnitude,
            proximity: None,
        }
    }

    /// Restrict to a bounding box.
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Restrict to epicenters within `radius_km` of `device`.
    pub fn with_proximity(mut self, device: Coordinate, radius_km: f64) -> Self {
        self.proximity = Some((device, radius_km));
        self
    }

    /// Check an event against every configured rule.
    pub fn is_relevant(&self, event: &SeismicEvent) -> Relevance {
        if event.magnitude() < self.min_magnitude {
            return Relevance::BelowThreshold {
                magnitude: event.magnitude(),
                threshold: self.min_magnitude,
            };
        }
        if let Some(bounds) = &self.bounds {
            if !bounds.contains(event.epicenter()) {
                return Relevance::OutsideRegion;
            }
        }
        if let Some((device, radius_km)) = self.proximity {
            let distance_km = distance_km(event.epicenter(), device);
            if distance_km > radius_km {
                return Relevance::OutOfRange { distance_km };
            }
        }
        Relevance::Relevant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eew_types::{EventId, ProviderTag};

    const ISTANBUL: Coordinate = Coordinate::new(41.0082, 28.9784);
    const ANKARA: Coordinate = Coordinate::new(39.9334, 32.8597);

    fn event_at(magnitude: f64, at: Coordinate) -> SeismicEvent {
        SeismicEvent::new(EventId::new(ProviderTag::Synthetic, "t"), magnitude, at, 0).unwrap()
    }

    #[test]
    fn distance_to_self_is_zero() {
        for p in [
            ISTANBUL,
            ANKARA,
            Coordinate::new(90.0, 0.0),
            Coordinate::new(-90.0, 180.0),
            Coordinate::new(0.0, -180.0),
        ] {
            assert_eq!(distance_km(p, p), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (ISTANBUL, ANKARA),
            (Coordinate::new(-33.9, 151.2), Coordinate::new(51.5, -0.1)),
            (Coordinate::new(10.0, 179.9), Coordinate::new(-10.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn istanbul_ankara_distance() {
        let d = distance_km(ISTANBUL, ANKARA);
        assert!((d - 350.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn antimeridian_takes_short_way() {
        let d = distance_km(Coordinate::new(0.0, 179.5), Coordinate::new(0.0, -179.5));
        assert!((d - 111.2).abs() < 1.0, "got {d}");
    }

    #[test]
    fn antipodal_and_polar_points_are_finite() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);

        let pole = distance_km(Coordinate::new(90.0, 0.0), Coordinate::new(-90.0, 45.0));
        assert!(pole.is_finite());
    }

    #[test]
    fn radius_is_inclusive() {
        let d = distance_km(ISTANBUL, ANKARA);
        assert!(is_within_radius(ISTANBUL, ANKARA, d));
        assert!(!is_within_radius(ISTANBUL, ANKARA, d - 0.001));
    }

    #[test]
    fn bounding_box_contains_turkey() {
        let turkey = BoundingBox::new(Coordinate::new(42.5, 25.5), Coordinate::new(35.5, 45.0));
        assert!(turkey.contains(ISTANBUL));
        assert!(turkey.contains(ANKARA));
        assert!(!turkey.contains(Coordinate::new(48.8, 2.3)));
    }

    #[test]
    fn bounding_box_wraps_antimeridian() {
        let pacific = BoundingBox::new(Coordinate::new(10.0, 170.0), Coordinate::new(-10.0, -170.0));
        assert!(pacific.wraps_antimeridian());
        assert!(pacific.contains(Coordinate::new(0.0, 175.0)));
        assert!(pacific.contains(Coordinate::new(0.0, -175.0)));
        assert!(!pacific.contains(Coordinate::new(0.0, 0.0)));
    }

    #[test]
    fn filter_reports_first_failing_rule() {
        let filter = RegionFilter::magnitude_only(4.0)
            .with_bounds(BoundingBox::new(
                Coordinate::new(42.5, 25.5),
                Coordinate::new(35.5, 45.0),
            ))
            .with_proximity(ISTANBUL, 100.0);

        assert!(matches!(
            filter.is_relevant(&event_at(3.9, ISTANBUL)),
            Relevance::BelowThreshold { .. }
        ));
        assert_eq!(
            filter.is_relevant(&event_at(5.0, Coordinate::new(48.8, 2.3))),
            Relevance::OutsideRegion
        );
        assert!(matches!(
            filter.is_relevant(&event_at(5.0, ANKARA)),
            Relevance::OutOfRange { .. }
        ));
        assert!(filter.is_relevant(&event_at(4.0, ISTANBUL)).is_relevant());
    }
}
