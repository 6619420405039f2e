//! Battery-driven relay roles.
//!
//! A device's role decides how much relay traffic it takes on. It is a pure
//! function of the most recent battery fraction.

use serde::{Deserialize, Serialize};

/// Battery fraction above which a device carries third-party traffic eagerly.
pub const CARRIER_THRESHOLD: f64 = 0.6;

/// Battery fraction at or below which a device only relays SOS traffic.
pub const SOS_ONLY_THRESHOLD: f64 = 0.2;

/// Relay role of this device.
///
/// Defaults to [`RelayRole::Normal`] until a battery sample says otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayRole {
    /// Plenty of battery: relay everything.
    Carrier,
    /// Relay normally.
    #[default]
    Normal,
    /// Conserve power: relay SOS messages only.
    SosOnly,
}

impl RelayRole {
    /// Map a battery fraction to a role.
    ///
    /// Values outside `[0, 1]` are clamped. Returns `None` for NaN, which
    /// callers treat as a failed sample.
    pub fn from_battery(level: f64) -> Option<Self> {
        if level.is_nan() {
            return None;
        }
        let level = level.clamp(0.0, 1.0);
        Some(if level > CARRIER_THRESHOLD {
            RelayRole::Carrier
        } else if level > SOS_ONLY_THRESHOLD {
            RelayRole::Normal
        } else {
            RelayRole::SosOnly
        })
    }

    /// Whether this role relays messages from other devices.
    pub fn forwards_third_party(self) -> bool {
        matches!(self, RelayRole::Carrier | RelayRole::Normal)
    }

    /// Whether this role relays SOS messages. Every role does.
    pub fn forwards_sos(self) -> bool {
        true
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            RelayRole::Carrier => "carrier",
            RelayRole::Normal => "normal",
            RelayRole::SosOnly => "sos_only",
        }
    }
}

impl std::fmt::Display for RelayRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RelayRole> for u8 {
    fn from(role: RelayRole) -> u8 {
        match role {
            RelayRole::Carrier => 0,
            RelayRole::Normal => 1,
            RelayRole::SosOnly => 2,
        }
    }
}

impl TryFrom<u8> for RelayRole {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RelayRole::Carrier),
            1 => Ok(RelayRole::Normal),
            2 => Ok(RelayRole::SosOnly),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representative_levels() {
        assert_eq!(RelayRole::from_battery(0.8), Some(RelayRole::Carrier));
        assert_eq!(RelayRole::from_battery(0.5), Some(RelayRole::Normal));
        assert_eq!(RelayRole::from_battery(0.1), Some(RelayRole::SosOnly));
    }

    #[test]
    fn boundaries_fall_to_lower_role() {
        assert_eq!(RelayRole::from_battery(0.6), Some(RelayRole::Normal));
        assert_eq!(RelayRole::from_battery(0.2), Some(RelayRole::SosOnly));
        assert_eq!(RelayRole::from_battery(0.600_001), Some(RelayRole::Carrier));
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(RelayRole::from_battery(1.7), Some(RelayRole::Carrier));
        assert_eq!(RelayRole::from_battery(-0.3), Some(RelayRole::SosOnly));
        assert_eq!(RelayRole::from_battery(f64::INFINITY), Some(RelayRole::Carrier));
    }

    #[test]
    fn nan_is_a_failed_sample() {
        assert_eq!(RelayRole::from_battery(f64::NAN), None);
    }

    #[test]
    fn forwarding_rules() {
        assert!(RelayRole::Carrier.forwards_third_party());
        assert!(RelayRole::Normal.forwards_third_party());
        assert!(!RelayRole::SosOnly.forwards_third_party());
        assert!(RelayRole::SosOnly.forwards_sos());
    }

    #[test]
    fn u8_conversion_is_stable() {
        for role in [RelayRole::Carrier, RelayRole::Normal, RelayRole::SosOnly] {
            assert_eq!(RelayRole::try_from(u8::from(role)), Ok(role));
        }
        assert_eq!(RelayRole::try_from(9), Err(9));
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&RelayRole::SosOnly).unwrap();
        assert_eq!(json, "\"sos_only\"");
    }
}
