//! Configuration loading for eew-node.
//!
//! Configuration is loaded from a TOML file (default: `node.toml`). Every
//! section and key is optional; omitted values fall back to the defaults
//! below. [`Config::validate`] rejects combinations the pipeline cannot run
//! with.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eew_core::{BoundingBox, Clock, DedupLedger, PollCadence, RegionFilter, RetryPolicy};
use eew_types::{Coordinate, ProviderTag, DEFAULT_MAX_HOPS};
use serde::Deserialize;

/// Root configuration for eew-node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node identity.
    pub node: NodeConfig,
    /// Relevance rules.
    pub region: RegionConfig,
    /// Poll cadence and timeouts.
    pub polling: PollingConfig,
    /// Per-provider retry schedule.
    pub retry: RetryConfig,
    /// Dedup ledger sizing.
    pub dedup: DedupConfig,
    /// Live alert lifetime.
    pub alerts: AlertsConfig,
    /// Relay role refresh and gossip hop budget.
    pub relay: RelayConfig,
    /// Which providers to poll.
    pub providers: ProvidersConfig,
}

/// Node identity.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Device label used as the origin of relayed messages.
    #[serde(default = "default_label")]
    pub label: String,
}

/// Relevance rules for incoming events.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    /// Minimum magnitude (inclusive, default: 3.0).
    #[serde(default = "default_min_magnitude")]
    pub min_magnitude: f64,
    /// North-west corner of the bounding box.
    pub north_west: Option<Coordinate>,
    /// South-east corner of the bounding box.
    pub south_east: Option<Coordinate>,
    /// Device location for radius gating.
    pub device: Option<Coordinate>,
    /// Radius around the device, in kilometres.
    pub radius_km: Option<f64>,
}

/// Poll cadence and timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Interval after an accepted event (default: 5s).
    #[serde(default = "default_fast_interval_secs")]
    pub fast_interval_secs: u64,
    /// Steady-state interval (default: 30s).
    #[serde(default = "default_slow_interval_secs")]
    pub slow_interval_secs: u64,
    /// Quiet time before returning to the slow interval (default: 300s).
    #[serde(default = "default_quiet_period_secs")]
    pub quiet_period_secs: u64,
    /// Timeout for a single fetch attempt (default: 5000ms).
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Deadline for a whole poll cycle, retries included (default: 20000ms).
    #[serde(default = "default_cycle_timeout_ms")]
    pub cycle_timeout_ms: u64,
}

/// Retry schedule for failed fetches within one cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry (default: 500ms).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the exponential delay (default: 8000ms).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Retries after the first attempt (default: 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Random jitter added to each delay, 0 disables (default: 250ms).
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

/// Dedup ledger sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// How long an id suppresses repeats (default: 3600s).
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Maximum ids kept; oldest evicted first (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: Option<usize>,
}

/// Live alert lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// Age after which the live alert is cleared (default: 600s).
    #[serde(default = "default_live_max_age_secs")]
    pub live_max_age_secs: u64,
}

/// Relay policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Battery sampling interval (default: 60s).
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Hop budget for originated envelopes (default: 6).
    #[serde(default = "default_max_hops")]
    pub max_hops: u8,
}

/// Provider selection.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Providers to poll (default: afad, kandilli, usgs).
    #[serde(default = "default_enabled_providers")]
    pub enabled: Vec<ProviderTag>,
    /// Also accept events from the on-device detector (default: false).
    #[serde(default)]
    pub experimental_detector: bool,
}

// Default value functions
fn default_label() -> String {
    "quakewire-node".to_string()
}

fn default_min_magnitude() -> f64 {
    3.0
}

fn default_fast_interval_secs() -> u64 {
    5
}

fn default_slow_interval_secs() -> u64 {
    30
}

fn default_quiet_period_secs() -> u64 {
    300 // 5 minutes
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_cycle_timeout_ms() -> u64 {
    20_000
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_jitter_ms() -> u64 {
    250
}

fn default_retention_secs() -> u64 {
    3600 // 1 hour
}

fn default_max_entries() -> Option<usize> {
    Some(1000)
}

fn default_live_max_age_secs() -> u64 {
    600 // 10 minutes
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_max_hops() -> u8 {
    DEFAULT_MAX_HOPS
}

fn default_enabled_providers() -> Vec<ProviderTag> {
    vec![ProviderTag::Afad, ProviderTag::Kandilli, ProviderTag::Usgs]
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            min_magnitude: default_min_magnitude(),
            north_west: None,
            south_east: None,
            device: None,
            radius_km: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            fast_interval_secs: default_fast_interval_secs(),
            slow_interval_secs: default_slow_interval_secs(),
            quiet_period_secs: default_quiet_period_secs(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            cycle_timeout_ms: default_cycle_timeout_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            live_max_age_secs: default_live_max_age_secs(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            max_hops: default_max_hops(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_providers(),
            experimental_detector: false,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let polling = &self.polling;
        if polling.fast_interval_secs == 0 {
            return Err(invalid("polling.fast_interval_secs must be > 0"));
        }
        if polling.fast_interval_secs > polling.slow_interval_secs {
            return Err(invalid(
                "polling.fast_interval_secs must not exceed polling.slow_interval_secs",
            ));
        }
        if polling.fetch_timeout_ms == 0 || polling.cycle_timeout_ms == 0 {
            return Err(invalid("polling timeouts must be > 0"));
        }

        let region = &self.region;
        if !region.min_magnitude.is_finite() {
            return Err(invalid("region.min_magnitude must be a number"));
        }
        match (region.north_west, region.south_east) {
            (Some(nw), Some(se)) => {
                if !nw.is_valid() || !se.is_valid() {
                    return Err(invalid("region corners are out of range"));
                }
                if nw.lat < se.lat {
                    return Err(invalid("region.north_west must be north of region.south_east"));
                }
            }
            (None, None) => {}
            _ => return Err(invalid("region needs both north_west and south_east")),
        }
        match (region.device, region.radius_km) {
            (Some(device), Some(radius)) => {
                if !device.is_valid() {
                    return Err(invalid("region.device is out of range"));
                }
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(invalid("region.radius_km must be > 0"));
                }
            }
            (None, None) => {}
            _ => return Err(invalid("region needs both device and radius_km")),
        }

        if self.dedup.retention_secs == 0 {
            return Err(invalid("dedup.retention_secs must be > 0"));
        }
        if self.dedup.max_entries == Some(0) {
            return Err(invalid("dedup.max_entries must be > 0"));
        }
        if self.relay.refresh_interval_secs == 0 {
            return Err(invalid("relay.refresh_interval_secs must be > 0"));
        }
        if self.relay.max_hops == 0 {
            return Err(invalid("relay.max_hops must be > 0"));
        }
        if self.enabled_providers().is_empty() {
            return Err(invalid("no providers enabled"));
        }
        Ok(())
    }

    /// Providers to poll, including the on-device detector when enabled.
    pub fn enabled_providers(&self) -> Vec<ProviderTag> {
        let mut enabled = Vec::new();
        for tag in &self.providers.enabled {
            if !enabled.contains(tag) {
                enabled.push(*tag);
            }
        }
        if self.providers.experimental_detector && !enabled.contains(&ProviderTag::Synthetic) {
            enabled.push(ProviderTag::Synthetic);
        }
        enabled
    }

    /// Relevance filter built from `[region]`.
    pub fn region_filter(&self) -> RegionFilter {
        let mut filter = RegionFilter::magnitude_only(self.region.min_magnitude);
        if let (Some(nw), Some(se)) = (self.region.north_west, self.region.south_east) {
            filter = filter.with_bounds(BoundingBox::new(nw, se));
        }
        if let (Some(device), Some(radius_km)) = (self.region.device, self.region.radius_km) {
            filter = filter.with_proximity(device, radius_km);
        }
        filter
    }

    /// Retry schedule built from `[retry]`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            max_retries: self.retry.max_retries,
            jitter_max: Duration::from_millis(self.retry.jitter_ms),
        }
    }

    /// Poll cadence built from `[polling]`.
    pub fn poll_cadence(&self) -> PollCadence {
        PollCadence::new(
            Duration::from_secs(self.polling.fast_interval_secs),
            Duration::from_secs(self.polling.slow_interval_secs),
            Duration::from_secs(self.polling.quiet_period_secs),
        )
    }

    /// Dedup ledger built from `[dedup]`.
    pub fn dedup_ledger(&self, clock: Arc<dyn Clock>) -> DedupLedger {
        let ledger =
            DedupLedger::new(clock).with_retention(Duration::from_secs(self.dedup.retention_secs));
        match self.dedup.max_entries {
            Some(max) => ledger.with_max_entries(max),
            None => ledger,
        }
    }

    /// Timeout for a single fetch attempt.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.polling.fetch_timeout_ms)
    }

    /// Deadline for a whole poll cycle.
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.polling.cycle_timeout_ms)
    }

    /// Age after which the live alert is cleared.
    pub fn live_max_age(&self) -> Duration {
        Duration::from_secs(self.alerts.live_max_age_secs)
    }

    /// Battery sampling interval.
    pub fn relay_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.relay.refresh_interval_secs)
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid(reason.to_string())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
