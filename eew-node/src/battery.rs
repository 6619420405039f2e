//! Battery-driven relay policy.
//!
//! [`RelayPolicy`] samples the battery through an injected
//! [`BatterySampler`], maps the level to a [`RelayRole`] and keeps the last
//! computed role for the peer transport to consult. A failed sample leaves
//! the role unchanged.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use eew_core::RelayRole;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SamplerError;

/// Reads the device battery level.
#[async_trait]
pub trait BatterySampler: Send + Sync {
    /// Battery level as a fraction, nominally in `[0, 1]`.
    async fn sample_level(&self) -> Result<f64, SamplerError>;
}

/// Relay role holder, refreshed from a battery sampler.
pub struct RelayPolicy {
    sampler: Arc<dyn BatterySampler>,
    role: AtomicU8,
}

impl std::fmt::Debug for RelayPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayPolicy")
            .field("role", &self.current())
            .finish_non_exhaustive()
    }
}

impl RelayPolicy {
    /// Create a policy in the [`RelayRole::Normal`] role.
    pub fn new(sampler: Arc<dyn BatterySampler>) -> Self {
        Self {
            sampler,
            role: AtomicU8::new(RelayRole::default().into()),
        }
    }

    /// Last computed role. Never blocks.
    pub fn current(&self) -> RelayRole {
        RelayRole::try_from(self.role.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Sample the battery and recompute the role.
    ///
    /// On sampler failure (including a NaN reading) the previous role is
    /// kept and the error is returned.
    pub async fn refresh(&self) -> Result<RelayRole, SamplerError> {
        let level = self.sampler.sample_level().await?;
        let role = RelayRole::from_battery(level).ok_or(SamplerError::NotANumber)?;

        let previous = self.role.swap(role.into(), Ordering::AcqRel);
        if previous != u8::from(role) {
            tracing::info!(level, role = %role, "Relay role changed");
        } else {
            tracing::debug!(level, role = %role, "Relay role unchanged");
        }
        Ok(role)
    }
}

/// Spawn a task that refreshes `policy` every `period` until `cancel` fires.
///
/// The first refresh runs immediately.
pub fn spawn_refresh_task(
    policy: Arc<RelayPolicy>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Relay refresh task started (interval: {:?})", period);
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = timer.tick() => {
                    if let Err(e) = policy.refresh().await {
                        tracing::warn!("Battery sample failed, keeping role {}: {}", policy.current(), e);
                    }
                }
            }
        }
        tracing::info!("Relay refresh task stopped");
    })
}

/// Scripted battery sampler for testing.
///
/// Returns queued readings in order, then repeats the last one.
#[derive(Debug, Clone, Default)]
pub struct MockBattery {
    inner: Arc<Mutex<MockBatteryInner>>,
}

#[derive(Debug, Default)]
struct MockBatteryInner {
    queued: std::collections::VecDeque<Result<f64, SamplerError>>,
    last: Option<f64>,
    samples: u32,
}

impl MockBattery {
    /// Create a sampler that always reads `level`.
    pub fn new(level: f64) -> Self {
        let battery = Self::default();
        battery.set_level(level);
        battery
    }

    /// Set the standing level.
    pub fn set_level(&self, level: f64) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).last = Some(level);
    }

    /// Queue one reading.
    pub fn push_level(&self, level: f64) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queued
            .push_back(Ok(level));
    }

    /// Queue one failed reading.
    pub fn push_error(&self, error: SamplerError) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queued
            .push_back(Err(error));
    }

    /// Number of samples taken.
    pub fn samples(&self) -> u32 {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).samples
    }
}

#[async_trait]
impl BatterySampler for MockBattery {
    async fn sample_level(&self) -> Result<f64, SamplerError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.samples += 1;
        match inner.queued.pop_front() {
            Some(Ok(level)) => {
                inner.last = Some(level);
                Ok(level)
            }
            Some(Err(e)) => Err(e),
            None => inner
                .last
                .ok_or_else(|| SamplerError::Unavailable("no reading".into())),
        }
    }
}
