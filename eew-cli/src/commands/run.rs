//! Replay a scenario through a full node.

use anyhow::{Context, Result};
use eew_core::{Clock, ManualClock, SystemClock};
use eew_node::{
    AlertIngestOrchestrator, BatterySampler, Config, LogDispatcher, MockBattery, NodeStatus,
    Notifier, PeerBroadcaster, ProviderAdapter, RelayPolicy,
};
use eew_types::RelayEnvelope;
use std::path::Path;
use std::sync::Arc;

use crate::scenario::Scenario;

/// Run the replay.
///
/// Cycles run back to back. With a scenario `start_ms` the node clock is
/// simulated and advanced by the cadence interval after every cycle;
/// otherwise wall-clock time is used.
pub async fn run(
    config_path: Option<&Path>,
    scenario_path: &Path,
    battery: Option<f64>,
    cycles: Option<u32>,
) -> Result<NodeStatus> {
    let config = match config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    let scenario = Scenario::from_file(scenario_path)?;
    let cycles = cycles.unwrap_or_else(|| scenario.cycles());

    let enabled = config.enabled_providers();
    for tag in scenario.providers.keys() {
        if !enabled.contains(tag) {
            tracing::warn!(provider = %tag, "Scripted provider is not enabled, its steps will not run");
        }
    }

    let manual_clock = scenario.start_ms.map(ManualClock::new);
    let clock: Arc<dyn Clock> = match &manual_clock {
        Some(clock) => Arc::new(clock.clone()),
        None => Arc::new(SystemClock),
    };
    let max_hops = config.relay.max_hops;
    let attempts = config.retry_policy().max_attempts();
    let label = config.node.label.clone();

    let mut builder = AlertIngestOrchestrator::builder(config)
        .clock(clock)
        .notifier(Arc::new(LogDispatcher) as Arc<dyn Notifier>)
        .broadcaster(Arc::new(LogDispatcher) as Arc<dyn PeerBroadcaster>);
    for provider in scenario.providers(attempts) {
        builder = builder.provider(Arc::new(provider) as Arc<dyn ProviderAdapter>);
    }
    if let Some(level) = battery {
        let policy = RelayPolicy::new(Arc::new(MockBattery::new(level)) as Arc<dyn BatterySampler>);
        let role = policy
            .refresh()
            .await
            .with_context(|| format!("Invalid battery level {level}"))?;
        tracing::info!(level, role = %role, "Relay role set from battery");
        builder = builder.relay_policy(Arc::new(policy));
    }
    let node = builder.build().context("Failed to build node")?;

    tracing::info!(label = %label, cycles, "Replaying scenario");
    for cycle in 1..=cycles {
        let report = node.run_cycle().await;
        tracing::info!(
            cycle,
            dispatched = report.dispatched,
            succeeded = ?report.succeeded,
            failed = ?report.failed,
            abandoned = ?report.abandoned,
            "Cycle complete"
        );

        for peer in scenario.peers_after(cycle) {
            let bytes = RelayEnvelope::new(peer.origin.as_str(), &peer.event, max_hops)
                .and_then(|envelope| envelope.to_bytes())
                .context("Failed to encode peer envelope")?;
            let outcome = node.on_envelope(&bytes);
            tracing::info!(cycle, origin = %peer.origin, outcome = ?outcome, "Peer envelope delivered");
        }

        let interval = node.next_interval();
        tracing::debug!(cycle, cadence = ?node.cadence_mode(), "Next poll in {:?}", interval);
        if let Some(clock) = &manual_clock {
            clock.advance(interval);
        }
    }

    Ok(node.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eew_core::{CadenceMode, RelayRole};
    use tempfile::tempdir;

    const START_MS: u64 = 1_700_000_000_000;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn scenario_json() -> String {
        format!(
            r#"{{
                "start_ms": {START_MS},
                "providers": {{
                    "afad": [
                        {{ "events": [{{ "native_id": "a1", "magnitude": 4.8, "lat": 40.0, "lon": 29.0, "origin_ms": {} }}] }},
                        {{ "events": [{{ "native_id": "a1", "magnitude": 4.8, "lat": 40.0, "lon": 29.0, "origin_ms": {} }}] }}
                    ],
                    "kandilli": [
                        {{ "events": [{{ "native_id": "k1", "magnitude": 2.1, "lat": 40.0, "lon": 29.0, "origin_ms": {} }}] }}
                    ]
                }},
                "peers": [
                    {{ "origin": "node-b", "after_cycle": 2, "event": {{ "provider": "usgs", "native_id": "u1", "magnitude": 5.2, "lat": 40.2, "lon": 29.1, "origin_ms": {} }} }}
                ]
            }}"#,
            START_MS - 20_000,
            START_MS - 20_000,
            START_MS - 10_000,
            START_MS - 5_000,
        )
    }

    #[tokio::test]
    async fn replay_dispatches_and_drops() {
        let dir = tempdir().unwrap();
        let scenario = write(dir.path(), "scenario.json", &scenario_json());

        let status = run(None, &scenario, None, None).await.unwrap();

        assert_eq!(status.metrics.cycles_total, 2);
        // a1 then the newer peer alert; the repeat of a1 is a duplicate and
        // the M2.1 kandilli event is below the default threshold.
        assert_eq!(status.metrics.dispatched_total, 2);
        assert_eq!(status.metrics.duplicates_dropped, 1);
        assert_eq!(status.metrics.irrelevant_dropped, 1);
        assert_eq!(status.live.unwrap().event_id.native_id, "u1");
        assert_eq!(status.cadence, CadenceMode::Fast);
        assert_eq!(status.relay_role, None);
    }

    #[tokio::test]
    async fn battery_sets_relay_role() {
        let dir = tempdir().unwrap();
        let scenario = write(dir.path(), "scenario.json", r#"{ "start_ms": 0 }"#);

        let status = run(None, &scenario, Some(0.1), Some(1)).await.unwrap();
        assert_eq!(status.relay_role, Some(RelayRole::SosOnly));
        assert_eq!(status.metrics.cycles_total, 1);
    }

    #[tokio::test]
    async fn nan_battery_is_rejected() {
        let dir = tempdir().unwrap();
        let scenario = write(dir.path(), "scenario.json", r#"{ "start_ms": 0 }"#);

        assert!(run(None, &scenario, Some(f64::NAN), Some(1)).await.is_err());
    }

    #[tokio::test]
    async fn config_disables_provider() {
        let dir = tempdir().unwrap();
        let config = write(
            dir.path(),
            "node.toml",
            r#"
[providers]
enabled = ["kandilli"]
"#,
        );
        let scenario = write(dir.path(), "scenario.json", &scenario_json());

        let status = run(Some(&config), &scenario, None, Some(2)).await.unwrap();
        // afad is not enabled, only the peer alert is dispatched.
        assert_eq!(status.metrics.dispatched_total, 1);
        assert!(status
            .providers
            .iter()
            .all(|(tag, _)| *tag == eew_types::ProviderTag::Kandilli));
    }

    #[tokio::test]
    async fn error_step_fails_its_whole_cycle() {
        let dir = tempdir().unwrap();
        let config = write(
            dir.path(),
            "node.toml",
            "[retry]\nbase_delay_ms = 1\nmax_delay_ms = 1\njitter_ms = 0\n",
        );
        let scenario = write(
            dir.path(),
            "scenario.json",
            &format!(
                r#"{{
                    "start_ms": {START_MS},
                    "providers": {{
                        "afad": [
                            {{ "error": "HTTP 503" }},
                            {{ "events": [{{ "native_id": "a2", "magnitude": 4.8, "lat": 40.0, "lon": 29.0, "origin_ms": {} }}] }}
                        ]
                    }}
                }}"#,
                START_MS - 1_000
            ),
        );

        // Retries within cycle 1 must not reach the cycle 2 step.
        let status = run(Some(&config), &scenario, None, Some(1)).await.unwrap();
        assert_eq!(status.metrics.dispatched_total, 0);
        assert!(status.live.is_none());
        assert_eq!(status.metrics.fetch_failures, 3);
        let (_, afad) = &status.providers[0];
        assert_eq!(afad.consecutive_failures, 1);

        let status = run(Some(&config), &scenario, None, Some(2)).await.unwrap();
        assert_eq!(status.metrics.dispatched_total, 1);
        assert_eq!(status.live.unwrap().event_id.native_id, "a2");
    }

    #[tokio::test]
    async fn invalid_config_fails() {
        let dir = tempdir().unwrap();
        let config = write(dir.path(), "node.toml", "[polling]\nfast_interval_secs = 0\n");
        let scenario = write(dir.path(), "scenario.json", "{}");

        let err = run(Some(&config), &scenario, None, Some(1)).await.unwrap_err();
        assert!(format!("{err:#}").contains("node.toml"));
    }
}
