//! Alert ingest orchestrator.
//!
//! Polls every provider concurrently, validates and deduplicates what they
//! return, filters by region, merges into the live/last state and dispatches
//! alerts that newly became live. Peer-relayed alerts enter through
//! [`AlertIngestOrchestrator::on_receive`] and follow the same pipeline.
//!
//! # Cycle
//!
//! ```text
//! expire_live ─► fetch all providers (FuturesUnordered, per-attempt timeout,
//!                retry with backoff, cycle deadline)
//!             ─► for each result, in completion order:
//!                validate ─► ledger ─► region filter ─► merge ─► dispatch
//! ```
//!
//! A slow or failing provider only delays its own results: everything that
//! completes earlier is processed and dispatched immediately.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use eew_core::{
    AlertState, CadenceMode, Clock, MergeOutcome, PollCadence, RegionFilter, RelayRole,
    RetryPolicy, SharedDedupLedger, SystemClock,
};
use eew_types::{
    AlertRecord, MessageId, ProviderTag, RawEvent, RelayEnvelope, SeismicEvent, TypesError,
    ENVELOPE_VERSION,
};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::battery::RelayPolicy;
use crate::config::Config;
use crate::dispatch::{LogDispatcher, Notifier, PeerBroadcaster};
use crate::error::{NodeError, ProviderError};
use crate::metrics::{IngestMetrics, NodeStatus, ProviderStatus};
use crate::provider::ProviderAdapter;

/// What happened to one candidate event or peer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Failed to decode or validate. Not recorded in the ledger.
    Malformed,
    /// Envelope had no hops left.
    HopsExhausted,
    /// Already seen within the retention window.
    Duplicate,
    /// Merged into the alert state.
    Merged(MergeOutcome),
}

impl IngestOutcome {
    /// Whether the candidate was dispatched.
    pub fn dispatched(self) -> bool {
        matches!(self, IngestOutcome::Merged(MergeOutcome::BecameLive))
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Alerts dispatched during the cycle.
    pub dispatched: usize,
    /// Providers that returned successfully.
    pub succeeded: Vec<ProviderTag>,
    /// Providers that failed after exhausting retries.
    pub failed: Vec<ProviderTag>,
    /// Providers still pending at the cycle deadline.
    pub abandoned: Vec<ProviderTag>,
}

#[derive(Debug, Clone)]
enum Source {
    Provider(ProviderTag),
    /// Carries the envelope to re-broadcast, `None` once the hop budget is spent.
    Peer(Option<RelayEnvelope>),
}

impl Source {
    fn label(&self) -> &'static str {
        match self {
            Source::Provider(tag) => tag.as_str(),
            Source::Peer(_) => "peer",
        }
    }
}

/// Builder for [`AlertIngestOrchestrator`].
pub struct OrchestratorBuilder {
    config: Config,
    providers: Vec<Arc<dyn ProviderAdapter>>,
    notifier: Option<Arc<dyn Notifier>>,
    broadcaster: Option<Arc<dyn PeerBroadcaster>>,
    clock: Option<Arc<dyn Clock>>,
    relay: Option<Arc<RelayPolicy>>,
}

impl OrchestratorBuilder {
    /// Add a provider adapter. Adapters for providers not enabled in the
    /// configuration are skipped at build time.
    pub fn provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Set the notification collaborator (default: log only).
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the peer broadcast collaborator (default: log only).
    pub fn broadcaster(mut self, broadcaster: Arc<dyn PeerBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Set the wall clock (default: system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Attach a relay policy. Peer alerts are only re-broadcast while the
    /// current role forwards third-party traffic.
    pub fn relay_policy(mut self, relay: Arc<RelayPolicy>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Validate the configuration and build the orchestrator.
    pub fn build(self) -> Result<AlertIngestOrchestrator, NodeError> {
        self.config.validate()?;

        let enabled = self.config.enabled_providers();
        let providers: Vec<_> = self
            .providers
            .into_iter()
            .filter(|p| {
                let keep = enabled.contains(&p.tag());
                if !keep {
                    tracing::info!(provider = %p.tag(), "Provider disabled by configuration");
                }
                keep
            })
            .collect();

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let health = DashMap::new();
        for provider in &providers {
            health.insert(provider.tag(), ProviderStatus::default());
        }

        Ok(AlertIngestOrchestrator {
            label: self.config.node.label.clone(),
            max_hops: self.config.relay.max_hops,
            ledger: SharedDedupLedger::new(self.config.dedup_ledger(Arc::clone(&clock))),
            state: Arc::new(AlertState::new()),
            filter: self.config.region_filter(),
            cadence: Mutex::new(self.config.poll_cadence()),
            retry: self.config.retry_policy(),
            fetch_timeout: self.config.fetch_timeout(),
            cycle_timeout: self.config.cycle_timeout(),
            live_max_age_ms: self.config.live_max_age().as_millis() as u64,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogDispatcher) as Arc<dyn Notifier>),
            broadcaster: self.broadcaster
                .unwrap_or_else(|| Arc::new(LogDispatcher) as Arc<dyn PeerBroadcaster>),
            relay: self.relay,
            providers,
            clock,
            health,
            metrics: IngestMetrics::default(),
        })
    }
}

/// Polls providers, accepts peer messages and drives the alert state.
pub struct AlertIngestOrchestrator {
    label: String,
    max_hops: u8,
    providers: Vec<Arc<dyn ProviderAdapter>>,
    ledger: SharedDedupLedger,
    state: Arc<AlertState>,
    filter: RegionFilter,
    cadence: Mutex<PollCadence>,
    retry: RetryPolicy,
    fetch_timeout: Duration,
    cycle_timeout: Duration,
    live_max_age_ms: u64,
    notifier: Arc<dyn Notifier>,
    broadcaster: Arc<dyn PeerBroadcaster>,
    clock: Arc<dyn Clock>,
    relay: Option<Arc<RelayPolicy>>,
    health: DashMap<ProviderTag, ProviderStatus>,
    metrics: IngestMetrics,
}

impl std::fmt::Debug for AlertIngestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertIngestOrchestrator")
            .field("label", &self.label)
            .field("providers", &self.providers.len())
            .field("ledger", &self.ledger)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl AlertIngestOrchestrator {
    /// Start building an orchestrator from `config`.
    pub fn builder(config: Config) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            providers: Vec::new(),
            notifier: None,
            broadcaster: None,
            clock: None,
            relay: None,
        }
    }

    /// Shared live/last state, for UI readers.
    pub fn alert_state(&self) -> Arc<AlertState> {
        Arc::clone(&self.state)
    }

    /// Handle to the dedup ledger.
    pub fn ledger(&self) -> &SharedDedupLedger {
        &self.ledger
    }

    /// Pipeline counters.
    pub fn metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    /// Health of one provider.
    pub fn provider_status(&self, tag: ProviderTag) -> Option<ProviderStatus> {
        self.health.get(&tag).map(|s| s.value().clone())
    }

    /// Time to wait before the next cycle.
    pub fn next_interval(&self) -> Duration {
        let now = self.clock.now_ms();
        self.cadence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .interval(now)
    }

    /// Current cadence mode.
    pub fn cadence_mode(&self) -> CadenceMode {
        let now = self.clock.now_ms();
        self.cadence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mode(now)
    }

    /// Wrap `record` in a fresh envelope originating from this node.
    pub fn envelope_for(&self, record: &AlertRecord) -> Result<RelayEnvelope, TypesError> {
        RelayEnvelope::new(self.label.clone(), &record.to_raw(), self.max_hops)
    }

    /// Serializable status snapshot.
    pub fn status(&self) -> NodeStatus {
        let snapshot = self.state.snapshot();
        let mut providers: Vec<_> = self
            .health
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        providers.sort_by_key(|(tag, _)| *tag);

        NodeStatus {
            label: self.label.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            cadence: self.cadence_mode(),
            relay_role: self.relay.as_ref().map(|r| r.current()),
            ledger_entries: self.ledger.len(),
            live: snapshot.live.clone(),
            last: snapshot.last.clone(),
            providers,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Run one poll cycle over every provider.
    pub async fn run_cycle(&self) -> CycleReport {
        let now = self.clock.now_ms();
        if let Some(expired) = self.state.expire_live(self.live_max_age_ms, now) {
            tracing::info!(event = %expired.event_id, "Live alert expired");
        }

        let deadline = tokio::time::Instant::now() + self.cycle_timeout;
        let mut pending: FuturesUnordered<_> = self
            .providers
            .iter()
            .enumerate()
            .map(|(idx, provider)| self.fetch_with_retry(idx, provider))
            .collect();
        let mut done = vec![false; self.providers.len()];
        let mut report = CycleReport::default();

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((idx, tag, Ok(events)))) => {
                    done[idx] = true;
                    self.mark_success(tag);
                    report.succeeded.push(tag);
                    tracing::debug!(provider = %tag, count = events.len(), "Fetched events");
                    for raw in events {
                        if self.ingest(raw, Source::Provider(tag)).dispatched() {
                            report.dispatched += 1;
                        }
                    }
                }
                Ok(Some((idx, tag, Err(e)))) => {
                    done[idx] = true;
                    self.mark_failure(tag, e.to_string());
                    report.failed.push(tag);
                }
                Ok(None) => break,
                Err(_) => {
                    for (idx, provider) in self.providers.iter().enumerate() {
                        if !done[idx] {
                            let tag = provider.tag();
                            tracing::warn!(provider = %tag, "Provider abandoned at cycle deadline");
                            IngestMetrics::incr(&self.metrics.providers_abandoned);
                            self.mark_failure(tag, "abandoned at cycle deadline".to_string());
                            report.abandoned.push(tag);
                        }
                    }
                    break;
                }
            }
        }

        IngestMetrics::incr(&self.metrics.cycles_total);
        report
    }

    /// Poll until `cancel` fires. The in-flight cycle always completes.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            node = %self.label,
            providers = self.providers.len(),
            "Alert ingest started"
        );
        while !cancel.is_cancelled() {
            let report = self.run_cycle().await;
            let wait = self.next_interval();
            tracing::debug!(
                dispatched = report.dispatched,
                failed = report.failed.len(),
                abandoned = report.abandoned.len(),
                next_in = ?wait,
                "Cycle complete"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }
        }
        tracing::info!(node = %self.label, "Alert ingest stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Accept a peer-relayed event.
    ///
    /// The payload is a MessagePack [`RawEvent`]. Malformed payloads are
    /// dropped before the message id is recorded, so a later well-formed
    /// copy of the same message is still processed.
    ///
    /// For transports that carry no hop count. A re-broadcast keeps
    /// `message_id` and starts from the configured hop budget, less this hop.
    pub fn on_receive(&self, message_id: &MessageId, payload: &[u8]) -> IngestOutcome {
        let relay = RelayEnvelope {
            version: ENVELOPE_VERSION,
            message_id: message_id.clone(),
            origin: self.label.clone(),
            hops_remaining: self.max_hops,
            sent_at_ms: self.clock.now_ms(),
            payload: payload.to_vec(),
        };
        self.receive(message_id, payload, relay.forwarded())
    }

    /// Accept a full relay envelope from the peer transport.
    ///
    /// A dispatched alert is re-broadcast under the same message id with one
    /// hop consumed, or not at all when this was its last hop.
    pub fn on_envelope(&self, bytes: &[u8]) -> IngestOutcome {
        let envelope = match RelayEnvelope::from_bytes(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Dropping undecodable envelope: {}", e);
                IngestMetrics::incr(&self.metrics.events_received);
                IngestMetrics::incr(&self.metrics.malformed_dropped);
                return IngestOutcome::Malformed;
            }
        };
        if envelope.hops_remaining == 0 {
            tracing::debug!(message_id = ?envelope.message_id, origin = %envelope.origin, "Envelope out of hops");
            return IngestOutcome::HopsExhausted;
        }
        self.receive(&envelope.message_id, &envelope.payload, envelope.forwarded())
    }

    fn receive(
        &self,
        message_id: &MessageId,
        payload: &[u8],
        forward: Option<RelayEnvelope>,
    ) -> IngestOutcome {
        IngestMetrics::incr(&self.metrics.events_received);
        let event = match RawEvent::from_bytes(payload).and_then(SeismicEvent::try_from) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(message_id = ?message_id, "Dropping malformed peer message: {}", e);
                IngestMetrics::incr(&self.metrics.malformed_dropped);
                return IngestOutcome::Malformed;
            }
        };

        if self.ledger.seen(&message_id.ledger_key()) {
            tracing::debug!(message_id = ?message_id, "Duplicate peer message");
            IngestMetrics::incr(&self.metrics.duplicates_dropped);
            return IngestOutcome::Duplicate;
        }
        IngestMetrics::incr(&self.metrics.peer_messages);
        self.process(event, Source::Peer(forward))
    }

    async fn fetch_with_retry(
        &self,
        idx: usize,
        provider: &Arc<dyn ProviderAdapter>,
    ) -> (usize, ProviderTag, Result<Vec<RawEvent>, ProviderError>) {
        let tag = provider.tag();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.fetch_timeout, provider.fetch_latest()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: tag,
                    elapsed: self.fetch_timeout,
                }),
            };

            let error = match result {
                Ok(events) => return (idx, tag, Ok(events)),
                Err(e) => e,
            };
            IngestMetrics::incr(&self.metrics.fetch_failures);

            match self.retry.delay_for(attempt) {
                Some(delay) => {
                    tracing::warn!(provider = %tag, attempt, ?delay, "Fetch failed, retrying: {}", error);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!(provider = %tag, attempt, "Fetch failed, giving up this cycle: {}", error);
                    return (idx, tag, Err(error));
                }
            }
        }
    }

    fn ingest(&self, raw: RawEvent, source: Source) -> IngestOutcome {
        IngestMetrics::incr(&self.metrics.events_received);
        match SeismicEvent::try_from(raw) {
            Ok(event) => self.process(event, source),
            Err(e) => {
                tracing::warn!(source = source.label(), "Dropping malformed event: {}", e);
                IngestMetrics::incr(&self.metrics.malformed_dropped);
                IngestOutcome::Malformed
            }
        }
    }

    fn process(&self, event: SeismicEvent, source: Source) -> IngestOutcome {
        if self.ledger.seen(&event.id().ledger_key()) {
            tracing::debug!(event = %event.id(), "Duplicate event");
            IngestMetrics::incr(&self.metrics.duplicates_dropped);
            return IngestOutcome::Duplicate;
        }

        let relevance = self.filter.is_relevant(&event);
        let record = AlertRecord::from(&event);
        let outcome = self.state.merge(&record, relevance.is_relevant());

        match outcome {
            MergeOutcome::Irrelevant => {
                tracing::debug!(event = %event.id(), reason = ?relevance, "Irrelevant event");
                IngestMetrics::incr(&self.metrics.irrelevant_dropped);
            }
            MergeOutcome::BecameLive => {
                self.record_accepted();
                tracing::info!(
                    event = %event.id(),
                    source = source.label(),
                    magnitude = event.magnitude(),
                    place = %record.place,
                    "Alert became live"
                );
                self.dispatch(&record, source);
            }
            MergeOutcome::UpdatedLast | MergeOutcome::Stale => {
                self.record_accepted();
                tracing::debug!(event = %event.id(), outcome = ?outcome, "Alert merged without dispatch");
            }
        }
        IngestOutcome::Merged(outcome)
    }

    fn dispatch(&self, record: &AlertRecord, source: Source) {
        IngestMetrics::incr(&self.metrics.dispatched_total);
        self.notifier.notify(record);

        let envelope = match source {
            Source::Provider(_) => match self.envelope_for(record) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::error!(event = %record.event_id, "Failed to encode relay envelope: {}", e);
                    return;
                }
            },
            Source::Peer(forward) => {
                let role = self.relay.as_ref().map(|r| r.current());
                if !role.map_or(true, RelayRole::forwards_third_party) {
                    tracing::debug!(event = %record.event_id, role = ?role, "Not re-broadcasting peer alert");
                    return;
                }
                match forward {
                    Some(envelope) => envelope,
                    None => {
                        tracing::debug!(event = %record.event_id, "Hop budget spent, not re-broadcasting");
                        return;
                    }
                }
            }
        };
        self.broadcaster.broadcast(&envelope);
    }

    fn record_accepted(&self) {
        let now = self.clock.now_ms();
        self.cadence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_accepted(now);
    }

    fn mark_success(&self, tag: ProviderTag) {
        let now = self.clock.now_ms();
        let mut status = self.health.entry(tag).or_default();
        status.last_success_ms = Some(now);
        status.consecutive_failures = 0;
    }

    fn mark_failure(&self, tag: ProviderTag, error: String) {
        let mut status = self.health.entry(tag).or_default();
        status.last_error = Some(error);
        status.consecutive_failures = status.consecutive_failures.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::MockBattery;
    use crate::dispatch::RecordingDispatcher;
    use crate::provider::MockProvider;
    use eew_core::ManualClock;
    use eew_types::Coordinate;

    const NOW: u64 = 1_700_000_000_000;

    fn raw(provider: ProviderTag, id: &str, magnitude: f64, origin_ms: u64) -> RawEvent {
        RawEvent {
            provider: Some(provider),
            native_id: Some(id.into()),
            magnitude: Some(magnitude),
            lat: Some(40.9),
            lon: Some(29.1),
            origin_ms: Some(origin_ms),
            place: Some("Marmara Sea".into()),
            depth_km: Some(10.0),
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.retry.jitter_ms = 0;
        config.region.min_magnitude = 4.0;
        config.region.device = Some(Coordinate::new(41.0082, 28.9784));
        config.region.radius_km = Some(300.0);
        config
    }

    struct Harness {
        orchestrator: AlertIngestOrchestrator,
        dispatcher: RecordingDispatcher,
        clock: ManualClock,
    }

    fn harness(config: Config, providers: &[MockProvider]) -> Harness {
        let dispatcher = RecordingDispatcher::new();
        let clock = ManualClock::new(NOW);
        let mut builder = AlertIngestOrchestrator::builder(config)
            .notifier(Arc::new(dispatcher.clone()))
            .broadcaster(Arc::new(dispatcher.clone()))
            .clock(Arc::new(clock.clone()));
        for p in providers {
            builder = builder.provider(Arc::new(p.clone()));
        }
        Harness {
            orchestrator: builder.build().unwrap(),
            dispatcher,
            clock,
        }
    }

    #[tokio::test]
    async fn relevant_event_is_dispatched_once() {
        let afad = MockProvider::new(ProviderTag::Afad);
        afad.set_events(vec![raw(ProviderTag::Afad, "1", 5.2, NOW)]);
        let h = harness(test_config(), &[afad]);

        let first = h.orchestrator.run_cycle().await;
        let second = h.orchestrator.run_cycle().await;

        assert_eq!(first.dispatched, 1);
        assert_eq!(second.dispatched, 0);
        assert_eq!(h.dispatcher.notified().len(), 1);
        let sent = h.dispatcher.broadcasts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].origin, "quakewire-node");
        assert_eq!(sent[0].hops_remaining, eew_types::DEFAULT_MAX_HOPS);
        assert_eq!(h.orchestrator.metrics().snapshot().duplicates_dropped, 1);
    }

    #[tokio::test]
    async fn malformed_event_is_not_recorded() {
        let afad = MockProvider::new(ProviderTag::Afad);
        let mut broken = raw(ProviderTag::Afad, "9", 5.0, NOW);
        broken.magnitude = None;
        afad.push_events(vec![broken]);
        afad.push_events(vec![raw(ProviderTag::Afad, "9", 5.0, NOW)]);
        let h = harness(test_config(), &[afad]);

        h.orchestrator.run_cycle().await;
        assert!(!h.orchestrator.ledger().contains("afad:9"));
        assert_eq!(h.orchestrator.metrics().snapshot().malformed_dropped, 1);

        // The corrected event is still accepted.
        assert_eq!(h.orchestrator.run_cycle().await.dispatched, 1);
    }

    #[tokio::test]
    async fn irrelevant_events_do_not_touch_state() {
        let usgs = MockProvider::new(ProviderTag::Usgs);
        let mut far = raw(ProviderTag::Usgs, "far", 6.5, NOW);
        far.lat = Some(35.6);
        far.lon = Some(139.7);
        usgs.set_events(vec![raw(ProviderTag::Usgs, "small", 2.1, NOW), far]);
        let h = harness(test_config(), &[usgs]);

        let report = h.orchestrator.run_cycle().await;

        assert_eq!(report.dispatched, 0);
        assert!(h.dispatcher.calls().is_empty());
        assert_eq!(
            *h.orchestrator.alert_state().snapshot(),
            eew_core::AlertSnapshot::default()
        );
        assert_eq!(h.orchestrator.metrics().snapshot().irrelevant_dropped, 2);
    }

    #[tokio::test]
    async fn older_event_does_not_dispatch() {
        let afad = MockProvider::new(ProviderTag::Afad);
        afad.push_events(vec![raw(ProviderTag::Afad, "new", 5.0, NOW)]);
        afad.push_events(vec![raw(ProviderTag::Afad, "old", 5.0, NOW - 60_000)]);
        let h = harness(test_config(), &[afad]);

        h.orchestrator.run_cycle().await;
        let report = h.orchestrator.run_cycle().await;

        assert_eq!(report.dispatched, 0);
        assert_eq!(h.dispatcher.notified().len(), 1);
        let live = h.orchestrator.alert_state().live().unwrap();
        assert_eq!(live.event_id.native_id, "new");
    }

    #[tokio::test]
    async fn live_alert_expires_at_cycle_start() {
        let mut config = test_config();
        config.alerts.live_max_age_secs = 60;
        let afad = MockProvider::new(ProviderTag::Afad);
        afad.push_events(vec![raw(ProviderTag::Afad, "1", 5.0, NOW)]);
        let h = harness(config, &[afad]);

        h.orchestrator.run_cycle().await;
        assert!(h.orchestrator.alert_state().live().is_some());

        h.clock.advance(Duration::from_secs(61));
        h.orchestrator.run_cycle().await;
        let snapshot = h.orchestrator.alert_state().snapshot();
        assert!(snapshot.live.is_none());
        assert!(snapshot.last.is_some());
    }

    #[tokio::test]
    async fn accepted_event_switches_cadence_to_fast() {
        let afad = MockProvider::new(ProviderTag::Afad);
        let h = harness(test_config(), &[afad.clone()]);
        assert_eq!(h.orchestrator.next_interval(), Duration::from_secs(30));

        afad.push_events(vec![raw(ProviderTag::Afad, "1", 5.0, NOW)]);
        h.orchestrator.run_cycle().await;
        assert_eq!(h.orchestrator.cadence_mode(), CadenceMode::Fast);
        assert_eq!(h.orchestrator.next_interval(), Duration::from_secs(5));

        h.clock.advance(Duration::from_secs(300));
        assert_eq!(h.orchestrator.next_interval(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_provider_is_retried_then_reported() {
        let kandilli = MockProvider::new(ProviderTag::Kandilli);
        kandilli.fail_next(10);
        let h = harness(test_config(), &[kandilli.clone()]);

        let report = h.orchestrator.run_cycle().await;

        assert_eq!(report.failed, vec![ProviderTag::Kandilli]);
        assert_eq!(kandilli.calls(), 3);
        let status = h.orchestrator.provider_status(ProviderTag::Kandilli).unwrap();
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_error.unwrap().contains("injected failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_within_cycle() {
        let afad = MockProvider::new(ProviderTag::Afad);
        afad.fail_next(1);
        afad.push_events(vec![raw(ProviderTag::Afad, "1", 5.0, NOW)]);
        let h = harness(test_config(), &[afad.clone()]);

        let report = h.orchestrator.run_cycle().await;

        assert_eq!(report.succeeded, vec![ProviderTag::Afad]);
        assert_eq!(report.dispatched, 1);
        assert_eq!(afad.calls(), 2);
        let status = h.orchestrator.provider_status(ProviderTag::Afad).unwrap();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.last_success_ms, Some(NOW));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_is_abandoned_at_deadline() {
        let mut config = test_config();
        config.polling.fetch_timeout_ms = 60_000;
        config.polling.cycle_timeout_ms = 2_000;
        let stuck = MockProvider::new(ProviderTag::Usgs);
        stuck.set_delay(Duration::from_secs(3600));
        let h = harness(config, &[stuck]);

        let start = tokio::time::Instant::now();
        let report = h.orchestrator.run_cycle().await;

        assert_eq!(report.abandoned, vec![ProviderTag::Usgs]);
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(h.orchestrator.metrics().snapshot().providers_abandoned, 1);
    }

    #[tokio::test]
    async fn disabled_provider_is_skipped() {
        let emsc = MockProvider::new(ProviderTag::Emsc);
        emsc.set_events(vec![raw(ProviderTag::Emsc, "1", 5.0, NOW)]);
        let h = harness(test_config(), &[emsc.clone()]);

        h.orchestrator.run_cycle().await;
        assert_eq!(emsc.calls(), 0);
        assert!(h.orchestrator.provider_status(ProviderTag::Emsc).is_none());
    }

    #[tokio::test]
    async fn peer_message_duplicate_is_dropped() {
        let h = harness(test_config(), &[]);
        let payload = raw(ProviderTag::Kandilli, "k1", 5.0, NOW).to_bytes().unwrap();
        let id = MessageId::new();

        assert!(h.orchestrator.on_receive(&id, &payload).dispatched());
        assert_eq!(
            h.orchestrator.on_receive(&id, &payload),
            IngestOutcome::Duplicate
        );
        // Same event under a different message id: caught by the event key.
        assert_eq!(
            h.orchestrator.on_receive(&MessageId::new(), &payload),
            IngestOutcome::Duplicate
        );
        assert_eq!(h.dispatcher.notified().len(), 1);
    }

    #[tokio::test]
    async fn malformed_peer_payload_leaves_message_id_unrecorded() {
        let h = harness(test_config(), &[]);
        let id = MessageId::new();

        assert_eq!(
            h.orchestrator.on_receive(&id, b"not msgpack"),
            IngestOutcome::Malformed
        );
        assert!(!h.orchestrator.ledger().contains(&id.ledger_key()));
    }

    #[tokio::test]
    async fn envelope_without_hops_is_dropped() {
        let h = harness(test_config(), &[]);
        let mut envelope =
            RelayEnvelope::new("peer", &raw(ProviderTag::Afad, "1", 5.0, NOW), 3).unwrap();
        envelope.hops_remaining = 0;

        assert_eq!(
            h.orchestrator.on_envelope(&envelope.to_bytes().unwrap()),
            IngestOutcome::HopsExhausted
        );
        assert!(h.dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn relayed_envelope_keeps_id_and_spends_a_hop() {
        let h = harness(test_config(), &[]);
        let inbound =
            RelayEnvelope::new("node-b", &raw(ProviderTag::Afad, "r1", 5.0, NOW), 3).unwrap();

        assert!(h
            .orchestrator
            .on_envelope(&inbound.to_bytes().unwrap())
            .dispatched());

        let sent = h.dispatcher.broadcasts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_id, inbound.message_id);
        assert_eq!(sent[0].origin, "node-b");
        assert_eq!(sent[0].hops_remaining, 2);
        assert_eq!(sent[0].payload, inbound.payload);
    }

    #[tokio::test]
    async fn last_hop_is_delivered_but_not_rebroadcast() {
        let h = harness(test_config(), &[]);
        let inbound =
            RelayEnvelope::new("node-b", &raw(ProviderTag::Afad, "r2", 5.0, NOW), 1).unwrap();

        assert!(h
            .orchestrator
            .on_envelope(&inbound.to_bytes().unwrap())
            .dispatched());
        assert_eq!(h.dispatcher.notified().len(), 1);
        assert!(h.dispatcher.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn bare_peer_message_rebroadcasts_under_same_id() {
        let h = harness(test_config(), &[]);
        let payload = raw(ProviderTag::Usgs, "u1", 5.0, NOW).to_bytes().unwrap();
        let id = MessageId::new();

        assert!(h.orchestrator.on_receive(&id, &payload).dispatched());

        let sent = h.dispatcher.broadcasts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_id, id);
        assert_eq!(sent[0].hops_remaining, eew_types::DEFAULT_MAX_HOPS - 1);
        assert_eq!(sent[0].payload, payload);
    }

    #[tokio::test]
    async fn sos_only_role_does_not_rebroadcast_peer_alerts() {
        let battery = MockBattery::new(0.1);
        let relay = Arc::new(RelayPolicy::new(Arc::new(battery)));
        relay.refresh().await.unwrap();

        let dispatcher = RecordingDispatcher::new();
        let orchestrator = AlertIngestOrchestrator::builder(test_config())
            .notifier(Arc::new(dispatcher.clone()))
            .broadcaster(Arc::new(dispatcher.clone()))
            .relay_policy(relay)
            .build()
            .unwrap();

        let payload = raw(ProviderTag::Afad, "p1", 5.0, NOW).to_bytes().unwrap();
        assert!(orchestrator.on_receive(&MessageId::new(), &payload).dispatched());
        assert_eq!(dispatcher.notified().len(), 1);
        assert!(dispatcher.broadcasts().is_empty());
        assert_eq!(orchestrator.status().relay_role, Some(RelayRole::SosOnly));
    }

    #[tokio::test]
    async fn invalid_config_fails_build() {
        let mut config = test_config();
        config.polling.cycle_timeout_ms = 0;
        assert!(matches!(
            AlertIngestOrchestrator::builder(config).build(),
            Err(NodeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn status_reports_providers_and_alerts() {
        let afad = MockProvider::new(ProviderTag::Afad);
        let usgs = MockProvider::new(ProviderTag::Usgs);
        afad.set_events(vec![raw(ProviderTag::Afad, "1", 5.0, NOW)]);
        let h = harness(test_config(), &[usgs, afad]);

        h.orchestrator.run_cycle().await;
        let status = h.orchestrator.status();

        assert_eq!(status.label, "quakewire-node");
        assert_eq!(
            status.providers.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            vec![ProviderTag::Afad, ProviderTag::Usgs]
        );
        assert!(status.live.is_some());
        assert_eq!(status.ledger_entries, 1);
        assert_eq!(status.metrics.cycles_total, 1);
        assert_eq!(status.relay_role, None);
    }
}
