//! Performance monitor implementation
//!
//! Owns every provider's metrics record and circuit breaker. Records are
//! created lazily on the first reported outcome and stored behind their own
//! lock, so traffic for one provider never serializes another's.

use super::circuit_breaker::CircuitTransition;
use super::events::{HealthNotifier, HealthObserver};
use super::record::ProviderRecord;
use super::tracker::OperationTracker;
use super::types::{
    CircuitState, HealthChangedEvent, HealthView, MonitorConfig, ProviderMetricsSnapshot,
};
use crate::utils::error::ProviderError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type SharedRecord = Arc<Mutex<ProviderRecord>>;

/// Per-provider metrics ledger with circuit breaking
#[derive(Debug)]
pub struct PerformanceMonitor {
    config: MonitorConfig,
    records: DashMap<String, SharedRecord>,
    notifier: HealthNotifier,
}

impl PerformanceMonitor {
    /// Create a new monitor
    pub fn new(config: MonitorConfig) -> Self {
        let notifier = HealthNotifier::new(config.event_capacity);
        Self {
            config,
            records: DashMap::new(),
            notifier,
        }
    }

    /// Get the monitor configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // ========== Recording ==========

    /// Record a successful operation and its duration
    pub fn record_success(&self, provider_id: &str, duration: Duration) {
        let now = Instant::now();
        let record = self.record_for(provider_id, now);
        let transition = record.lock().record_success(duration, now);

        debug!(provider = %provider_id, duration_ms = duration.as_millis() as u64, "Recorded success");
        self.handle_transition(provider_id, transition);
    }

    /// Record a failed operation
    pub fn record_failure(&self, provider_id: &str, error: &ProviderError) {
        let now = Instant::now();
        let record = self.record_for(provider_id, now);
        let transition = record.lock().record_failure(error, now);

        debug!(provider = %provider_id, kind = %error.kind(), error = %error, "Recorded failure");
        self.handle_transition(provider_id, transition);
    }

    /// Start tracking an operation against a provider
    ///
    /// The returned tracker must be resolved with `success`, `failure` or
    /// `abandon`; dropping it unresolved records a failure.
    pub fn start_operation(&self, provider_id: &str) -> OperationTracker<'_> {
        OperationTracker::new(self, provider_id)
    }

    // ========== Queries ==========

    /// Point-in-time metrics for a provider
    pub fn get_metrics(&self, provider_id: &str) -> Option<ProviderMetricsSnapshot> {
        let record = self.existing_record(provider_id)?;
        let (snapshot, transition) = {
            let mut guard = record.lock();
            let transition = guard.evaluate(Instant::now());
            (guard.snapshot(), transition)
        };
        self.handle_transition(provider_id, transition);
        Some(snapshot)
    }

    /// Metrics for every tracked provider
    pub fn get_all_metrics(&self) -> HashMap<String, ProviderMetricsSnapshot> {
        let ids: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        ids.into_iter()
            .filter_map(|id| self.get_metrics(&id).map(|snapshot| (id, snapshot)))
            .collect()
    }

    /// Selection inputs for a provider; unknown providers look fresh and healthy
    pub fn health_view(&self, provider_id: &str) -> HealthView {
        let Some(record) = self.existing_record(provider_id) else {
            return HealthView::unknown();
        };
        let (view, transition) = {
            let mut guard = record.lock();
            let transition = guard.evaluate(Instant::now());
            (guard.health_view(), transition)
        };
        self.handle_transition(provider_id, transition);
        view
    }

    /// Current circuit state, with the open timeout applied
    pub fn circuit_state(&self, provider_id: &str) -> CircuitState {
        self.health_view(provider_id).circuit_state
    }

    /// True while the provider's circuit is Closed or HalfOpen
    pub fn is_provider_healthy(&self, provider_id: &str) -> bool {
        self.circuit_state(provider_id).is_healthy()
    }

    /// Composite health score in 0..=100
    pub fn health_score(&self, provider_id: &str) -> f64 {
        self.health_view(provider_id).health_score
    }

    /// Ids of every tracked provider
    pub fn tracked_providers(&self) -> Vec<String> {
        self.records.iter().map(|e| e.key().clone()).collect()
    }

    // ========== Reset & Retention ==========

    /// Drop all metrics and circuit state for a provider
    pub fn reset_metrics(&self, provider_id: &str) {
        if let Some((_, record)) = self.records.remove(provider_id) {
            let previous = record.lock().circuit_state();
            info!(provider = %provider_id, "Provider metrics reset");
            self.handle_transition(
                provider_id,
                Some(CircuitTransition {
                    from: previous,
                    to: CircuitState::Closed,
                })
                .filter(|t| t.from != t.to),
            );
        }
    }

    /// Drop every provider's metrics
    pub fn reset_all(&self) {
        for id in self.tracked_providers() {
            self.reset_metrics(&id);
        }
    }

    /// Evict providers with no activity inside the retention window
    ///
    /// Returns the number of evicted providers.
    pub fn sweep_inactive(&self) -> usize {
        let now = Instant::now();
        let retention = self.config.retention;
        let mut evicted = 0;

        self.records.retain(|provider_id, record| {
            let keep = record.lock().idle_for(now) <= retention;
            if !keep {
                evicted += 1;
                debug!(provider = %provider_id, "Evicting inactive provider metrics");
            }
            keep
        });

        evicted
    }

    /// Spawn the periodic retention sweep
    ///
    /// Runs every `sweep_interval` until `shutdown` is cancelled.
    pub fn start_cleanup_task(
        self: Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.sweep_interval.max(Duration::from_millis(1));
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Metrics cleanup task stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let evicted = self.sweep_inactive();
                        if evicted > 0 {
                            info!(evicted, "Evicted inactive provider metrics");
                        }
                    }
                }
            }
        })
    }

    // ========== Notifications ==========

    /// Subscribe to health change events
    pub fn subscribe(&self) -> broadcast::Receiver<HealthChangedEvent> {
        self.notifier.subscribe()
    }

    /// Register a synchronous health observer
    pub fn add_observer(&self, observer: Arc<dyn HealthObserver>) {
        self.notifier.add_observer(observer);
    }

    // ========== Internals ==========

    fn existing_record(&self, provider_id: &str) -> Option<SharedRecord> {
        self.records.get(provider_id).map(|r| Arc::clone(r.value()))
    }

    fn record_for(&self, provider_id: &str, now: Instant) -> SharedRecord {
        if let Some(record) = self.existing_record(provider_id) {
            return record;
        }
        self.records
            .entry(provider_id.to_string())
            .or_insert_with(|| {
                debug!(provider = %provider_id, "Tracking new provider");
                Arc::new(Mutex::new(ProviderRecord::new(provider_id, &self.config, now)))
            })
            .value()
            .clone()
    }

    /// Log a transition and notify when it flips health (called without record locks)
    fn handle_transition(&self, provider_id: &str, transition: Option<CircuitTransition>) {
        let Some(transition) = transition else {
            return;
        };

        match transition.to {
            CircuitState::Open => warn!(
                provider = %provider_id,
                from = %transition.from,
                to = %transition.to,
                "Circuit opened"
            ),
            _ => info!(
                provider = %provider_id,
                from = %transition.from,
                to = %transition.to,
                "Circuit state changed"
            ),
        }

        if transition.flips_health() {
            self.notifier.notify(HealthChangedEvent {
                provider_id: provider_id.to_string(),
                previous: transition.from,
                current: transition.to,
                healthy: transition.to.is_healthy(),
                at: chrono::Utc::now(),
            });
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
