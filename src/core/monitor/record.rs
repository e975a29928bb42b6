//! Per-provider metrics record
//!
//! One record per provider id, owned by the monitor and guarded by its own
//! lock. Counters only grow until the record is reset or evicted.

use super::circuit_breaker::{CircuitBreaker, CircuitTransition};
use super::scoring;
use super::types::{
    CircuitState, HealthView, LastFailure, MonitorConfig, ProviderMetricsSnapshot,
};
use crate::utils::error::ProviderError;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub(crate) struct ProviderRecord {
    provider_id: String,
    success_count: u64,
    failure_count: u64,
    /// Successful-call durations, oldest first
    samples: VecDeque<Duration>,
    max_samples: usize,
    last_failure: Option<LastFailure>,
    /// Monotonic time of the last recorded outcome (drives retention)
    last_activity: Instant,
    last_operation_at: Option<DateTime<Utc>>,
    metrics_start_at: DateTime<Utc>,
    circuit: CircuitBreaker,
}

impl ProviderRecord {
    pub(crate) fn new(provider_id: &str, config: &MonitorConfig, now: Instant) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            success_count: 0,
            failure_count: 0,
            samples: VecDeque::with_capacity(config.max_response_samples.min(64)),
            max_samples: config.max_response_samples.max(1),
            last_failure: None,
            last_activity: now,
            last_operation_at: None,
            metrics_start_at: Utc::now(),
            circuit: CircuitBreaker::new(config.circuit_breaker.clone()),
        }
    }

    pub(crate) fn record_success(
        &mut self,
        duration: Duration,
        now: Instant,
    ) -> Option<CircuitTransition> {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
        self.success_count += 1;
        self.last_failure = None;
        self.touch(now);

        self.circuit.on_success(now)
    }

    pub(crate) fn record_failure(
        &mut self,
        error: &ProviderError,
        now: Instant,
    ) -> Option<CircuitTransition> {
        self.failure_count += 1;
        self.last_failure = Some(LastFailure {
            kind: error.kind(),
            message: error.to_string(),
            at: Utc::now(),
        });
        self.touch(now);

        // Caller faults are counted but never move the circuit
        if error.kind().is_caller_fault() {
            return self.circuit.evaluate(now);
        }
        self.circuit.on_failure(now)
    }

    /// Apply the lazy Open -> HalfOpen check
    pub(crate) fn evaluate(&mut self, now: Instant) -> Option<CircuitTransition> {
        self.circuit.evaluate(now)
    }

    pub(crate) fn circuit_state(&self) -> CircuitState {
        self.circuit.raw_state()
    }

    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub(crate) fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 100.0;
        }
        self.success_count as f64 / total as f64 * 100.0
    }

    pub(crate) fn average_response_time(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total_secs: f64 = self.samples.iter().map(Duration::as_secs_f64).sum();
        let mean = total_secs / self.samples.len() as f64;
        Some(Duration::try_from_secs_f64(mean).unwrap_or(Duration::MAX))
    }

    pub(crate) fn health_view(&self) -> HealthView {
        let success_rate = self.success_rate();
        let avg_response_time = self.average_response_time();

        HealthView {
            circuit_state: self.circuit.raw_state(),
            health_score: scoring::health_score(success_rate, avg_response_time),
            success_rate,
            avg_response_time,
        }
    }

    pub(crate) fn snapshot(&self) -> ProviderMetricsSnapshot {
        let view = self.health_view();

        let mut sorted: Vec<Duration> = self.samples.iter().copied().collect();
        sorted.sort_unstable();

        ProviderMetricsSnapshot {
            provider_id: self.provider_id.clone(),
            success_count: self.success_count,
            failure_count: self.failure_count,
            total_operations: self.success_count + self.failure_count,
            success_rate: view.success_rate,
            sample_count: sorted.len(),
            avg_response_time_ms: view.avg_response_time.map(as_millis).unwrap_or(0.0),
            median_response_time_ms: median(&sorted).map(as_millis).unwrap_or(0.0),
            p95_response_time_ms: percentile(&sorted, 95.0).map(as_millis).unwrap_or(0.0),
            min_response_time_ms: sorted.first().copied().map(as_millis).unwrap_or(0.0),
            max_response_time_ms: sorted.last().copied().map(as_millis).unwrap_or(0.0),
            circuit_state: view.circuit_state,
            healthy: view.circuit_state.is_healthy(),
            health_score: view.health_score,
            failures_in_window: self.circuit.failures_in_window(),
            last_failure: self.last_failure.clone(),
            last_operation_at: self.last_operation_at,
            metrics_start_at: self.metrics_start_at,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_activity = now;
        self.last_operation_at = Some(Utc::now());
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Median of an ascending slice (mean of the two middle values for even lengths)
pub(crate) fn median(sorted: &[Duration]) -> Option<Duration> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    if len % 2 == 1 {
        Some(sorted[len / 2])
    } else {
        let (low, high) = (sorted[len / 2 - 1], sorted[len / 2]);
        Some(low + (high - low) / 2)
    }
}

/// Nearest-rank percentile of an ascending slice
pub(crate) fn percentile(sorted: &[Duration], pct: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (pct / 100.0 * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[index])
}
