//! Performance monitor types
//!
//! Circuit states, monitor and circuit breaker configuration, and the
//! read-only snapshots handed out to selection and callers.

use crate::utils::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, requests flow
    #[default]
    Closed,
    /// Provider is insulated, requests are not sent
    Open,
    /// Probing for recovery, requests flow and are counted
    HalfOpen,
}

impl CircuitState {
    /// A provider is healthy unless its circuit is open
    pub fn is_healthy(self) -> bool {
        !matches!(self, CircuitState::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker configuration
///
/// ## Defaults
///
/// - `failure_threshold`: 5 failures
/// - `failure_window`: 60s sliding window
/// - `open_timeout`: 60s before probing (HalfOpen)
/// - `half_open_max_attempts`: 3 successes to close again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures within the window that open the circuit
    pub failure_threshold: u32,
    /// Sliding window for counting failures
    #[serde(with = "humantime_serde")]
    pub failure_window: Duration,
    /// Time an open circuit waits before moving to HalfOpen
    #[serde(with = "humantime_serde")]
    pub open_timeout: Duration,
    /// Successes required in HalfOpen before closing
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            open_timeout: Duration::from_secs(60),
            half_open_max_attempts: 3,
        }
    }
}

/// Performance monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Circuit breaker settings applied to every provider
    pub circuit_breaker: CircuitBreakerConfig,
    /// Response-time samples kept per provider (oldest evicted first)
    pub max_response_samples: usize,
    /// Providers idle longer than this are evicted by the sweep
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    /// Interval between background sweeps
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Buffered health events per broadcast subscriber
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerConfig::default(),
            max_response_samples: 1000,
            retention: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            event_capacity: 256,
        }
    }
}

/// Most recent failure recorded for a provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Health inputs the selector needs for one provider, read under a single lock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthView {
    pub circuit_state: CircuitState,
    /// Composite score in 0..=100
    pub health_score: f64,
    /// Success rate in 0..=100
    pub success_rate: f64,
    /// Average successful response time; `None` until a success is recorded
    pub avg_response_time: Option<Duration>,
}

impl HealthView {
    /// View for a provider the monitor has never seen
    pub fn unknown() -> Self {
        Self {
            circuit_state: CircuitState::Closed,
            health_score: 100.0,
            success_rate: 100.0,
            avg_response_time: None,
        }
    }
}

/// Point-in-time metrics for a provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetricsSnapshot {
    pub provider_id: String,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_operations: u64,
    /// Success rate in 0..=100 (100 when nothing has been recorded)
    pub success_rate: f64,
    pub sample_count: usize,
    pub avg_response_time_ms: f64,
    pub median_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub circuit_state: CircuitState,
    pub healthy: bool,
    pub health_score: f64,
    /// Failures currently inside the circuit breaker's sliding window
    pub failures_in_window: usize,
    pub last_failure: Option<LastFailure>,
    pub last_operation_at: Option<DateTime<Utc>>,
    pub metrics_start_at: DateTime<Utc>,
}

/// Notification emitted when a provider crosses the healthy/unhealthy boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthChangedEvent {
    pub provider_id: String,
    pub previous: CircuitState,
    pub current: CircuitState,
    pub healthy: bool,
    pub at: DateTime<Utc>,
}
