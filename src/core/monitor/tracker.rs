//! Scoped operation tracker
//!
//! A tracker times one operation against one provider and reports exactly
//! one outcome to the monitor. An unresolved tracker is a caller bug: on drop
//! it logs an error and records a failure instead of assuming success.

use super::monitor::PerformanceMonitor;
use crate::utils::error::ProviderError;
use std::time::Duration;
use tokio::time::Instant;
use tracing::error;
use uuid::Uuid;

/// Message recorded for trackers dropped without an outcome
pub const UNRESOLVED_TRACKER_MESSAGE: &str = "operation tracker released without an outcome";

/// Tracks a single in-flight operation
#[must_use = "an operation tracker must be resolved with success(), failure() or abandon()"]
#[derive(Debug)]
pub struct OperationTracker<'a> {
    monitor: &'a PerformanceMonitor,
    provider_id: String,
    operation_id: Uuid,
    started: Instant,
    resolved: bool,
}

impl<'a> OperationTracker<'a> {
    pub(crate) fn new(monitor: &'a PerformanceMonitor, provider_id: &str) -> Self {
        Self {
            monitor,
            provider_id: provider_id.to_string(),
            operation_id: Uuid::new_v4(),
            started: Instant::now(),
            resolved: false,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    /// Time since the tracker was started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the operation as successful and return its duration
    pub fn success(mut self) -> Duration {
        self.resolved = true;
        let elapsed = self.elapsed();
        self.monitor.record_success(&self.provider_id, elapsed);
        elapsed
    }

    /// Record the operation as failed
    pub fn failure(mut self, error: &ProviderError) {
        self.resolved = true;
        self.monitor.record_failure(&self.provider_id, error);
    }

    /// Resolve without recording anything (caller-side cancellation)
    pub fn abandon(mut self) {
        self.resolved = true;
    }
}

impl Drop for OperationTracker<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }

        error!(
            provider = %self.provider_id,
            operation_id = %self.operation_id,
            "Operation tracker dropped without an outcome, recording failure"
        );
        self.monitor.record_failure(
            &self.provider_id,
            &ProviderError::other(UNRESOLVED_TRACKER_MESSAGE),
        );
    }
}
