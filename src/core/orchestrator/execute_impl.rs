//! Execution implementation for LoadBalancer
//!
//! Each call moves through `Selecting -> Executing -> Succeeded`, or
//! `Retrying -> Selecting` after a retryable failure, until a result is
//! produced or the candidates are exhausted.

use super::load_balancer::{ExecutionResult, LoadBalancer};
use crate::core::fallback::FallbackContext;
use crate::core::monitor::OperationTracker;
use crate::core::provider::Provider;
use crate::core::selection::SelectionCriteria;
use crate::utils::error::{EngineError, ProviderError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Hard cap on loop iterations per execution, independent of `max_attempts`
pub const MAX_ITERATIONS: u32 = 10;

/// Operation tracker for one attempt
///
/// If the execute future is dropped while the attempt is running, the tracker
/// is abandoned instead of recording a failure against the provider.
struct AttemptTracker<'a> {
    inner: Option<OperationTracker<'a>>,
}

impl<'a> AttemptTracker<'a> {
    fn new(tracker: OperationTracker<'a>) -> Self {
        Self {
            inner: Some(tracker),
        }
    }

    fn success(mut self) -> Duration {
        self.inner
            .take()
            .map(OperationTracker::success)
            .unwrap_or_default()
    }

    fn failure(mut self, error: &ProviderError) {
        if let Some(tracker) = self.inner.take() {
            tracker.failure(error);
        }
    }

    fn abandon(mut self) {
        if let Some(tracker) = self.inner.take() {
            tracker.abandon();
        }
    }
}

impl Drop for AttemptTracker<'_> {
    fn drop(&mut self) {
        if let Some(tracker) = self.inner.take() {
            debug!(
                provider = %tracker.provider_id(),
                "Execution dropped mid-attempt, nothing recorded"
            );
            tracker.abandon();
        }
    }
}

impl<P: Provider + ?Sized> LoadBalancer<P> {
    /// Execute an operation against the providers registered for a service type
    ///
    /// The operation receives the selected provider and a child of `cancel`.
    /// Failures are recorded against the provider and retried on another one
    /// as the fallback policy allows.
    pub async fn execute<T, F, Fut>(
        &self,
        service_type: &str,
        criteria: &SelectionCriteria,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<ExecutionResult<T>>
    where
        F: Fn(Arc<P>, CancellationToken) -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let candidates = self.providers(service_type);
        self.execute_with_candidates(service_type, candidates, criteria, cancel, operation)
            .await
    }

    /// Execute with the default criteria and a token nobody cancels
    pub async fn execute_default<T, F, Fut>(
        &self,
        service_type: &str,
        operation: F,
    ) -> Result<ExecutionResult<T>>
    where
        F: Fn(Arc<P>, CancellationToken) -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let criteria = self.default_criteria();
        let cancel = CancellationToken::new();
        self.execute(service_type, &criteria, &cancel, operation)
            .await
    }

    /// Execute against an explicit candidate list instead of the pool
    ///
    /// `service_type` keys round-robin rotation and the load distribution.
    pub async fn execute_with_candidates<T, F, Fut>(
        &self,
        service_type: &str,
        candidates: Vec<Arc<P>>,
        criteria: &SelectionCriteria,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<ExecutionResult<T>>
    where
        F: Fn(Arc<P>, CancellationToken) -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        self.stats.record_request();

        let outcome = self
            .run_attempts(service_type, candidates, criteria, cancel, operation)
            .await;

        match &outcome {
            Ok(result) => self.stats.record_success(service_type, &result.provider_id),
            Err(EngineError::Cancelled) => self.stats.record_cancelled(),
            Err(err) => {
                self.stats.record_failure();
                warn!(service_type = %service_type, error = %err, "Execution failed");
            }
        }
        outcome
    }

    async fn run_attempts<T, F, Fut>(
        &self,
        service_type: &str,
        candidates: Vec<Arc<P>>,
        criteria: &SelectionCriteria,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<ExecutionResult<T>>
    where
        F: Fn(Arc<P>, CancellationToken) -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let started = Instant::now();
        let mut available = candidates;
        let mut attempts: u32 = 0;
        let mut last_error: Option<ProviderError> = None;

        while attempts < MAX_ITERATIONS {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            // Selecting
            let Some(provider) = self.selector.select_provider_with_load(
                service_type,
                &available,
                criteria,
                |id| self.outstanding(id),
            ) else {
                debug!(
                    service_type = %service_type,
                    attempts,
                    "No provider available for selection"
                );
                return Err(EngineError::no_providers(service_type, last_error));
            };

            attempts += 1;
            if attempts > 1 {
                self.stats.record_fallback_attempt();
            }

            // Executing
            let provider_id = provider.id().to_string();
            let tracker = AttemptTracker::new(self.monitor.start_operation(&provider_id));
            let outcome = {
                let _outstanding = self.track_outstanding(&provider_id);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = operation(Arc::clone(&provider), cancel.child_token()) => Some(result),
                }
            };

            let err = match outcome {
                None => {
                    tracker.abandon();
                    debug!(provider = %provider_id, "Execution cancelled while running");
                    return Err(EngineError::Cancelled);
                }
                Some(Ok(value)) => {
                    let duration = tracker.success();
                    debug!(
                        provider = %provider_id,
                        attempts,
                        duration_ms = duration.as_millis() as u64,
                        "Operation succeeded"
                    );
                    return Ok(ExecutionResult {
                        value,
                        provider_id,
                        attempts,
                        used_fallback: attempts > 1,
                        latency: started.elapsed(),
                    });
                }
                Some(Err(ProviderError::Cancelled)) if cancel.is_cancelled() => {
                    tracker.abandon();
                    return Err(EngineError::Cancelled);
                }
                Some(Err(err)) => {
                    tracker.failure(&err);
                    err
                }
            };

            if !self.policy.should_retry(&err, attempts) {
                debug!(
                    provider = %provider_id,
                    attempts,
                    kind = %err.kind(),
                    "Failure is not retried"
                );
                return Err(EngineError::Provider(err));
            }

            // Retrying
            let plan = {
                let is_healthy = |id: &str| self.monitor.is_provider_healthy(id);
                let context = FallbackContext::new(attempts, &err).with_health(&is_healthy);
                self.policy
                    .select_fallback_candidates(&provider_id, &available, &context)
            };

            warn!(
                provider = %provider_id,
                attempt = attempts,
                error = %err,
                remaining = plan.candidates.len(),
                "Provider attempt failed, falling back"
            );
            last_error = Some(err);

            if plan.is_empty() {
                return Err(EngineError::no_providers(service_type, last_error));
            }

            let delay = plan.delay;
            available = plan.candidates;

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        warn!(
            service_type = %service_type,
            attempts,
            "Execution stopped at iteration cap"
        );
        Err(EngineError::no_providers(service_type, last_error))
    }
}
