//! Fallback policy
//!
//! Decides whether a failed attempt is retried, how long to back off, and
//! which providers remain eligible for the next attempt.

use super::options::{FallbackOptions, FallbackStrategy};
use crate::core::provider::Provider;
use crate::utils::error::ProviderError;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

fn assume_healthy(_: &str) -> bool {
    true
}

/// State of the request at the point a fallback decision is made
pub struct FallbackContext<'a> {
    /// Attempts made so far, including the one that just failed
    pub attempt: u32,
    pub error: &'a ProviderError,
    /// Health predicate for provider ids, normally backed by the monitor
    pub is_healthy: &'a dyn Fn(&str) -> bool,
}

impl<'a> FallbackContext<'a> {
    /// Context that treats every provider as healthy
    pub fn new(attempt: u32, error: &'a ProviderError) -> Self {
        Self {
            attempt,
            error,
            is_healthy: &assume_healthy,
        }
    }

    pub fn with_health(mut self, is_healthy: &'a dyn Fn(&str) -> bool) -> Self {
        self.is_healthy = is_healthy;
        self
    }
}

impl fmt::Debug for FallbackContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackContext")
            .field("attempt", &self.attempt)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Remaining candidates and the wait before trying them
pub struct FallbackPlan<P: ?Sized> {
    pub candidates: Vec<Arc<P>>,
    pub delay: Duration,
}

impl<P: ?Sized> FallbackPlan<P> {
    fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<P: Provider + ?Sized> fmt::Debug for FallbackPlan<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.candidates.iter().map(|p| p.id()).collect();
        f.debug_struct("FallbackPlan")
            .field("candidates", &ids)
            .field("delay", &self.delay)
            .finish()
    }
}

/// Retry, backoff and fallback decisions
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    options: FallbackOptions,
}

impl FallbackPolicy {
    pub fn new(options: FallbackOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FallbackOptions {
        &self.options
    }

    /// Whether a request that failed with `error` after `attempt_count`
    /// attempts should be tried again
    pub fn should_retry(&self, error: &ProviderError, attempt_count: u32) -> bool {
        if attempt_count >= self.options.max_attempts {
            return false;
        }

        let kind = error.kind();
        if kind.is_caller_fault() || self.options.non_retryable_kinds.contains(&kind) {
            return false;
        }

        match &self.options.retryable_kinds {
            Some(allowed) => allowed.contains(&kind),
            None => true,
        }
    }

    /// Backoff delay following attempt number `attempt_count`
    ///
    /// `min(max_delay, base_delay * multiplier^(attempt_count - 1))`, then
    /// scaled by `1 + random(0, jitter_factor)` when jitter is enabled. Zero
    /// for attempt 0. A `jitter_factor` above 1.0 is capped at 1.0, so a
    /// jittered delay never exceeds twice the capped delay.
    pub fn next_delay(&self, attempt_count: u32) -> Duration {
        let capped = self.backoff_delay(attempt_count);
        if capped.is_zero() || !self.options.jitter || self.options.jitter_factor <= 0.0 {
            return capped;
        }

        let factor = self.options.jitter_factor.min(1.0);
        let scale = 1.0 + rand::thread_rng().gen_range(0.0..=factor);
        Duration::try_from_secs_f64(capped.as_secs_f64() * scale).unwrap_or(capped)
    }

    /// Deterministic part of [`next_delay`](Self::next_delay)
    pub fn backoff_delay(&self, attempt_count: u32) -> Duration {
        if attempt_count == 0 {
            return Duration::ZERO;
        }

        let max = self.options.max_delay;
        let exponent = i32::try_from(attempt_count - 1).unwrap_or(i32::MAX);
        let multiplier = self.options.backoff_multiplier.max(1.0);
        let secs = self.options.base_delay.as_secs_f64() * multiplier.powi(exponent);

        if !secs.is_finite() || secs >= max.as_secs_f64() {
            max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Candidates for the next attempt after `failed_provider` failed
    pub fn select_fallback_candidates<P>(
        &self,
        failed_provider: &str,
        available: &[Arc<P>],
        context: &FallbackContext<'_>,
    ) -> FallbackPlan<P>
    where
        P: Provider + ?Sized,
    {
        let remaining = available
            .iter()
            .filter(|provider| provider.id() != failed_provider);

        let plan = match self.options.strategy {
            FallbackStrategy::PrimaryOnly => FallbackPlan::empty(),
            FallbackStrategy::Default => FallbackPlan {
                candidates: remaining.cloned().collect(),
                delay: self.next_delay(context.attempt),
            },
            FallbackStrategy::Immediate => FallbackPlan {
                candidates: remaining
                    .filter(|provider| (context.is_healthy)(provider.id()))
                    .cloned()
                    .collect(),
                delay: Duration::ZERO,
            },
        };

        debug!(
            failed_provider = %failed_provider,
            strategy = %self.options.strategy,
            attempt = context.attempt,
            remaining = plan.candidates.len(),
            delay_ms = plan.delay.as_millis() as u64,
            "Planned fallback"
        );
        plan
    }
}
