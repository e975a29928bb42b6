//! Sliding-window circuit breaker
//!
//! The breaker is a plain state machine driven by explicit timestamps. It is
//! owned by a provider record and only mutated while that record's lock is
//! held, so it carries no synchronization of its own.

use super::types::{CircuitBreakerConfig, CircuitState};
use std::collections::VecDeque;
use tokio::time::Instant;

/// A state change produced by feeding the breaker a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitTransition {
    pub from: CircuitState,
    pub to: CircuitState,
}

impl CircuitTransition {
    /// Whether the transition crosses the healthy/unhealthy boundary
    pub fn flips_health(&self) -> bool {
        self.from.is_healthy() != self.to.is_healthy()
    }

    /// Collapse two consecutive transitions into one
    fn chain(first: Option<Self>, second: Option<Self>) -> Option<Self> {
        match (first, second) {
            (Some(a), Some(b)) if a.from == b.to => None,
            (Some(a), Some(b)) => Some(Self {
                from: a.from,
                to: b.to,
            }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// Circuit breaker with a sliding failure window
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitState,
    failures: VecDeque<Instant>,
    last_open_time: Option<Instant>,
    half_open_attempts: u32,
}

impl CircuitBreaker {
    /// Create a new closed circuit breaker
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            last_open_time: None,
            half_open_attempts: 0,
        }
    }

    /// State as last evaluated, without applying the open timeout
    pub fn raw_state(&self) -> CircuitState {
        self.state
    }

    /// Evaluate the open timeout and return the current state
    pub fn state(&mut self, now: Instant) -> (CircuitState, Option<CircuitTransition>) {
        let transition = self.evaluate(now);
        (self.state, transition)
    }

    /// Move Open to HalfOpen once the open timeout has elapsed
    pub fn evaluate(&mut self, now: Instant) -> Option<CircuitTransition> {
        if self.state != CircuitState::Open {
            return None;
        }

        let opened_at = self.last_open_time?;
        if now.saturating_duration_since(opened_at) >= self.config.open_timeout {
            self.half_open_attempts = 0;
            return self.transition_to(CircuitState::HalfOpen);
        }

        None
    }

    /// Feed a success signal
    pub fn on_success(&mut self, now: Instant) -> Option<CircuitTransition> {
        let evaluated = self.evaluate(now);
        self.prune(now);

        let mut transition = None;
        if self.state == CircuitState::HalfOpen {
            self.half_open_attempts += 1;
            if self.half_open_attempts >= self.config.half_open_max_attempts {
                self.failures.clear();
                self.half_open_attempts = 0;
                self.last_open_time = None;
                transition = self.transition_to(CircuitState::Closed);
            }
        }

        CircuitTransition::chain(evaluated, transition)
    }

    /// Feed a failure signal
    pub fn on_failure(&mut self, now: Instant) -> Option<CircuitTransition> {
        let evaluated = self.evaluate(now);

        self.failures.push_back(now);
        self.prune(now);

        let transition = match self.state {
            CircuitState::HalfOpen => self.open(now),
            CircuitState::Closed if self.failures.len() >= self.threshold() => self.open(now),
            _ => None,
        };

        CircuitTransition::chain(evaluated, transition)
    }

    /// Failures currently inside the sliding window
    pub fn failures_in_window(&self) -> usize {
        self.failures.len()
    }

    /// When the circuit last opened
    pub fn last_open_time(&self) -> Option<Instant> {
        self.last_open_time
    }

    /// Successes counted in the current half-open period
    pub fn half_open_attempts(&self) -> u32 {
        self.half_open_attempts
    }

    /// Return to a fresh closed state
    pub fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.failures.clear();
        self.last_open_time = None;
        self.half_open_attempts = 0;
    }

    fn open(&mut self, now: Instant) -> Option<CircuitTransition> {
        self.last_open_time = Some(now);
        self.half_open_attempts = 0;
        self.transition_to(CircuitState::Open)
    }

    fn transition_to(&mut self, next: CircuitState) -> Option<CircuitTransition> {
        if self.state == next {
            return None;
        }
        let from = std::mem::replace(&mut self.state, next);
        Some(CircuitTransition { from, to: next })
    }

    fn threshold(&self) -> usize {
        self.config.failure_threshold.max(1) as usize
    }

    fn prune(&mut self, now: Instant) {
        let window = self.config.failure_window;
        while let Some(&oldest) = self.failures.front() {
            if now.saturating_duration_since(oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}
