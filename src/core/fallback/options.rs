//! Fallback configuration

use crate::utils::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How candidates are chosen after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Drop the failed provider, back off, then select again from the rest
    #[default]
    Default,
    /// Never fall back to another provider
    PrimaryOnly,
    /// Retry right away against the remaining healthy providers
    Immediate,
}

impl FallbackStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackStrategy::Default => "default",
            FallbackStrategy::PrimaryOnly => "primary_only",
            FallbackStrategy::Immediate => "immediate",
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "default" => Ok(FallbackStrategy::Default),
            "primary_only" => Ok(FallbackStrategy::PrimaryOnly),
            "immediate" => Ok(FallbackStrategy::Immediate),
            other => Err(format!("unknown fallback strategy: {}", other)),
        }
    }
}

/// Retry and backoff settings
///
/// ## Defaults
///
/// - `base_delay`: 200ms, doubling per attempt up to `max_delay` (30s)
/// - `jitter`: enabled, adding up to 10% on top of the computed delay
/// - `max_attempts`: 3
/// - `non_retryable_kinds`: `client`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackOptions {
    /// Delay before the second attempt
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound for the backoff delay (before jitter)
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    /// Maximum extra fraction added by jitter
    pub jitter_factor: f64,
    /// Total attempts allowed for one request
    pub max_attempts: u32,
    /// When set, only these kinds are retried
    pub retryable_kinds: Option<HashSet<ErrorKind>>,
    /// Kinds that are never retried, in addition to invalid arguments and cancellation
    pub non_retryable_kinds: HashSet<ErrorKind>,
    pub strategy: FallbackStrategy,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            jitter_factor: 0.1,
            max_attempts: 3,
            retryable_kinds: None,
            non_retryable_kinds: HashSet::from([ErrorKind::Client]),
            strategy: FallbackStrategy::Default,
        }
    }
}

impl FallbackOptions {
    /// Set the attempt limit (builder pattern)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set base and maximum backoff delay (builder pattern)
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_strategy(mut self, strategy: FallbackStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Restrict retries to the given kinds (builder pattern)
    pub fn retry_only<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.retryable_kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Never retry the given kind (builder pattern)
    pub fn never_retry(mut self, kind: ErrorKind) -> Self {
        self.non_retryable_kinds.insert(kind);
        self
    }
}
