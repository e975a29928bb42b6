//! Environment variable overrides

use super::EngineConfig;
use crate::core::selection::SelectionAlgorithm;
use crate::utils::error::{EngineError, Result};
use std::env;
use tracing::debug;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "RESILIENCE_";

impl EngineConfig {
    /// Apply overrides from `RESILIENCE_*` environment variables, then validate
    ///
    /// - `RESILIENCE_MAX_ATTEMPTS`
    /// - `RESILIENCE_FAILURE_THRESHOLD`
    /// - `RESILIENCE_OPEN_TIMEOUT` (humantime, e.g. `30s`)
    /// - `RESILIENCE_ALGORITHM` (e.g. `round_robin`)
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup` instead of the process environment
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(max_attempts) = var("MAX_ATTEMPTS") {
            self.fallback.max_attempts = max_attempts
                .trim()
                .parse()
                .map_err(|e| EngineError::config(format!("Invalid max attempts: {}", e)))?;
        }
        if let Some(threshold) = var("FAILURE_THRESHOLD") {
            self.monitor.circuit_breaker.failure_threshold = threshold
                .trim()
                .parse()
                .map_err(|e| EngineError::config(format!("Invalid failure threshold: {}", e)))?;
        }
        if let Some(timeout) = var("OPEN_TIMEOUT") {
            self.monitor.circuit_breaker.open_timeout = humantime::parse_duration(timeout.trim())
                .map_err(|e| EngineError::config(format!("Invalid open timeout: {}", e)))?;
        }
        if let Some(algorithm) = var("ALGORITHM") {
            self.selection.algorithm = algorithm
                .parse::<SelectionAlgorithm>()
                .map_err(|e| EngineError::config(format!("Invalid algorithm: {}", e)))?;
        }

        self.validate()?;
        debug!("Environment overrides applied");
        Ok(self)
    }
}
