//! Configuration validation

use crate::core::fallback::FallbackOptions;
use crate::core::monitor::{CircuitBreakerConfig, MonitorConfig};
use crate::core::selection::SelectionCriteria;
use tracing::debug;

/// Validation trait for configuration structures
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl Validate for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("Circuit breaker failure threshold must be greater than 0".to_string());
        }

        if self.half_open_max_attempts == 0 {
            return Err("Circuit breaker half-open attempts must be greater than 0".to_string());
        }

        if self.failure_window.is_zero() {
            return Err("Circuit breaker failure window must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for MonitorConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating monitor configuration");

        self.circuit_breaker.validate()?;

        if self.max_response_samples == 0 {
            return Err("Response sample capacity must be greater than 0".to_string());
        }

        if self.sweep_interval.is_zero() {
            return Err("Sweep interval must be greater than 0".to_string());
        }

        if self.event_capacity == 0 {
            return Err("Event capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for FallbackOptions {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating fallback configuration");

        if self.max_attempts == 0 {
            return Err("Max attempts must be greater than 0".to_string());
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err("Backoff multiplier must be at least 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("Jitter factor must be between 0.0 and 1.0".to_string());
        }

        if self.base_delay > self.max_delay {
            return Err("Base delay must not exceed max delay".to_string());
        }

        if let Some(retryable) = &self.retryable_kinds {
            if retryable.is_empty() {
                return Err("Retryable kinds must not be empty when set".to_string());
            }
        }

        Ok(())
    }
}

impl Validate for SelectionCriteria {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.min_health_score) {
            return Err("Minimum health score must be between 0 and 100".to_string());
        }

        if self.max_response_time.is_some_and(|max| max.is_zero()) {
            return Err("Maximum response time must be greater than 0".to_string());
        }

        Ok(())
    }
}
