//! Configuration management for the resilience engine
//!
//! The core components take plain configuration values at construction.
//! This module is for hosting layers: it loads them from YAML files and
//! environment variables and validates them.

mod loader;
pub mod validation;

pub use loader::ENV_PREFIX;
pub use validation::Validate;

use crate::core::fallback::FallbackOptions;
use crate::core::monitor::MonitorConfig;
use crate::core::selection::SelectionCriteria;
use crate::utils::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Complete engine configuration
///
/// ```yaml
/// monitor:
///   circuit_breaker:
///     failure_threshold: 5
///     open_timeout: 60s
///   retention: 24h
/// fallback:
///   base_delay: 200ms
///   max_attempts: 3
/// selection:
///   algorithm: health_based
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub monitor: MonitorConfig,
    pub fallback: FallbackOptions,
    /// Default criteria for executions that don't pass their own
    pub selection: SelectionCriteria,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            EngineError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config = Self::from_yaml_str(&content)?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| EngineError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        Validate::validate(&self.monitor)
            .map_err(|e| EngineError::config(format!("Monitor config error: {}", e)))?;

        Validate::validate(&self.fallback)
            .map_err(|e| EngineError::config(format!("Fallback config error: {}", e)))?;

        Validate::validate(&self.selection)
            .map_err(|e| EngineError::config(format!("Selection config error: {}", e)))?;

        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
