//! Selection criteria and algorithm definitions

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Selection algorithm enumeration
///
/// ## Algorithms
///
/// - **HealthBased**: Highest composite health score, ties to lowest latency (default)
/// - **RoundRobin**: Per-service-type rotating counter
/// - **Weighted**: Random draw weighted by health score
/// - **Random**: Uniform random pick
/// - **LeastLoad**: Fewest outstanding requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionAlgorithm {
    #[default]
    HealthBased,
    RoundRobin,
    Weighted,
    Random,
    LeastLoad,
}

impl SelectionAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionAlgorithm::HealthBased => "health_based",
            SelectionAlgorithm::RoundRobin => "round_robin",
            SelectionAlgorithm::Weighted => "weighted",
            SelectionAlgorithm::Random => "random",
            SelectionAlgorithm::LeastLoad => "least_load",
        }
    }

    /// Whether identical inputs always produce the same pick
    pub fn is_deterministic(self) -> bool {
        !matches!(self, SelectionAlgorithm::Weighted | SelectionAlgorithm::Random)
    }
}

impl fmt::Display for SelectionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "health_based" | "health" => Ok(SelectionAlgorithm::HealthBased),
            "round_robin" => Ok(SelectionAlgorithm::RoundRobin),
            "weighted" => Ok(SelectionAlgorithm::Weighted),
            "random" => Ok(SelectionAlgorithm::Random),
            "least_load" => Ok(SelectionAlgorithm::LeastLoad),
            other => Err(format!("unknown selection algorithm: {}", other)),
        }
    }
}

/// Per-call selection criteria
///
/// ## Defaults
///
/// - no required capabilities
/// - `min_health_score`: 0
/// - `max_response_time`: none
/// - `algorithm`: HealthBased
/// - `exclude_unhealthy`: true (open circuits are skipped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionCriteria {
    /// Capabilities every candidate must advertise
    pub required_capabilities: HashSet<String>,
    /// Minimum composite health score (0..=100)
    pub min_health_score: f64,
    /// Maximum acceptable average response time
    #[serde(with = "humantime_serde")]
    pub max_response_time: Option<Duration>,
    /// Algorithm used to pick among the filtered candidates
    pub algorithm: SelectionAlgorithm,
    /// Skip providers whose circuit is open
    pub exclude_unhealthy: bool,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            required_capabilities: HashSet::new(),
            min_health_score: 0.0,
            max_response_time: None,
            algorithm: SelectionAlgorithm::HealthBased,
            exclude_unhealthy: true,
        }
    }
}

impl SelectionCriteria {
    pub fn new(algorithm: SelectionAlgorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: SelectionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    pub fn with_min_health_score(mut self, score: f64) -> Self {
        self.min_health_score = score;
        self
    }

    pub fn with_max_response_time(mut self, max: Duration) -> Self {
        self.max_response_time = Some(max);
        self
    }

    pub fn include_unhealthy(mut self) -> Self {
        self.exclude_unhealthy = false;
        self
    }
}
