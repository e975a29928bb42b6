//! # provider-resilience
//!
//! Provider selection and resilience engine. Given a pool of interchangeable
//! providers grouped by service type, it picks one per request, tracks how
//! each performs, trips a circuit breaker on repeated failures, and falls
//! back to another provider when an attempt fails.
//!
//! ## Features
//!
//! - **Health monitoring**: success rate, response time percentiles and a composite health score
//! - **Circuit breaking**: sliding-window failure counting with half-open probing
//! - **Selection algorithms**: health-based, round-robin, weighted, random and least-load
//! - **Fallback**: retry classification, exponential backoff with jitter, candidate shrinking
//! - **Cancellation**: every execution honors a `CancellationToken`
//!
//! ## Quick Start
//!
//! ```rust
//! use provider_resilience::{
//!     FallbackOptions, LoadBalancer, NamedProvider, PerformanceMonitor, Provider, ProviderError,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> provider_resilience::Result<()> {
//!     let monitor = Arc::new(PerformanceMonitor::default());
//!     let balancer: LoadBalancer = LoadBalancer::new(monitor, FallbackOptions::default());
//!
//!     balancer.add_provider("chat", Arc::new(NamedProvider::new("primary")));
//!     balancer.add_provider("chat", Arc::new(NamedProvider::new("secondary")));
//!
//!     let result = balancer
//!         .execute_default("chat", |provider, _cancel| async move {
//!             Ok::<_, ProviderError>(format!("handled by {}", provider.id()))
//!         })
//!         .await?;
//!
//!     println!("{} after {} attempt(s)", result.value, result.attempts);
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use config::EngineConfig;
pub use utils::error::{EngineError, ErrorKind, ProviderError, Result};
pub use utils::logging::{LogFormat, init_tracing};

pub use core::fallback::{FallbackOptions, FallbackPolicy, FallbackStrategy};
pub use core::monitor::{
    CircuitBreakerConfig, CircuitState, HealthChangedEvent, HealthObserver, MonitorConfig,
    OperationTracker, PerformanceMonitor, ProviderMetricsSnapshot,
};
pub use core::orchestrator::{ExecutionResult, LoadBalancer, LoadBalancingStatistics};
pub use core::provider::{NamedProvider, Provider, ProviderId};
pub use core::selection::{SelectionAlgorithm, SelectionCriteria, Selector};

// Cancellation token accepted by `LoadBalancer::execute`
pub use tokio_util::sync::CancellationToken;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
