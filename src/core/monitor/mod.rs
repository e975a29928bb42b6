//! Provider performance monitoring and circuit breaking
//!
//! ## Module Structure
//!
//! - `types` - Circuit states, configuration and metric snapshots
//! - `circuit_breaker` - Sliding-window circuit breaker state machine
//! - `scoring` - Composite health score
//! - `record` - Per-provider metrics record
//! - `events` - Health change notifications
//! - `tracker` - Scoped operation tracker
//! - `monitor` - The `PerformanceMonitor` itself

pub mod circuit_breaker;
pub mod events;
#[allow(clippy::module_inception)]
pub mod monitor;
mod record;
pub mod scoring;
pub mod tracker;
pub mod types;


pub use circuit_breaker::{CircuitBreaker, CircuitTransition};
pub use events::{HealthNotifier, HealthObserver, ObserverError};
pub use monitor::PerformanceMonitor;
pub use tracker::OperationTracker;
pub use types::{
    CircuitBreakerConfig, CircuitState, HealthChangedEvent, HealthView, LastFailure,
    MonitorConfig, ProviderMetricsSnapshot,
};
