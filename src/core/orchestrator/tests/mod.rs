//! Load balancer tests


use crate::core::fallback::FallbackOptions;
use crate::core::monitor::{CircuitBreakerConfig, MonitorConfig, PerformanceMonitor};
use crate::core::orchestrator::LoadBalancer;
use crate::core::provider::NamedProvider;
use std::sync::Arc;
use std::time::Duration;

/// Fallback options with short, deterministic backoff
pub(crate) fn test_options(max_attempts: u32) -> FallbackOptions {
    FallbackOptions::default()
        .with_max_attempts(max_attempts)
        .with_delays(Duration::from_millis(10), Duration::from_millis(100))
        .without_jitter()
}

pub(crate) fn create_balancer(options: FallbackOptions) -> LoadBalancer {
    let monitor_config = MonitorConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            ..CircuitBreakerConfig::default()
        },
        ..MonitorConfig::default()
    };
    LoadBalancer::new(Arc::new(PerformanceMonitor::new(monitor_config)), options)
}

pub(crate) fn add_providers(balancer: &LoadBalancer, service_type: &str, ids: &[&str]) {
    for id in ids {
        balancer.add_provider(service_type, Arc::new(NamedProvider::new(*id)));
    }
}
