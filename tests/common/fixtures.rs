//! Test fixtures and scripted operations

use parking_lot::Mutex;
use provider_resilience::{
    CircuitBreakerConfig, EngineConfig, FallbackOptions, LoadBalancer, MonitorConfig,
    NamedProvider, Provider, ProviderError,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Engine configuration with a small breaker threshold and short backoff
pub fn engine_config(failure_threshold: u32, max_attempts: u32) -> EngineConfig {
    EngineConfig {
        monitor: MonitorConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold,
                open_timeout: Duration::from_secs(30),
                ..CircuitBreakerConfig::default()
            },
            ..MonitorConfig::default()
        },
        fallback: FallbackOptions::default()
            .with_max_attempts(max_attempts)
            .with_delays(Duration::from_millis(10), Duration::from_millis(100))
            .without_jitter(),
        ..EngineConfig::default()
    }
}

/// Load balancer built from `config` with named providers registered in order
pub fn balancer_with(config: &EngineConfig, service_type: &str, ids: &[&str]) -> LoadBalancer {
    let balancer: LoadBalancer = LoadBalancer::from_config(config);
    for id in ids {
        balancer.add_provider(service_type, Arc::new(NamedProvider::new(*id)));
    }
    balancer
}

/// Operation whose outcome per provider is scripted up front
#[derive(Default)]
pub struct ScriptedOperation {
    failures: Mutex<HashMap<String, ProviderError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOperation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call against `provider_id` fail with `error`
    pub fn failing(self, provider_id: &str, error: ProviderError) -> Self {
        self.failures.lock().insert(provider_id.to_string(), error);
        self
    }

    /// Let `provider_id` succeed from now on
    pub fn recover(&self, provider_id: &str) {
        self.failures.lock().remove(provider_id);
    }

    /// Providers called so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call(
        &self,
        provider: Arc<dyn Provider>,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send + 'static {
        let id = provider.id().to_string();
        self.calls.lock().push(id.clone());
        let outcome = match self.failures.lock().get(&id) {
            Some(err) => Err(err.clone()),
            None => Ok(format!("ok from {}", id)),
        };

        async move {
            tokio::task::yield_now().await;
            outcome
        }
    }
}
