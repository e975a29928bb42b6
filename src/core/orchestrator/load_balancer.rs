//! Load balancer core structure
//!
//! Owns the provider pool, the selector and fallback policy, and the running
//! statistics. Execution lives in `execute_impl`.

use super::statistics::{LoadBalancingStatistics, StatisticsCounters};
use crate::config::EngineConfig;
use crate::core::fallback::{FallbackOptions, FallbackPolicy};
use crate::core::monitor::PerformanceMonitor;
use crate::core::provider::{Provider, ProviderId};
use crate::core::selection::{SelectionCriteria, Selector};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::time::Duration;
use tracing::info;

/// Outcome of a successful execution
#[derive(Debug, Clone)]
pub struct ExecutionResult<T> {
    /// Value returned by the operation
    pub value: T,
    /// Provider that produced the value
    pub provider_id: ProviderId,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Whether the value came from a provider other than the first one tried
    pub used_fallback: bool,
    /// Wall time of the whole execution, including backoff
    pub latency: Duration,
}

pub(crate) struct PoolEntry<P: ?Sized> {
    pub(crate) provider: Arc<P>,
    pub(crate) service_type: String,
}

/// Decrements a provider's outstanding-request count when dropped
pub(crate) struct OutstandingGuard<'a> {
    counters: &'a DashMap<ProviderId, AtomicUsize>,
    provider_id: ProviderId,
}

impl Drop for OutstandingGuard<'_> {
    fn drop(&mut self) {
        if let Some(counter) = self.counters.get(&self.provider_id) {
            counter.fetch_sub(1, Relaxed);
        }
    }
}

/// Load-balancing executor over a pool of interchangeable providers
///
/// Generic over the provider type; the default `dyn Provider` lets one pool
/// hold providers of different concrete types.
pub struct LoadBalancer<P: Provider + ?Sized = dyn Provider> {
    pub(crate) monitor: Arc<PerformanceMonitor>,
    pub(crate) selector: Selector,
    pub(crate) policy: FallbackPolicy,
    pub(crate) default_criteria: ArcSwap<SelectionCriteria>,

    /// All registered providers, keyed by id
    pub(crate) pool: DashMap<ProviderId, PoolEntry<P>>,

    /// Service type to provider ids index, in registration order
    pub(crate) service_index: DashMap<String, Vec<ProviderId>>,

    /// In-flight operations per provider (read by LeastLoad)
    pub(crate) outstanding: DashMap<ProviderId, AtomicUsize>,

    pub(crate) stats: StatisticsCounters,
}

impl<P: Provider + ?Sized> LoadBalancer<P> {
    /// Create a load balancer sharing an existing monitor
    pub fn new(monitor: Arc<PerformanceMonitor>, options: FallbackOptions) -> Self {
        Self {
            selector: Selector::new(Arc::clone(&monitor)),
            monitor,
            policy: FallbackPolicy::new(options),
            default_criteria: ArcSwap::from_pointee(SelectionCriteria::default()),
            pool: DashMap::new(),
            service_index: DashMap::new(),
            outstanding: DashMap::new(),
            stats: StatisticsCounters::default(),
        }
    }

    /// Create a load balancer with its own monitor from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        let monitor = Arc::new(PerformanceMonitor::new(config.monitor.clone()));
        Self::new(monitor, config.fallback.clone()).with_default_criteria(config.selection.clone())
    }

    /// Set the criteria used by `execute_default` (builder pattern)
    pub fn with_default_criteria(self, criteria: SelectionCriteria) -> Self {
        self.default_criteria.store(Arc::new(criteria));
        self
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    // ========== Default Criteria ==========

    pub fn default_criteria(&self) -> Arc<SelectionCriteria> {
        self.default_criteria.load_full()
    }

    /// Replace the default criteria; in-flight executions keep the old value
    pub fn set_default_criteria(&self, criteria: SelectionCriteria) {
        self.default_criteria.store(Arc::new(criteria));
    }

    // ========== Pool Management ==========

    /// Register a provider under a service type
    ///
    /// A provider registered again under the same id replaces the previous
    /// instance. Returns the replaced instance, if any.
    pub fn add_provider(&self, service_type: &str, provider: Arc<P>) -> Option<Arc<P>> {
        let provider_id = provider.id().to_string();
        let previous = self.pool.insert(
            provider_id.clone(),
            PoolEntry {
                provider,
                service_type: service_type.to_string(),
            },
        );

        if let Some(previous) = &previous {
            self.unindex(&previous.service_type, &provider_id);
        }

        let mut ids = self.service_index.entry(service_type.to_string()).or_default();
        if !ids.contains(&provider_id) {
            ids.push(provider_id.clone());
        }
        drop(ids);

        info!(provider = %provider_id, service_type = %service_type, "Provider added to pool");
        previous.map(|entry| entry.provider)
    }

    /// Unregister a provider
    ///
    /// Operations already dispatched to it keep running; it is only excluded
    /// from future selection.
    pub fn remove_provider(&self, provider_id: &str) -> Option<Arc<P>> {
        let (_, entry) = self.pool.remove(provider_id)?;
        self.unindex(&entry.service_type, provider_id);

        info!(provider = %provider_id, service_type = %entry.service_type, "Provider removed from pool");
        Some(entry.provider)
    }

    /// Providers registered for a service type, in registration order
    pub fn providers(&self, service_type: &str) -> Vec<Arc<P>> {
        let ids = self
            .service_index
            .get(service_type)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        ids.iter()
            .filter_map(|id| self.pool.get(id).map(|entry| Arc::clone(&entry.provider)))
            .collect()
    }

    pub fn get_provider(&self, provider_id: &str) -> Option<Arc<P>> {
        self.pool
            .get(provider_id)
            .map(|entry| Arc::clone(&entry.provider))
    }

    /// Service types with at least one registered provider
    pub fn service_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .service_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        types.sort();
        types
    }

    fn unindex(&self, service_type: &str, provider_id: &str) {
        if let Some(mut ids) = self.service_index.get_mut(service_type) {
            ids.retain(|id| id != provider_id);
        }
        self.service_index
            .remove_if(service_type, |_, ids| ids.is_empty());
    }

    // ========== Outstanding Requests ==========

    /// Number of operations currently running against a provider
    pub fn outstanding(&self, provider_id: &str) -> usize {
        self.outstanding
            .get(provider_id)
            .map(|counter| counter.load(Relaxed))
            .unwrap_or(0)
    }

    pub(crate) fn track_outstanding(&self, provider_id: &str) -> OutstandingGuard<'_> {
        self.outstanding
            .entry(provider_id.to_string())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Relaxed);

        OutstandingGuard {
            counters: &self.outstanding,
            provider_id: provider_id.to_string(),
        }
    }

    // ========== Statistics ==========

    pub fn get_statistics(&self) -> LoadBalancingStatistics {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// Share of a service type's successful requests served by each provider
    ///
    /// Percentages sum to 100; the map is empty until a request succeeds.
    pub fn get_load_distribution(&self, service_type: &str) -> BTreeMap<ProviderId, f64> {
        self.stats.distribution(service_type)
    }
}

impl<P: Provider + ?Sized> Default for LoadBalancer<P> {
    fn default() -> Self {
        Self::new(
            Arc::new(PerformanceMonitor::default()),
            FallbackOptions::default(),
        )
    }
}

impl<P: Provider + ?Sized> fmt::Debug for LoadBalancer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("providers", &self.pool.len())
            .field("service_types", &self.service_index.len())
            .field("default_criteria", &**self.default_criteria.load())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
