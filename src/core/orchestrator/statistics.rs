//! Load balancing statistics
//!
//! Running counters are atomics updated on the request path; snapshots are
//! rebuilt from them on demand.

use crate::core::provider::ProviderId;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Point-in-time view of the orchestrator's counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadBalancingStatistics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cancelled_requests: u64,
    /// Attempts made against a different provider after a failure
    pub fallback_attempts: u64,
    /// Successful requests as a percentage of finished requests
    pub success_rate: f64,
    /// Successful requests served per provider
    pub provider_usage: BTreeMap<ProviderId, u64>,
}

#[derive(Debug, Default)]
pub(crate) struct StatisticsCounters {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    cancelled_requests: AtomicU64,
    fallback_attempts: AtomicU64,
    /// service type -> provider -> successful requests
    usage: DashMap<String, HashMap<ProviderId, u64>>,
}

impl StatisticsCounters {
    pub(crate) fn record_request(&self) {
        self.total_requests.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_fallback_attempt(&self) {
        self.fallback_attempts.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_success(&self, service_type: &str, provider_id: &str) {
        self.successful_requests.fetch_add(1, Relaxed);
        *self
            .usage
            .entry(service_type.to_string())
            .or_default()
            .entry(provider_id.to_string())
            .or_insert(0) += 1;
    }

    pub(crate) fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled_requests.fetch_add(1, Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LoadBalancingStatistics {
        let successful_requests = self.successful_requests.load(Relaxed);
        let failed_requests = self.failed_requests.load(Relaxed);
        let finished = successful_requests + failed_requests;

        let mut provider_usage = BTreeMap::new();
        for entry in self.usage.iter() {
            for (provider_id, count) in entry.value() {
                *provider_usage.entry(provider_id.clone()).or_insert(0) += count;
            }
        }

        LoadBalancingStatistics {
            total_requests: self.total_requests.load(Relaxed),
            successful_requests,
            failed_requests,
            cancelled_requests: self.cancelled_requests.load(Relaxed),
            fallback_attempts: self.fallback_attempts.load(Relaxed),
            success_rate: if finished == 0 {
                0.0
            } else {
                successful_requests as f64 / finished as f64 * 100.0
            },
            provider_usage,
        }
    }

    /// Percentage of a service type's successful requests each provider served
    pub(crate) fn distribution(&self, service_type: &str) -> BTreeMap<ProviderId, f64> {
        let Some(usage) = self.usage.get(service_type) else {
            return BTreeMap::new();
        };

        let total: u64 = usage.values().sum();
        if total == 0 {
            return BTreeMap::new();
        }

        usage
            .iter()
            .map(|(provider_id, count)| (provider_id.clone(), *count as f64 / total as f64 * 100.0))
            .collect()
    }

    pub(crate) fn reset(&self) {
        self.total_requests.store(0, Relaxed);
        self.successful_requests.store(0, Relaxed);
        self.failed_requests.store(0, Relaxed);
        self.cancelled_requests.store(0, Relaxed);
        self.fallback_attempts.store(0, Relaxed);
        self.usage.clear();
    }
}
