//! Provider selector
//!
//! Filters candidates against the monitor's view of their health, then hands
//! the survivors to the algorithm named by the criteria.

use super::criteria::{SelectionAlgorithm, SelectionCriteria};
use super::strategy_impl::{self, CandidateStats};
use crate::core::monitor::PerformanceMonitor;
use crate::core::provider::Provider;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tracing::debug;

/// A candidate that passed filtering, with the stats used to rank it
#[derive(Debug)]
pub struct ScoredCandidate<P: ?Sized> {
    pub provider: Arc<P>,
    pub stats: CandidateStats,
}

/// Picks providers using monitor state and a selection algorithm
///
/// Round-robin counters are owned by the selector instance and keyed by
/// service type, so independent selectors never share rotation state.
#[derive(Debug)]
pub struct Selector {
    monitor: Arc<PerformanceMonitor>,
    round_robin_counters: DashMap<String, AtomicUsize>,
}

impl Selector {
    /// Create a selector reading from the given monitor
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            monitor,
            round_robin_counters: DashMap::new(),
        }
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    /// Select a provider treating every candidate as idle
    ///
    /// Returns `None` when no candidate survives filtering; that is not an
    /// error at this level.
    pub fn select_provider<P>(
        &self,
        service_type: &str,
        candidates: &[Arc<P>],
        criteria: &SelectionCriteria,
    ) -> Option<Arc<P>>
    where
        P: Provider + ?Sized,
    {
        self.select_provider_with_load(service_type, candidates, criteria, |_| 0)
    }

    /// Select a provider using `load` for outstanding-request counts
    ///
    /// # Flow
    ///
    /// 1. Filter: capabilities, circuit state, health score, response time
    /// 2. Return `None` if nothing is left
    /// 3. Pick according to `criteria.algorithm`
    pub fn select_provider_with_load<P, L>(
        &self,
        service_type: &str,
        candidates: &[Arc<P>],
        criteria: &SelectionCriteria,
        load: L,
    ) -> Option<Arc<P>>
    where
        P: Provider + ?Sized,
        L: Fn(&str) -> usize,
    {
        let filtered = self.filter_candidates(candidates, criteria, load);
        if filtered.is_empty() {
            debug!(
                service_type = %service_type,
                candidates = candidates.len(),
                "No provider passed selection filters"
            );
            return None;
        }

        let stats: Vec<CandidateStats> = filtered.iter().map(|c| c.stats).collect();
        let index = match criteria.algorithm {
            SelectionAlgorithm::HealthBased => strategy_impl::health_based(&stats),
            SelectionAlgorithm::RoundRobin => strategy_impl::round_robin(
                service_type,
                stats.len(),
                &self.round_robin_counters,
            ),
            SelectionAlgorithm::Weighted => strategy_impl::weighted(&stats),
            SelectionAlgorithm::Random => strategy_impl::random(stats.len()),
            SelectionAlgorithm::LeastLoad => strategy_impl::least_load(&stats),
        }?;

        let selected = filtered.into_iter().nth(index)?;
        debug!(
            service_type = %service_type,
            algorithm = %criteria.algorithm,
            provider = %selected.provider.id(),
            health_score = selected.stats.health_score,
            "Selected provider"
        );
        Some(selected.provider)
    }

    /// Filtered candidates ordered best-first by health score
    pub fn rank_providers<P>(
        &self,
        candidates: &[Arc<P>],
        criteria: &SelectionCriteria,
    ) -> Vec<Arc<P>>
    where
        P: Provider + ?Sized,
    {
        let filtered = self.filter_candidates(candidates, criteria, |_| 0);
        let stats: Vec<CandidateStats> = filtered.iter().map(|c| c.stats).collect();

        strategy_impl::rank_by_health(&stats)
            .into_iter()
            .map(|index| Arc::clone(&filtered[index].provider))
            .collect()
    }

    /// Apply the criteria filters, keeping candidate order
    pub fn filter_candidates<P, L>(
        &self,
        candidates: &[Arc<P>],
        criteria: &SelectionCriteria,
        load: L,
    ) -> Vec<ScoredCandidate<P>>
    where
        P: Provider + ?Sized,
        L: Fn(&str) -> usize,
    {
        candidates
            .iter()
            .filter(|provider| {
                criteria.required_capabilities.is_empty()
                    || provider.supports(&criteria.required_capabilities)
            })
            .filter_map(|provider| {
                let id = provider.id();
                let view = self.monitor.health_view(id);

                if criteria.exclude_unhealthy && !view.circuit_state.is_healthy() {
                    return None;
                }
                if view.health_score < criteria.min_health_score {
                    return None;
                }
                if let (Some(max), Some(avg)) = (criteria.max_response_time, view.avg_response_time)
                {
                    if avg > max {
                        return None;
                    }
                }

                Some(ScoredCandidate {
                    provider: Arc::clone(provider),
                    stats: CandidateStats {
                        health_score: view.health_score,
                        avg_response_time: view.avg_response_time,
                        outstanding: load(id),
                    },
                })
            })
            .collect()
    }

    /// Restart rotation for a service type
    pub fn reset_round_robin(&self, service_type: &str) {
        self.round_robin_counters.remove(service_type);
    }
}
