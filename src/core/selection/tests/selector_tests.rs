//! Selector tests against monitor state

use crate::core::monitor::{CircuitBreakerConfig, MonitorConfig, PerformanceMonitor};
use crate::core::provider::{NamedProvider, Provider};
use crate::core::selection::criteria::{SelectionAlgorithm, SelectionCriteria};
use crate::core::selection::selector::Selector;
use crate::utils::error::ProviderError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn create_selector() -> Selector {
    let config = MonitorConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            ..CircuitBreakerConfig::default()
        },
        ..MonitorConfig::default()
    };
    Selector::new(Arc::new(PerformanceMonitor::new(config)))
}

fn providers(ids: &[&str]) -> Vec<Arc<dyn Provider>> {
    ids.iter()
        .map(|id| Arc::new(NamedProvider::new(*id)) as Arc<dyn Provider>)
        .collect()
}

fn open_circuit(selector: &Selector, id: &str) {
    for _ in 0..3 {
        selector
            .monitor()
            .record_failure(id, &ProviderError::unavailable("down"));
    }
}

// ==================== Filtering Tests ====================

#[test]
fn test_empty_candidates_return_none() {
    let selector = create_selector();
    let candidates: Vec<Arc<dyn Provider>> = Vec::new();

    assert!(
        selector
            .select_provider("svc", &candidates, &SelectionCriteria::default())
            .is_none()
    );
}

#[test]
fn test_open_circuit_is_skipped() {
    let selector = create_selector();
    let candidates = providers(&["a", "b"]);
    open_circuit(&selector, "a");

    for _ in 0..10 {
        let selected = selector
            .select_provider("svc", &candidates, &SelectionCriteria::default())
            .unwrap();
        assert_eq!(selected.id(), "b");
    }
}

#[test]
fn test_all_open_returns_none() {
    let selector = create_selector();
    let candidates = providers(&["a", "b"]);
    open_circuit(&selector, "a");
    open_circuit(&selector, "b");

    assert!(
        selector
            .select_provider("svc", &candidates, &SelectionCriteria::default())
            .is_none()
    );
}

#[test]
fn test_include_unhealthy_keeps_open_circuits() {
    let selector = create_selector();
    let candidates = providers(&["a"]);
    open_circuit(&selector, "a");

    let criteria = SelectionCriteria::default().include_unhealthy();
    let selected = selector.select_provider("svc", &candidates, &criteria);
    assert_eq!(selected.map(|p| p.id().to_string()), Some("a".to_string()));
}

#[test]
fn test_min_health_score_filter() {
    let selector = create_selector();
    let candidates = providers(&["flaky", "solid"]);

    let monitor = selector.monitor();
    monitor.record_success("flaky", Duration::from_millis(10));
    monitor.record_failure("flaky", &ProviderError::timeout("slow"));
    monitor.record_success("solid", Duration::from_millis(10));

    let criteria = SelectionCriteria::default().with_min_health_score(90.0);
    let filtered = selector.filter_candidates(&candidates, &criteria, |_| 0);

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].provider.id(), "solid");
}

#[test]
fn test_max_response_time_filter() {
    let selector = create_selector();
    let candidates = providers(&["slow", "fast", "new"]);

    selector
        .monitor()
        .record_success("slow", Duration::from_millis(900));
    selector
        .monitor()
        .record_success("fast", Duration::from_millis(40));

    let criteria = SelectionCriteria::default().with_max_response_time(Duration::from_millis(500));
    let ids: Vec<String> = selector
        .filter_candidates(&candidates, &criteria, |_| 0)
        .iter()
        .map(|c| c.provider.id().to_string())
        .collect();

    assert_eq!(ids, vec!["fast".to_string(), "new".to_string()]);
}

#[test]
fn test_capability_filter() {
    let selector = create_selector();
    let candidates: Vec<Arc<dyn Provider>> = vec![
        Arc::new(NamedProvider::new("text").with_capabilities(["chat"])),
        Arc::new(NamedProvider::new("multi").with_capabilities(["chat", "vision"])),
    ];

    let criteria = SelectionCriteria::default().with_capability("vision");
    let selected = selector
        .select_provider("svc", &candidates, &criteria)
        .unwrap();
    assert_eq!(selected.id(), "multi");

    let criteria = SelectionCriteria::default().with_capability("audio");
    assert!(selector.select_provider("svc", &candidates, &criteria).is_none());
}

// ==================== Algorithm Dispatch Tests ====================

#[test]
fn test_health_based_prefers_lower_latency() {
    let selector = create_selector();
    let candidates = providers(&["a", "b"]);

    selector.monitor().record_success("a", Duration::from_millis(700));
    selector.monitor().record_success("b", Duration::from_millis(50));

    let selected = selector
        .select_provider("svc", &candidates, &SelectionCriteria::default())
        .unwrap();
    assert_eq!(selected.id(), "b");
}

#[test]
fn test_health_based_is_deterministic() {
    let selector = create_selector();
    let candidates = providers(&["a", "b", "c"]);

    let first = selector
        .select_provider("svc", &candidates, &SelectionCriteria::default())
        .unwrap();
    for _ in 0..20 {
        let again = selector
            .select_provider("svc", &candidates, &SelectionCriteria::default())
            .unwrap();
        assert_eq!(again.id(), first.id());
    }
}

#[test]
fn test_round_robin_distributes_evenly() {
    let selector = create_selector();
    let candidates = providers(&["a", "b", "c", "d"]);
    let criteria = SelectionCriteria::new(SelectionAlgorithm::RoundRobin);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..100 {
        let selected = selector.select_provider("svc", &candidates, &criteria).unwrap();
        *counts.entry(selected.id().to_string()).or_insert(0) += 1;
    }

    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|&count| count == 25));
}

#[test]
fn test_round_robin_counters_are_per_selector() {
    let first = create_selector();
    let second = create_selector();
    let candidates = providers(&["a", "b"]);
    let criteria = SelectionCriteria::new(SelectionAlgorithm::RoundRobin);

    first.select_provider("svc", &candidates, &criteria);
    let from_second = second.select_provider("svc", &candidates, &criteria).unwrap();
    assert_eq!(from_second.id(), "a");

    second.reset_round_robin("svc");
    let after_reset = second.select_provider("svc", &candidates, &criteria).unwrap();
    assert_eq!(after_reset.id(), "a");
}

#[test]
fn test_least_load_uses_load_source() {
    let selector = create_selector();
    let candidates = providers(&["a", "b", "c"]);
    let criteria = SelectionCriteria::new(SelectionAlgorithm::LeastLoad);

    let load = |id: &str| match id {
        "a" => 4,
        "b" => 1,
        _ => 3,
    };
    let selected = selector
        .select_provider_with_load("svc", &candidates, &criteria, load)
        .unwrap();
    assert_eq!(selected.id(), "b");
}

#[test]
fn test_random_and_weighted_pick_from_filtered_set() {
    let selector = create_selector();
    let candidates = providers(&["a", "b", "c"]);
    open_circuit(&selector, "b");

    for algorithm in [SelectionAlgorithm::Random, SelectionAlgorithm::Weighted] {
        let criteria = SelectionCriteria::new(algorithm);
        for _ in 0..50 {
            let selected = selector.select_provider("svc", &candidates, &criteria).unwrap();
            assert_ne!(selected.id(), "b");
        }
    }
}

#[test]
fn test_rank_providers() {
    let selector = create_selector();
    let candidates = providers(&["slow", "down", "fast"]);

    selector
        .monitor()
        .record_success("slow", Duration::from_millis(1500));
    selector
        .monitor()
        .record_success("fast", Duration::from_millis(20));
    open_circuit(&selector, "down");

    let ranked: Vec<String> = selector
        .rank_providers(&candidates, &SelectionCriteria::default())
        .iter()
        .map(|p| p.id().to_string())
        .collect();

    assert_eq!(ranked, vec!["fast".to_string(), "slow".to_string()]);
}

#[test]
fn test_concrete_provider_type() {
    let selector = create_selector();
    let candidates = vec![Arc::new(NamedProvider::new("x")), Arc::new(NamedProvider::new("y"))];

    let selected: Arc<NamedProvider> = selector
        .select_provider("svc", &candidates, &SelectionCriteria::default())
        .unwrap();
    assert_eq!(selected.id(), "x");
}
