//! Monitor integration tests
//!
//! Circuit breaker lifecycle as observed through selection and events.

#[cfg(test)]
mod tests {
    use provider_resilience::{
        CircuitBreakerConfig, CircuitState, MonitorConfig, NamedProvider, PerformanceMonitor,
        Provider, ProviderError, SelectionAlgorithm, SelectionCriteria, Selector,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn monitor() -> Arc<PerformanceMonitor> {
        Arc::new(PerformanceMonitor::new(MonitorConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 2,
                failure_window: Duration::from_secs(60),
                open_timeout: Duration::from_secs(30),
                half_open_max_attempts: 3,
            },
            ..MonitorConfig::default()
        }))
    }

    fn providers() -> Vec<Arc<dyn Provider>> {
        vec![
            Arc::new(NamedProvider::new("a")),
            Arc::new(NamedProvider::new("b")),
        ]
    }

    /// Open, half-open and closed again, with selection following along
    #[tokio::test(start_paused = true)]
    async fn test_circuit_lifecycle_drives_selection() {
        let monitor = monitor();
        let selector = Selector::new(Arc::clone(&monitor));
        let mut events = monitor.subscribe();
        let candidates = providers();
        let criteria = SelectionCriteria::new(SelectionAlgorithm::RoundRobin);

        monitor.record_failure("a", &ProviderError::timeout("slow"));
        assert_eq!(monitor.circuit_state("a"), CircuitState::Closed);
        monitor.record_failure("a", &ProviderError::timeout("slow"));
        assert_eq!(monitor.circuit_state("a"), CircuitState::Open);
        assert!(!monitor.is_provider_healthy("a"));

        for _ in 0..4 {
            let picked = selector
                .select_provider("svc", &candidates, &criteria)
                .unwrap();
            assert_eq!(picked.id(), "b");
        }

        let opened = events.recv().await.unwrap();
        assert_eq!(opened.provider_id, "a");
        assert_eq!(opened.previous, CircuitState::Closed);
        assert_eq!(opened.current, CircuitState::Open);
        assert!(!opened.healthy);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(monitor.circuit_state("a"), CircuitState::HalfOpen);
        assert!(monitor.is_provider_healthy("a"));

        let probing = events.recv().await.unwrap();
        assert_eq!(probing.current, CircuitState::HalfOpen);
        assert!(probing.healthy);

        let picks: Vec<String> = (0..4)
            .filter_map(|_| selector.select_provider("svc", &candidates, &criteria))
            .map(|p| p.id().to_string())
            .collect();
        assert!(picks.iter().any(|id| id == "a"));

        for _ in 0..3 {
            monitor.record_success("a", Duration::from_millis(20));
        }
        assert_eq!(monitor.circuit_state("a"), CircuitState::Closed);

        let metrics = monitor.get_metrics("a").unwrap();
        assert_eq!(metrics.failure_count, 2);
        assert_eq!(metrics.success_count, 3);
        assert_eq!(metrics.failures_in_window, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let monitor = monitor();

        monitor.record_failure("a", &ProviderError::network("reset"));
        monitor.record_failure("a", &ProviderError::network("reset"));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(monitor.circuit_state("a"), CircuitState::HalfOpen);

        monitor.record_failure("a", &ProviderError::network("reset"));
        assert_eq!(monitor.circuit_state("a"), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_outside_window_do_not_open() {
        let monitor = monitor();

        monitor.record_failure("a", &ProviderError::unavailable("503"));
        tokio::time::advance(Duration::from_secs(61)).await;
        monitor.record_failure("a", &ProviderError::unavailable("503"));

        assert_eq!(monitor.circuit_state("a"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_health_scores_rank_providers() {
        let monitor = monitor();
        let selector = Selector::new(Arc::clone(&monitor));

        for _ in 0..10 {
            monitor.record_success("a", Duration::from_millis(2500));
            monitor.record_success("b", Duration::from_millis(50));
        }
        monitor.record_failure("a", &ProviderError::unavailable("503"));

        assert!(monitor.health_score("b") > monitor.health_score("a"));

        let ranked = selector.rank_providers(&providers(), &SelectionCriteria::default());
        let order: Vec<&str> = ranked.iter().map(|p| p.id()).collect();
        assert_eq!(order, vec!["b", "a"]);

        let picked = selector
            .select_provider("svc", &providers(), &SelectionCriteria::default())
            .unwrap();
        assert_eq!(picked.id(), "b");
    }

    #[tokio::test]
    async fn test_reset_restores_fresh_state() {
        let monitor = monitor();

        monitor.record_failure("a", &ProviderError::unavailable("503"));
        monitor.record_failure("a", &ProviderError::unavailable("503"));
        assert_eq!(monitor.circuit_state("a"), CircuitState::Open);

        monitor.reset_metrics("a");
        assert_eq!(monitor.circuit_state("a"), CircuitState::Closed);
        assert_eq!(monitor.health_score("a"), 100.0);
    }
}
