//! Load balancer integration tests
//!
//! Selection, execution and fallback driven through the public API.

#[cfg(test)]
mod tests {
    use crate::common::{ScriptedOperation, balancer_with, engine_config};
    use provider_resilience::{
        CancellationToken, CircuitState, EngineError, ErrorKind, LoadBalancer, NamedProvider,
        Provider, ProviderError, SelectionAlgorithm, SelectionCriteria,
    };
    use std::sync::Arc;

    fn round_robin() -> SelectionCriteria {
        SelectionCriteria::new(SelectionAlgorithm::RoundRobin)
    }

    // ==================== Fallback Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_failed_primary_falls_back() {
        let balancer = balancer_with(&engine_config(5, 3), "chat", &["a", "b", "c"]);
        let operation =
            ScriptedOperation::new().failing("a", ProviderError::unavailable("a is down"));

        let result = balancer
            .execute("chat", &round_robin(), &CancellationToken::new(), |p, _| {
                operation.call(p)
            })
            .await
            .unwrap();

        assert_ne!(result.provider_id, "a");
        assert_eq!(result.attempts, 2);
        assert!(result.used_fallback);
        assert_eq!(operation.calls()[0], "a");

        let stats = balancer.get_statistics();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.successful_requests, 1);
        assert!(stats.fallback_attempts > 0);

        let distribution = balancer.get_load_distribution("chat");
        assert!(!distribution.contains_key("a"));
        assert_eq!(distribution.get(&result.provider_id), Some(&100.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_is_skipped_on_later_requests() {
        let balancer = balancer_with(&engine_config(2, 3), "chat", &["a", "b"]);
        let operation =
            ScriptedOperation::new().failing("a", ProviderError::timeout("a timed out"));
        let criteria = round_robin();
        let cancel = CancellationToken::new();

        for _ in 0..2 {
            let result = balancer
                .execute("chat", &criteria, &cancel, |p, _| operation.call(p))
                .await
                .unwrap();
            assert_eq!(result.provider_id, "b");
        }
        assert_eq!(balancer.monitor().circuit_state("a"), CircuitState::Open);

        let before = operation.calls().len();
        let result = balancer
            .execute("chat", &criteria, &cancel, |p, _| operation.call(p))
            .await
            .unwrap();
        assert_eq!(result.attempts, 1);
        assert_eq!(operation.calls()[before..], ["b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_error() {
        let balancer = balancer_with(&engine_config(10, 5), "chat", &["a", "b", "c"]);
        let operation = ScriptedOperation::new()
            .failing("a", ProviderError::network("a reset"))
            .failing("b", ProviderError::network("b reset"))
            .failing("c", ProviderError::network("c reset"));

        let err = balancer
            .execute("chat", &round_robin(), &CancellationToken::new(), |p, _| {
                operation.call(p)
            })
            .await
            .unwrap_err();

        match &err {
            EngineError::NoProvidersAvailable {
                service_type,
                last_error,
            } => {
                assert_eq!(service_type, "chat");
                assert_eq!(last_error.as_ref().map(|e| e.kind()), Some(ErrorKind::Network));
            }
            other => panic!("expected NoProvidersAvailable, got {:?}", other),
        }

        let mut called = operation.calls();
        called.sort();
        assert_eq!(called, vec!["a", "b", "c"]);
        assert_eq!(balancer.get_statistics().failed_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let balancer = balancer_with(&engine_config(5, 3), "chat", &["a", "b"]);
        let operation =
            ScriptedOperation::new().failing("a", ProviderError::client("400", "bad request"));

        let err = balancer
            .execute("chat", &round_robin(), &CancellationToken::new(), |p, _| {
                operation.call(p)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Provider(ProviderError::Client { .. })
        ));
        assert_eq!(operation.calls(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovered_provider_serves_again() {
        let balancer = balancer_with(&engine_config(5, 3), "chat", &["a"]);
        let operation =
            ScriptedOperation::new().failing("a", ProviderError::unavailable("restarting"));
        let cancel = CancellationToken::new();

        let err = balancer
            .execute("chat", &round_robin(), &cancel, |p, _| operation.call(p))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoProvidersAvailable { .. }));

        operation.recover("a");
        let result = balancer
            .execute("chat", &round_robin(), &cancel, |p, _| operation.call(p))
            .await
            .unwrap();
        assert_eq!(result.value, "ok from a");
        assert!(!result.used_fallback);
    }

    // ==================== Selection Tests ====================

    #[tokio::test]
    async fn test_required_capability_limits_candidates() {
        let balancer: LoadBalancer = LoadBalancer::from_config(&engine_config(5, 3));
        balancer.add_provider(
            "chat",
            Arc::new(NamedProvider::new("text-only").with_capabilities(["text"])),
        );
        balancer.add_provider(
            "chat",
            Arc::new(NamedProvider::new("multimodal").with_capabilities(["text", "vision"])),
        );
        let operation = ScriptedOperation::new();
        let criteria = round_robin().with_capability("vision");

        for _ in 0..3 {
            let result = balancer
                .execute("chat", &criteria, &CancellationToken::new(), |p, _| {
                    operation.call(p)
                })
                .await
                .unwrap();
            assert_eq!(result.provider_id, "multimodal");
        }

        let err = balancer
            .execute(
                "chat",
                &round_robin().with_capability("audio"),
                &CancellationToken::new(),
                |p, _| operation.call(p),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NoProvidersAvailable {
                last_error: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_default_criteria_from_config() {
        let mut config = engine_config(5, 3);
        config.selection.algorithm = SelectionAlgorithm::RoundRobin;
        let balancer = balancer_with(&config, "chat", &["a", "b"]);

        for _ in 0..10 {
            balancer
                .execute_default("chat", |p, _| async move {
                    Ok::<_, ProviderError>(p.id().to_string())
                })
                .await
                .unwrap();
        }

        let distribution = balancer.get_load_distribution("chat");
        assert_eq!(distribution.get("a"), Some(&50.0));
        assert_eq!(distribution.get("b"), Some(&50.0));
    }

    // ==================== Concurrency Tests ====================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_executions_from_spawned_tasks() {
        let balancer = Arc::new(balancer_with(
            &engine_config(5, 3),
            "chat",
            &["a", "b", "c"],
        ));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let balancer = Arc::clone(&balancer);
                tokio::spawn(async move {
                    balancer
                        .execute_default("chat", |p, _| async move {
                            tokio::task::yield_now().await;
                            Ok::<_, ProviderError>(p.id().to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let stats = balancer.get_statistics();
        assert_eq!(stats.total_requests, 32);
        assert_eq!(stats.successful_requests, 32);
        assert_eq!(stats.provider_usage.values().sum::<u64>(), 32);
        for id in ["a", "b", "c"] {
            assert_eq!(balancer.outstanding(id), 0);
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let balancer = balancer_with(&engine_config(5, 3), "chat", &["a"]);
        let operation = ScriptedOperation::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = balancer
            .execute("chat", &round_robin(), &cancel, |p, _| operation.call(p))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(operation.calls().is_empty());
        assert_eq!(balancer.get_statistics().cancelled_requests, 1);
        assert!(balancer.monitor().get_metrics("a").is_none());
    }
}
