//! Configuration integration tests
//!
//! Loading YAML files from disk and building a load balancer from them.

#[cfg(test)]
mod tests {
    use provider_resilience::{
        EngineConfig, EngineError, FallbackStrategy, LoadBalancer, SelectionAlgorithm,
    };
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_config_file() {
        let file = write_config(
            r#"
monitor:
  circuit_breaker:
    failure_threshold: 3
    failure_window: 2m
    open_timeout: 45s
fallback:
  base_delay: 100ms
  max_delay: 5s
  max_attempts: 4
  strategy: immediate
selection:
  algorithm: weighted
"#,
        );

        let config = EngineConfig::from_file(file.path()).await.unwrap();

        assert_eq!(config.monitor.circuit_breaker.failure_threshold, 3);
        assert_eq!(
            config.monitor.circuit_breaker.failure_window,
            Duration::from_secs(120)
        );
        assert_eq!(config.fallback.max_delay, Duration::from_secs(5));
        assert_eq!(config.fallback.strategy, FallbackStrategy::Immediate);

        let balancer: LoadBalancer = LoadBalancer::from_config(&config);
        assert_eq!(balancer.policy().options().max_attempts, 4);
        assert_eq!(
            balancer.default_criteria().algorithm,
            SelectionAlgorithm::Weighted
        );
        assert_eq!(
            balancer.monitor().config().circuit_breaker.open_timeout,
            Duration::from_secs(45)
        );
    }

    #[tokio::test]
    async fn test_invalid_file_is_rejected() {
        let file = write_config("fallback:\n  jitter_factor: 2.0\n");
        let err = EngineConfig::from_file(file.path()).await.unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.to_string().contains("Jitter factor"));
    }

    #[tokio::test]
    async fn test_written_config_loads_back() {
        let mut config = EngineConfig::default();
        config.fallback.max_attempts = 9;
        config.monitor.circuit_breaker.open_timeout = Duration::from_secs(90);

        let file = write_config(&config.to_yaml().unwrap());
        let loaded = EngineConfig::from_file(file.path()).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_overrides_apply_on_top_of_file() {
        let file = write_config("fallback:\n  max_attempts: 2\n");
        let config = EngineConfig::from_file(file.path())
            .await
            .unwrap()
            .apply_overrides_from(|key: &str| match key {
                "RESILIENCE_MAX_ATTEMPTS" => Some("7".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.fallback.max_attempts, 7);
    }
}
