//! resilience-sim - drive the engine against simulated providers
//!
//! Each `--provider` is `name:failure_rate:latency_ms`. The simulator runs
//! `--requests` executions through the load balancer and prints the
//! resulting statistics, load distribution and per-provider metrics as JSON.

#![allow(missing_docs)]

use anyhow::{Context, bail};
use clap::Parser;
use futures::{StreamExt, stream};
use provider_resilience::{
    CancellationToken, EngineConfig, LoadBalancer, LogFormat, Provider, ProviderError,
    SelectionAlgorithm, init_tracing,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};

const SERVICE_TYPE: &str = "simulated";

#[derive(Parser)]
#[command(name = "resilience-sim")]
#[command(about = "Run simulated traffic through the provider resilience engine")]
#[command(version)]
struct Cli {
    /// YAML configuration file (defaults are used when omitted)
    #[arg(long, env = "RESILIENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Simulated provider as name:failure_rate:latency_ms (repeatable)
    #[arg(
        long = "provider",
        default_values = ["primary:0.1:50", "secondary:0.3:20", "backup:0.0:200"]
    )]
    providers: Vec<ProviderProfile>,

    /// Number of executions to run
    #[arg(long, default_value_t = 100)]
    requests: usize,

    /// Executions in flight at once
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Override the configured selection algorithm
    #[arg(long)]
    algorithm: Option<SelectionAlgorithm>,

    /// Log output format: pretty or json
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Debug, Clone)]
struct ProviderProfile {
    name: String,
    failure_rate: f64,
    latency: Duration,
}

impl FromStr for ProviderProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [name, failure_rate, latency_ms] = parts.as_slice() else {
            return Err(format!(
                "expected name:failure_rate:latency_ms, got '{}'",
                s
            ));
        };

        if name.is_empty() {
            return Err("provider name must not be empty".to_string());
        }
        let failure_rate: f64 = failure_rate
            .parse()
            .map_err(|e| format!("invalid failure rate '{}': {}", failure_rate, e))?;
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(format!("failure rate {} is outside 0.0..=1.0", failure_rate));
        }
        let latency_ms: u64 = latency_ms
            .parse()
            .map_err(|e| format!("invalid latency '{}': {}", latency_ms, e))?;

        Ok(Self {
            name: name.to_string(),
            failure_rate,
            latency: Duration::from_millis(latency_ms),
        })
    }
}

/// Provider that sleeps for its latency and then fails at its failure rate
#[derive(Debug)]
struct SimulatedProvider {
    profile: ProviderProfile,
}

impl Provider for SimulatedProvider {
    fn id(&self) -> &str {
        &self.profile.name
    }
}

impl SimulatedProvider {
    async fn call(&self, request: usize, cancel: CancellationToken) -> Result<String, ProviderError> {
        let fails = rand::random::<f64>() < self.profile.failure_rate;

        tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            _ = tokio::time::sleep(self.profile.latency) => {}
        }

        if fails {
            Err(ProviderError::unavailable(format!(
                "{} rejected request {}",
                self.profile.name, request
            )))
        } else {
            Ok(format!("request {} served by {}", request, self.profile.name))
        }
    }
}

async fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).await?,
        None => EngineConfig::default(),
    };
    let mut config = config
        .apply_env_overrides()
        .context("Failed to apply environment overrides")?;

    if let Some(algorithm) = cli.algorithm {
        config.selection.algorithm = algorithm;
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.concurrency == 0 {
        bail!("--concurrency must be greater than 0");
    }

    let config = load_config(&cli).await?;
    let balancer: LoadBalancer<SimulatedProvider> = LoadBalancer::from_config(&config);
    for profile in &cli.providers {
        let provider = Arc::new(SimulatedProvider { profile: profile.clone() });
        if balancer.add_provider(SERVICE_TYPE, provider).is_some() {
            warn!(provider = %profile.name, "Duplicate provider replaced");
        }
    }

    let shutdown = CancellationToken::new();
    let cleanup = Arc::clone(balancer.monitor()).start_cleanup_task(shutdown.child_token());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight executions");
                shutdown.cancel();
            }
        });
    }

    info!(
        providers = cli.providers.len(),
        requests = cli.requests,
        algorithm = %config.selection.algorithm,
        "Starting simulation"
    );

    let criteria = balancer.default_criteria();
    let balancer = &balancer;
    let criteria = &criteria;
    let cancel = &shutdown;
    let outcomes: Vec<bool> = stream::iter(0..cli.requests)
        .map(|request| async move {
            let result = balancer
                .execute(SERVICE_TYPE, criteria, cancel, |provider, token| async move {
                    provider.call(request, token).await
                })
                .await;
            match result {
                Ok(result) => {
                    info!(
                        provider = %result.provider_id,
                        attempts = result.attempts,
                        "{}",
                        result.value
                    );
                    true
                }
                Err(e) => {
                    warn!(request, error = %e, "Request failed");
                    false
                }
            }
        })
        .buffer_unordered(cli.concurrency)
        .collect()
        .await;

    shutdown.cancel();
    cleanup.await.context("Cleanup task panicked")?;

    let report = serde_json::json!({
        "succeeded": outcomes.iter().filter(|ok| **ok).count(),
        "statistics": balancer.get_statistics(),
        "distribution": balancer.get_load_distribution(SERVICE_TYPE),
        "metrics": balancer.monitor().get_all_metrics(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_format, Level::INFO) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
