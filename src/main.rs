use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use echo_server::config::{self, ServerConfig};
use echo_server::http::HttpServer;
use echo_server::lifecycle::{signals, ServerLifecycle, TerminationSignals};
use echo_server::observability::{
    logging::init_logging,
    metrics::{spawn_upkeep, PrometheusMetrics},
};

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "echo-server")]
#[command(about = "Echoes request headers back, with health and metrics endpoints", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used without one.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<ServerConfig, config::ConfigError> {
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        config = config::loader::validate(config)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("echo-server: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "echo-server starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        grace_period_ms = config.shutdown.grace_period_ms,
        latency_enabled = config.echo.latency.enabled,
        relay_enabled = config.relay.enabled,
        "Configuration loaded"
    );

    let prometheus = if config.observability.metrics_enabled {
        match PrometheusMetrics::register() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::warn!(error = %e, "Metrics registration failed, continuing without metrics");
                None
            }
        }
    } else {
        None
    };
    if let Some(metrics) = &prometheus {
        spawn_upkeep(metrics.clone(), METRICS_UPKEEP_INTERVAL);
    }

    let signals = match TerminationSignals::register() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let grace_period = config.shutdown.grace_period();
    let listener_config = config.listener.clone();
    let router = HttpServer::new(config, prometheus).into_router();

    let lifecycle = match ServerLifecycle::start(&listener_config, grace_period, router).await {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            return ExitCode::FAILURE;
        }
    };

    tokio::spawn(signals::watch(signals, lifecycle.shutdown_handle()));

    let status = lifecycle.status();
    let outcome = tokio::spawn(lifecycle.run()).await;

    match outcome {
        Ok(Ok(())) => {
            tracing::info!(state = %status.get(), "Server exiting");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, state = %status.get(), "Server forced to shut down");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Server task failed");
            ExitCode::FAILURE
        }
    }
}
