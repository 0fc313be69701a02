//! pingwatch Binary Entry Point
//!
//! Loads the configuration, starts one scheduling loop per target and the
//! metrics endpoint, then runs until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pingwatch::{
    IcmpProber, PingMetrics, Supervisor,
    config::{AppConfig, parse_duration},
    server::{AppState, create_router},
};
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// pingwatch - ICMP reachability monitor with Prometheus metrics
#[derive(Parser, Debug)]
#[command(name = "pingwatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short = 'f',
        long,
        default_value = "pingwatch.yaml",
        env = "PINGWATCH_CONFIG"
    )]
    config: String,

    /// Metrics bind address (overrides config file)
    #[arg(long, env = "PINGWATCH_METRICS_ADDRESS")]
    metrics_address: Option<String>,

    /// Metrics port (overrides config file)
    #[arg(long, env = "PINGWATCH_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Global cycle interval, e.g. "30s" (overrides config file)
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A bad config aborts before any loop starts.
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(address) = cli.metrics_address {
        config.metrics.address = address;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Some(interval) = cli.interval {
        config.interval = interval;
    }
    config.validate()?;

    // Initialize tracing: RUST_LOG > config file > "info"
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or("info")))
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Loaded configuration from: {}", cli.config);

    let registry = Registry::new();
    let metrics = PingMetrics::new(&registry)?;
    let mut supervisor =
        Supervisor::new(Arc::new(IcmpProber::new()), metrics).with_grace(config.shutdown_grace);

    for (target, cadence) in config.resolve_targets()? {
        supervisor.add_target(target, cadence)?;
    }
    if supervisor.is_empty() {
        tracing::warn!("No targets configured; only the metrics endpoint will run");
    }

    let shutdown = supervisor.shutdown_token();
    let app = create_router(AppState {
        registry,
        targets: supervisor.targets(),
    });

    let addr = config.metrics_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on: http://{}/metrics", addr);

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    tokio::spawn(shutdown_signal(shutdown));
    tracing::info!("Press Ctrl+C to shutdown");

    let report = supervisor.run().await?;
    if !report.is_clean() {
        tracing::warn!(
            timed_out = ?report.timed_out,
            failed = ?report.failed,
            "Exiting with loops that did not stop cleanly"
        );
    }

    server.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Cancel the shutdown token on Ctrl+C or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    shutdown.cancel();
}
