//! Prometheus exporter for Awair air-quality sensors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use awair_exporter::{
    AirQualityCollector, AwairClient, ExporterConfig, HttpServer, Poller, init_tracing,
};

/// Prometheus exporter for Awair air-quality sensors.
#[derive(Parser, Debug)]
#[command(name = "awair-exporter")]
#[command(about = "Export Awair local API readings as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Sensor address, host or host:port (overrides config).
    #[arg(long, env = "AWAIR_HOST")]
    host: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Value of the location label (overrides config).
    #[arg(long)]
    location: Option<String>,

    /// Seconds between sensor fetches (overrides config).
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExporterConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => ExporterConfig::default(),
    };

    // CLI and environment override the file
    if let Some(host) = args.host {
        config.sensor.host = host;
    }
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(location) = args.location {
        config.sensor.location = location;
    }
    if let Some(interval) = args.interval_secs {
        config.polling.interval_secs = interval;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Awair exporter");

    if config.sensor.host.is_empty() {
        warn!("No sensor host configured (set AWAIR_HOST); every fetch will fail");
    }

    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let collector = Arc::new(AirQualityCollector::new(config.sensor.location.clone()));
    let client = AwairClient::new(&config.sensor.host, config.sensor.timeout())?;

    // Bind before spawning anything so a taken port is fatal
    let http_server = HttpServer::bind(
        collector.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = Poller::new(collector.clone(), client, config.polling.interval());
    let poller_task = tokio::spawn(poller.run(shutdown_rx.clone()));

    let mut http_task = tokio::spawn(http_server.run(shutdown_rx));

    tokio::select! {
        result = &mut http_task => {
            // The server only returns early on error
            let _ = shutdown_tx.send(true);
            let _ = poller_task.await;
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(error = %e, "HTTP server failed");
                    Err(e.into())
                }
                Err(e) => Err(e.into()),
            };
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to install SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    let _ = shutdown_tx.send(true);

    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = poller_task.await;
        let _ = http_task.await;
    })
    .await;

    let stats = collector.stats();
    info!(
        refreshes_succeeded = stats.refreshes_succeeded,
        refreshes_failed = stats.refreshes_failed,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
