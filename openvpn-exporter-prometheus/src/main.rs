//! Prometheus exporter for OpenVPN status reports.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use openvpn_exporter_prometheus::config::LogFormat;
use openvpn_exporter_prometheus::{ExporterConfig, HttpServer, OpenVpnCollector, Registry};

/// Prometheus exporter for OpenVPN status reports.
#[derive(Parser, Debug)]
#[command(name = "openvpn-exporter-prometheus")]
#[command(about = "Export OpenVPN status reports as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on for web interface and telemetry (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Path under which to expose metrics (overrides config).
    #[arg(long)]
    metrics_path: Option<String>,

    /// Path at which OpenVPN places its status file (overrides config).
    #[arg(long)]
    status_path: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI flags override the file
    if let Some(listen) = args.listen {
        config.web.listen = listen;
    }
    if let Some(path) = args.metrics_path {
        config.web.path = path;
    }
    if let Some(status_path) = args.status_path {
        config.openvpn.status_path = status_path;
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("openvpn_exporter_prometheus={}", log_level).parse()?)
        .add_directive(format!("openvpn_status={}", log_level).parse()?)
        .add_directive(format!("tower_http={}", log_level).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!("Starting OpenVPN Prometheus Exporter");

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // The descriptor registry is built once and shared read-only
    let registry = Arc::new(Registry::openvpn());
    let collector = Arc::new(OpenVpnCollector::new(
        &config.openvpn.status_path,
        registry,
    ));

    // Parse listen address
    let listen_addr = config
        .web
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    info!(
        status_path = %collector.status_path().display(),
        "Reading OpenVPN status file"
    );

    let http_server = HttpServer::new(collector.clone(), listen_addr, config.web.path.clone());

    // Start HTTP server
    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    // Print final stats
    let stats = collector.stats();
    info!(
        scrapes_total = stats.scrapes_total,
        parse_failures = stats.parse_failures,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
