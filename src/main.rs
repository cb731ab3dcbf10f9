use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use restock_watcher::app::build_scheduler;
use restock_watcher::config::{LoggingConfig, MetricsConfig};
use restock_watcher::plugins::PluginManager;
use restock_watcher::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "restock-watcher", version, about = "Watches retailer listings and alerts when tracked items are back in stock")]
struct Cli {
    /// Directory holding default.toml and its overrides
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Run a single search cycle for every family, then exit
    #[arg(long)]
    once: bool,

    /// Keep profiles in memory and only log alerts
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("restock_watcher={}", logging.level)),
    };
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("failed to install tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init().context("failed to install tracing subscriber")?;
            Ok(None)
        }
    }
}

fn init_metrics(metrics: &MetricsConfig) -> Result<()> {
    if !metrics.enabled {
        return Ok(());
    }
    let address: SocketAddr = metrics
        .listen_address
        .parse()
        .with_context(|| format!("invalid metrics listen address '{}'", metrics.listen_address))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .context("failed to start Prometheus exporter")?;
    info!("Serving metrics on http://{}/metrics", address);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = AppConfig::from_dir(&cli.config_dir)
        .with_context(|| format!("failed to load configuration from {}", cli.config_dir.display()))?;
    let _log_guard = init_tracing(&config.logging)?;
    init_metrics(&config.metrics)?;

    info!("Starting Restock Watcher...");
    if cli.dry_run {
        info!("Dry run: profiles stay in memory and alerts are only logged");
    }

    let plugins = PluginManager::from_config(&config, cli.dry_run).await?;
    let mut scheduler = build_scheduler(&config, &plugins, cli.dry_run).await?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            shutdown.cancel();
        }
    });

    if cli.once {
        for report in scheduler.run_once(&cancel).await {
            info!(
                "{}: fetched={} in_stock={} transitions={} promoted={:?} alert_sent={}",
                report.family,
                report.fetched,
                report.in_stock,
                report.transitions.len(),
                report.promoted,
                report.alert_sent()
            );
        }
    } else {
        scheduler.run(&cancel).await;
    }

    let stats = scheduler.stats();
    info!(
        "Stopped after {} cycles over {} families ({} failed fetches, {} alerts)",
        stats.completed_cycles, stats.families, stats.failed_fetches, stats.alerts_sent
    );

    Ok(())
}
