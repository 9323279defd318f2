//! Storefront Insights Server
//!
//! Acquires products, users and transactions, enriches the transactions and
//! serves spending and category insights over HTTP.

use clap::{Arg, Command};
use std::sync::Arc;
use storefront_insights::{
    api::start_server,
    core::{config::InsightsMode, AppState, Config, SnapshotStore},
    pipeline::BatchPolicy,
    sources::HttpSource,
    Error, Result,
};
use tokio::signal;
use tracing::info;

// Configure global allocator for maximum performance
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("storefront-insights")
        .version(storefront_insights::VERSION)
        .about("Enrichment and aggregation service for storefront data.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
        )
        .arg(
            Arg::new("http-addr")
                .long("http-addr")
                .value_name("ADDR")
                .help("HTTP server bind address")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("batch-policy")
                .long("batch-policy")
                .value_name("POLICY")
                .help("Handling of items that cannot be enveloped (drop_batch, skip_item)")
        )
        .arg(
            Arg::new("product-insights")
                .long("product-insights")
                .value_name("MODE")
                .help("Data behind /insights/products (live, snapshot)")
        )
        .get_matches();

    // Load configuration
    let mut config = if let Some(config_path) = matches.get_one::<String>("config") {
        Config::from_file(config_path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    apply_cli_overrides(&mut config, &matches)?;
    config.validate()?;

    // Initialize logging and metrics
    storefront_insights::init(&config.logging)?;

    info!("Starting Storefront Insights v{}", storefront_insights::VERSION);

    let source = HttpSource::new(config.sources.clone(), config.pipeline.batch_policy)?;
    let store = Arc::new(SnapshotStore::initialize(Arc::new(source)).await);

    let addr = config.server.http_addr;
    let state = AppState::new(store, config);

    start_server(addr, state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Apply command line argument overrides to configuration
fn apply_cli_overrides(config: &mut Config, matches: &clap::ArgMatches) -> Result<()> {
    if let Some(addr) = matches.get_one::<String>("http-addr") {
        config.server.http_addr = addr.parse()
            .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
    }

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }

    if let Some(policy) = matches.get_one::<String>("batch-policy") {
        config.pipeline.batch_policy = policy.parse::<BatchPolicy>().map_err(Error::config)?;
    }

    if let Some(mode) = matches.get_one::<String>("product-insights") {
        config.pipeline.product_insights = mode.parse::<InsightsMode>()?;
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
