use std::env;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use seriesdb::{metrics, Database, StoreConfig};

/// Config file path: first argument, else `SERIESDB_CONFIG`, else defaults
fn load_config() -> Result<StoreConfig, seriesdb::Error> {
    match env::args().nth(1).or_else(|| env::var("SERIESDB_CONFIG").ok()) {
        Some(path) => {
            info!("Loading config from {}", path);
            Ok(StoreConfig::from_json_file(path)?)
        }
        None => Ok(StoreConfig::default()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(true)
        .pretty()
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(addr) = config.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr) {
            error!("Failed to initialize metrics: {}", e);
        } else {
            info!("Metrics server listening on {}", addr);
        }
    }

    info!("Starting seriesdb...");
    let db = match Database::open(config) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };
    db.start().await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl+c: {}", e);
    }
    info!("Shutting down...");

    match db.shutdown().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Shutdown failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
