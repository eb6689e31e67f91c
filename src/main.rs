use std::sync::{Arc, Mutex};

use alpha_tracker::{
    api::{self, AppState},
    blocks::BlockService,
    config, db,
    explorer::ExplorerClient,
    tracker::Tracker,
};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Alpha Tracker starting...");

    let cfg = config::load()?;
    info!("  Explorer: {} (chain {})", cfg.explorer_url, cfg.chain_id);
    info!("  DB Path: {}", cfg.db_path);
    info!("  Port: {}", cfg.port);
    info!("  DEX router filter: {:?}", cfg.dex_router);
    info!("  Volume multiplier: {}", cfg.volume_multiplier);

    // Run DB migrations once at startup
    let conn = db::connect(&cfg.db_path)?;
    db::run_migrations(&conn)?;
    let shared_conn = Arc::new(Mutex::new(conn));

    let explorer = Arc::new(ExplorerClient::new(&cfg)?);
    let state = AppState {
        tracker: Arc::new(Tracker::new(cfg.clone(), Arc::clone(&explorer))?),
        blocks: Arc::new(BlockService::new(explorer, shared_conn)),
    };

    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        async move { api::serve(&cfg, state).await }
    });

    // Graceful shutdown
    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Alpha Tracker stopped.");
    Ok(())
}
