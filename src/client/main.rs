/**
 * FitSync Sync Daemon
 *
 * Opens the local database, replays queued writes against the fitness API
 * whenever the server is reachable, and prunes expired failed operations.
 * Runs until Ctrl-C.
 *
 * Usage: fitsync-sync [config.toml]
 */

use fitsync::client::api::HttpApiClient;
use fitsync::client::config::Config;
use fitsync::client::local_db::LocalDatabase;
use fitsync::client::offline::SyncQueue;
use fitsync::client::sync::{NetworkMonitor, NetworkStatus, SyncConfig, SyncService};
use fitsync::shared::config::AppConfig;
use std::sync::Arc;
use std::time::Duration;

/// How often expired failed operations are pruned
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let app = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };
    let config = Config::from_env(app)?;

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_filter().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[STARTUP] Syncing against {}", config.server_url());

    let db = Arc::new(LocalDatabase::open(config.database_path()).await?);
    let queue = Arc::new(SyncQueue::new(db.clone()).with_max_retry(config.app().max_retry));
    queue.initialize().await?;

    let api = Arc::new(HttpApiClient::new(config.clone())?);
    let network = Arc::new(NetworkMonitor::new(NetworkStatus::Offline));

    let mut service = SyncService::new(
        queue.clone(),
        api,
        network.clone(),
        SyncConfig::from_app(config.app()),
    );
    service.start().await?;

    let probe = tokio::spawn(probe_connectivity(config.clone(), network));
    let cleanup = tokio::spawn(prune_failed(queue.clone(), config.app().failed_retention()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("[STARTUP] Shutting down");

    probe.abort();
    cleanup.abort();
    service.stop();

    let status = service.status().await;
    tracing::info!(
        "[STARTUP] {} operations pending, {} failed",
        status.pending_operations,
        status.failed_operations
    );

    queue.dispose().await;
    db.close().await;
    Ok(())
}

/// Mark the network online whenever the server answers at all
async fn probe_connectivity(config: Config, network: Arc<NetworkMonitor>) {
    let client = match reqwest::Client::builder()
        .timeout(config.app().request_timeout())
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("[STARTUP] Connectivity probe disabled: {}", e);
            network.set_online(true);
            return;
        }
    };

    let mut interval = tokio::time::interval(config.app().sync_interval());
    loop {
        interval.tick().await;
        let reachable = client.head(config.server_url()).send().await.is_ok();
        network.set_online(reachable);
    }
}

async fn prune_failed(queue: Arc<SyncQueue>, retention: Duration) {
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
    loop {
        interval.tick().await;
        match queue.cleanup_failed(retention).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!("[STARTUP] Pruned {} failed operations", removed),
            Err(e) => tracing::warn!("[STARTUP] Failed to prune failed operations: {}", e),
        }
    }
}
