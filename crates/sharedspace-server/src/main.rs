use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use sharedspace_api::storage::SupabaseStorage;
use sharedspace_api::{AppStateInner, Config};
use sharedspace_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sharedspace_server=debug,sharedspace_api=debug,sharedspace_db=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let db = Database::open(&config.database_path)?;

    tokio::fs::create_dir_all(&config.upload_path).await?;
    let storage = Arc::new(SupabaseStorage::new(
        &config.storage_url,
        &config.storage_key,
        &config.storage_bucket,
    ));

    let addr: SocketAddr = config.server_address().parse()?;
    let origins = config.allowed_origins.join(", ");
    let state = AppStateInner::new(db, config, storage);
    let app = sharedspace_api::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("SharedSpace listening on {}", addr);
    info!("Allowed origins: {}", origins);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
