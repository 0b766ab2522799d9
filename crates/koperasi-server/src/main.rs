mod config;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use koperasi_api::location::GeoClient;
use koperasi_api::storage::Storage;
use koperasi_api::{AppState, AppStateInner};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "koperasi=debug,koperasi_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if !config.production {
        warn!("Running in development mode: session cookies are not marked Secure");
    }

    // Init database and file storage
    let db = koperasi_db::Database::open(&config.db_path)?;
    let storage = Storage::new(config.public_dir.clone()).await?;
    let geo = GeoClient::new(config.geo_base_url.clone())?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        geo,
        jwt_secret: config.jwt_secret.clone(),
        secure_cookies: config.production,
    });

    let app = koperasi_api::router(state).layer(TraceLayer::new_for_http());

    info!("Koperasi server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
