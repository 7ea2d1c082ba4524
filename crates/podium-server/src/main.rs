mod cleanup;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use podium_api::{AppState, AppStateInner, Storage};
use podium_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "podium_server=debug,podium_api=debug,podium_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let host = std::env::var("PODIUM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PODIUM_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("PODIUM_DB_PATH")
        .unwrap_or_else(|_| "podium.db".into())
        .into();
    let upload_dir: PathBuf = std::env::var("PODIUM_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let cleanup_interval_secs: u64 = std::env::var("PODIUM_CLEANUP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600); // hourly

    // Init DB and storage
    let db = Database::open(&db_path)?;
    let storage = Storage::new(upload_dir).await?;
    let state: AppState = Arc::new(AppStateInner { db, storage });

    // Background sweep for photo files orphaned by cascade deletes
    tokio::spawn(cleanup::run_cleanup_loop(
        state.clone(),
        cleanup_interval_secs,
    ));

    let app = podium_api::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Podium server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

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
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
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
