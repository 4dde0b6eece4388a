use std::sync::Arc;
use std::time::Duration;

use csvmark::{FileArtifactStore, JobRegistry, Settings, SweepScheduler};
use csvmark_server::{build_router, AppState};

/// How long in-flight jobs get to finish after the listener closes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> csvmark::Result<()> {
    let settings = Settings::from_env()?;
    csvmark::logging::init(&settings.log_level, settings.log_format)?;

    let store = FileArtifactStore::new(&settings.upload_dir, &settings.download_dir)?;
    tracing::info!(
        uploads = %settings.upload_dir.display(),
        downloads = %settings.download_dir.display(),
        "Artifact directories ready"
    );

    let registry = Arc::new(JobRegistry::new());
    let sweeper = SweepScheduler::new(
        Arc::clone(&registry),
        settings.sweep_interval(),
        settings.job_max_age(),
    );
    let sweep_handle = sweeper.start();

    let addr = settings.bind_address();
    let state = AppState::new(registry, Arc::new(store), settings);
    let dispatcher = Arc::clone(&state.dispatcher);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped accepting connections, cleaning up");

    sweeper.stop();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;

    let pending = dispatcher.in_flight();
    if pending > 0 {
        tracing::info!(pending, "Waiting for in-flight jobs");
        if tokio::time::timeout(DRAIN_TIMEOUT, dispatcher.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = dispatcher.in_flight(),
                "Jobs still running at shutdown"
            );
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
