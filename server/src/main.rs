// NoteVault - personal notes service with version history
// Entry point and server setup

use anyhow::Context;
use notevault::services::SettingsService;
use notevault::{api, app};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notevault=debug,tower_http=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting NoteVault");

    let settings_service = SettingsService::from_env();
    let settings = settings_service
        .load_with_env()
        .await
        .with_context(|| format!("Failed to load settings from {:?}", settings_service.path()))?;

    let state = app::setup(&settings)
        .await
        .context("Failed to initialize application")?;
    let versions = state.versions.clone();

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server.bind_address))?;

    tracing::info!("Listening on {}", settings.server.bind_address);

    axum::serve(listener, api::create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let in-flight prunes finish before exit
    versions.flush_pending().await;

    tracing::info!("NoteVault stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
