//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::api::{IdentityResolver, TokenTable};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{
    AttachmentsService, NotesService, PruneMode, Settings, VersionManager,
};
use crate::storage::UploadStore;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub notes: NotesService,
    pub versions: VersionManager,
    pub attachments: AttachmentsService,
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        uploads: UploadStore,
        identity: Arc<dyn IdentityResolver>,
        retention_limit: usize,
        prune_mode: PruneMode,
    ) -> Self {
        let repo = Arc::new(Repository::new(pool));
        let versions = VersionManager::new(repo.clone(), repo.clone(), retention_limit, prune_mode);
        let notes = NotesService::new(repo.clone(), repo, versions.clone());

        Self {
            notes,
            versions,
            attachments: AttachmentsService::new(uploads),
            identity,
        }
    }
}

/// Application setup - called once on startup
pub async fn setup(settings: &Settings) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Data directory: {:?}", settings.storage.data_dir);

    tokio::fs::create_dir_all(&settings.storage.data_dir).await?;

    let pool = create_pool(&settings.database_path()).await?;

    let uploads = UploadStore::new(settings.uploads_dir());
    uploads.initialize().await?;

    let identity = Arc::new(TokenTable::from_settings(&settings.auth));

    let prune_mode = if settings.versions.prune_in_background {
        PruneMode::Background
    } else {
        PruneMode::Inline
    };

    tracing::info!(
        "Keeping {} versions per note ({:?} pruning)",
        settings.versions.retention_limit,
        prune_mode
    );

    let state = AppState::new(
        pool,
        uploads,
        identity,
        settings.versions.retention_limit,
        prune_mode,
    );

    tracing::info!("Application initialized successfully");

    Ok(state)
}
