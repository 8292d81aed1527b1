//! Version history service
//!
//! Snapshots a note before each mutation, keeps at most `retention_limit`
//! snapshots per note and restores a note from any retained snapshot.
//!
//! Snapshots written as a side effect of another mutation are best-effort:
//! use [`VersionManager::record`], which logs failures instead of returning
//! them. Pruning follows every successful snapshot, either awaited in place
//! or on a tracked background task depending on [`PruneMode`].

use crate::config::COMMENT_BACKUP_BEFORE_RESTORE;
use crate::database::{NewVersion, Note, NoteStore, NoteVersion, VersionStore};
use crate::error::{AppError, Result};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// How pruning is dispatched after a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneMode {
    /// Spawned on a tracked task; the caller does not wait for it
    Background,
    /// Awaited before `snapshot` returns
    Inline,
}

/// Maintains per-note version history
#[derive(Clone)]
pub struct VersionManager {
    notes: Arc<dyn NoteStore>,
    versions: Arc<dyn VersionStore>,
    retention_limit: usize,
    prune_mode: PruneMode,
    pending: TaskTracker,
}

impl VersionManager {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        versions: Arc<dyn VersionStore>,
        retention_limit: usize,
        prune_mode: PruneMode,
    ) -> Self {
        Self {
            notes,
            versions,
            retention_limit,
            prune_mode,
            pending: TaskTracker::new(),
        }
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    /// Persist a copy of `note`'s content and schedule a prune.
    ///
    /// Callers pass the note as it stands before the mutation they are
    /// about to apply.
    pub async fn snapshot(&self, note: &Note, comment: &str) -> Result<String> {
        let version_id = self
            .versions
            .insert_version(&NewVersion::of(note, comment))
            .await?;

        tracing::debug!(
            "Saved version {} of note {} ({})",
            version_id,
            note.id,
            comment
        );

        self.dispatch_prune(&note.id).await;

        Ok(version_id)
    }

    /// Best-effort [`snapshot`](Self::snapshot): failures are logged, never returned
    pub async fn record(&self, note: &Note, comment: &str) -> Option<String> {
        match self.snapshot(note, comment).await {
            Ok(version_id) => Some(version_id),
            Err(e) => {
                tracing::warn!("Version snapshot of note {} failed: {}", note.id, e);
                None
            }
        }
    }

    /// Delete the oldest snapshots of a note beyond `limit`.
    ///
    /// Returns the number of deleted snapshots; a no-op when the note has
    /// `limit` or fewer.
    pub async fn prune(&self, note_id: &str, limit: usize) -> Result<u64> {
        let count = self.versions.count_versions(note_id).await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        if count <= limit {
            return Ok(0);
        }

        let oldest = self.versions.list_oldest(note_id, count - limit).await?;
        let deleted = self.versions.delete_versions(&oldest).await?;

        tracing::debug!(
            "Pruned {} of {} versions of note {} (limit {})",
            deleted,
            count,
            note_id,
            limit
        );

        Ok(deleted)
    }

    /// Snapshots of a note, newest first
    pub async fn list_versions(&self, note_id: &str, requester_id: &str) -> Result<Vec<NoteVersion>> {
        let note = self.notes.get_note(note_id).await?;
        ensure_owner(&note, requester_id)?;

        self.versions.list_by_note(&note.id).await
    }

    /// A single snapshot, checked against its note and owner
    pub async fn get_version(
        &self,
        note_id: &str,
        version_id: &str,
        requester_id: &str,
    ) -> Result<NoteVersion> {
        let (_, version) = self.load_pair(note_id, version_id, requester_id).await?;
        Ok(version)
    }

    /// Overwrite a note's content with a retained snapshot.
    ///
    /// The current content is snapshotted first; if that backup cannot be
    /// written the note is left untouched and the error is returned.
    pub async fn restore(&self, note_id: &str, version_id: &str, requester_id: &str) -> Result<Note> {
        let (mut note, version) = self.load_pair(note_id, version_id, requester_id).await?;

        let backup_id = self.snapshot(&note, COMMENT_BACKUP_BEFORE_RESTORE).await?;

        note.content = version.content;
        let restored = self.notes.save_note(&note).await?;

        tracing::info!(
            "Restored note {} from version {} (backup {})",
            note_id,
            version_id,
            backup_id
        );

        Ok(restored)
    }

    /// Drain background prunes before shutdown.
    ///
    /// The tracker stays closed afterwards. Prunes spawned later are still
    /// tracked, and any later call waits for them too, so overlapping callers
    /// never race on reopening it.
    pub async fn flush_pending(&self) {
        self.pending.close();
        self.pending.wait().await;
    }

    async fn load_pair(
        &self,
        note_id: &str,
        version_id: &str,
        requester_id: &str,
    ) -> Result<(Note, NoteVersion)> {
        let note = self.notes.get_note(note_id).await?;
        let version = self.versions.get_version(version_id).await?;

        ensure_owner(&note, requester_id)?;

        if version.note_id != note.id {
            return Err(AppError::VersionMismatch {
                version_id: version.id,
                note_id: note.id,
            });
        }

        Ok((note, version))
    }

    async fn dispatch_prune(&self, note_id: &str) {
        match self.prune_mode {
            PruneMode::Inline => self.prune_logged(note_id).await,
            PruneMode::Background => {
                let manager = self.clone();
                let note_id = note_id.to_string();
                self.pending.spawn(async move {
                    manager.prune_logged(&note_id).await;
                });
            }
        }
    }

    async fn prune_logged(&self, note_id: &str) {
        if let Err(e) = self.prune(note_id, self.retention_limit).await {
            tracing::error!("Pruning versions of note {} failed: {}", note_id, e);
        }
    }
}

/// Fail with `AppError::Authorization` unless `requester_id` owns `note`
pub fn ensure_owner(note: &Note, requester_id: &str) -> Result<()> {
    if note.owner_id != requester_id {
        tracing::warn!("User {} denied access to note {}", requester_id, note.id);
        return Err(AppError::Authorization);
    }
    Ok(())
}
