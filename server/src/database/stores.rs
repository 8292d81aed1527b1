//! Storage interfaces consumed by the services
//!
//! `Repository` implements both traits on SQLite. Single-record reads,
//! writes and deletes are atomic; nothing here promises atomicity across
//! several calls.

use super::models::{NewVersion, Note, NoteContent, NoteVersion};
use crate::error::Result;
use async_trait::async_trait;

/// Canonical storage of live notes
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a new note owned by `owner_id`
    async fn create_note(&self, owner_id: &str, content: &NoteContent) -> Result<Note>;

    /// Fetch a note, `AppError::NotFound` when absent
    async fn get_note(&self, id: &str) -> Result<Note>;

    /// All notes of an owner, pinned first, then most recently modified
    async fn list_notes(&self, owner_id: &str) -> Result<Vec<Note>>;

    /// Persist the content fields of `note`; id and owner never change
    async fn save_note(&self, note: &Note) -> Result<Note>;

    /// Remove a note, `AppError::NotFound` when absent
    async fn delete_note(&self, id: &str) -> Result<()>;
}

/// Append-only (but pruned) log of snapshots
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Write a snapshot and return its id
    async fn insert_version(&self, version: &NewVersion) -> Result<String>;

    /// Fetch a snapshot, `AppError::NotFound` when absent
    async fn get_version(&self, id: &str) -> Result<NoteVersion>;

    async fn count_versions(&self, note_id: &str) -> Result<i64>;

    /// Ids of the `n` oldest snapshots of a note, oldest first
    async fn list_oldest(&self, note_id: &str, n: i64) -> Result<Vec<String>>;

    /// Snapshots of a note, newest first
    async fn list_by_note(&self, note_id: &str) -> Result<Vec<NoteVersion>>;

    /// Delete snapshots by id, returning how many were removed
    async fn delete_versions(&self, ids: &[String]) -> Result<u64>;

    /// Delete every snapshot of a note
    async fn delete_versions_for_note(&self, note_id: &str) -> Result<u64>;
}
