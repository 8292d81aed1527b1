//! Store doubles for unit tests

use super::models::{NewVersion, NoteVersion};
use super::repository::Repository;
use super::stores::VersionStore;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// Version store over a real repository whose writes can be switched to fail
pub(crate) struct FlakyVersions {
    inner: Repository,
    pub fail_inserts: AtomicBool,
    pub fail_purges: AtomicBool,
}

impl FlakyVersions {
    pub fn new(inner: Repository) -> Self {
        Self {
            inner,
            fail_inserts: AtomicBool::new(false),
            fail_purges: AtomicBool::new(false),
        }
    }
}

fn unavailable() -> AppError {
    AppError::Database(sqlx::Error::PoolClosed)
}

#[async_trait]
impl VersionStore for FlakyVersions {
    async fn insert_version(&self, version: &NewVersion) -> Result<String> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.insert_version(version).await
    }

    async fn get_version(&self, id: &str) -> Result<NoteVersion> {
        self.inner.get_version(id).await
    }

    async fn count_versions(&self, note_id: &str) -> Result<i64> {
        self.inner.count_versions(note_id).await
    }

    async fn list_oldest(&self, note_id: &str, n: i64) -> Result<Vec<String>> {
        self.inner.list_oldest(note_id, n).await
    }

    async fn list_by_note(&self, note_id: &str) -> Result<Vec<NoteVersion>> {
        self.inner.list_by_note(note_id).await
    }

    async fn delete_versions(&self, ids: &[String]) -> Result<u64> {
        self.inner.delete_versions(ids).await
    }

    async fn delete_versions_for_note(&self, note_id: &str) -> Result<u64> {
        if self.fail_purges.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.delete_versions_for_note(note_id).await
    }
}
