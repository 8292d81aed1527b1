//! Repository layer for database operations
//!
//! SQLite implementation of the note and version stores.

use super::models::*;
use super::stores::{NoteStore, VersionStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for Repository {
    async fn create_note(&self, owner_id: &str, content: &NoteContent) -> Result<Note> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let image = content.primary_image.as_ref();

        let row = sqlx::query_as::<_, NoteRecord>(
            r#"
            INSERT INTO notes (id, owner_id, title, description, tag, image_path,
                               image_original_name, attachments, pinned, reminder_at,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.tag)
        .bind(image.map(|i| i.path.as_str()))
        .bind(image.map(|i| i.original_name.as_str()))
        .bind(Json(&content.attachments))
        .bind(content.pinned)
        .bind(content.reminder_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created note: {}", id);
        Ok(row.into())
    }

    async fn get_note(&self, id: &str) -> Result<Note> {
        let row = sqlx::query_as::<_, NoteRecord>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note {}", id)))?;

        Ok(row.into())
    }

    async fn list_notes(&self, owner_id: &str) -> Result<Vec<Note>> {
        let rows = sqlx::query_as::<_, NoteRecord>(
            r#"
            SELECT * FROM notes
            WHERE owner_id = ?
            ORDER BY pinned DESC, updated_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn save_note(&self, note: &Note) -> Result<Note> {
        let content = &note.content;
        let image = content.primary_image.as_ref();

        let row = sqlx::query_as::<_, NoteRecord>(
            r#"
            UPDATE notes
            SET title = ?, description = ?, tag = ?, image_path = ?,
                image_original_name = ?, attachments = ?, pinned = ?,
                reminder_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.tag)
        .bind(image.map(|i| i.path.as_str()))
        .bind(image.map(|i| i.original_name.as_str()))
        .bind(Json(&content.attachments))
        .bind(content.pinned)
        .bind(content.reminder_at)
        .bind(Utc::now())
        .bind(&note.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Note {}", note.id)))?;

        tracing::debug!("Saved note: {}", note.id);
        Ok(row.into())
    }

    async fn delete_note(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("Note {}", id)));
        }

        tracing::debug!("Deleted note: {}", id);
        Ok(())
    }
}

#[async_trait]
impl VersionStore for Repository {
    async fn insert_version(&self, version: &NewVersion) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let content = &version.content;
        let image = content.primary_image.as_ref();

        sqlx::query(
            r#"
            INSERT INTO note_versions (id, note_id, owner_id, title, description, tag,
                                       image_path, image_original_name, attachments,
                                       pinned, reminder_at, saved_at, comment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&version.note_id)
        .bind(&version.owner_id)
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.tag)
        .bind(image.map(|i| i.path.as_str()))
        .bind(image.map(|i| i.original_name.as_str()))
        .bind(Json(&content.attachments))
        .bind(content.pinned)
        .bind(content.reminder_at)
        .bind(version.saved_at)
        .bind(&version.comment)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Inserted version {} of note {}", id, version.note_id);
        Ok(id)
    }

    async fn get_version(&self, id: &str) -> Result<NoteVersion> {
        let row = sqlx::query_as::<_, VersionRecord>("SELECT * FROM note_versions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Version {}", id)))?;

        Ok(row.into())
    }

    async fn count_versions(&self, note_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM note_versions WHERE note_id = ?")
            .bind(note_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_oldest(&self, note_id: &str, n: i64) -> Result<Vec<String>> {
        // rowid breaks ties between snapshots saved at the same instant
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM note_versions
            WHERE note_id = ?
            ORDER BY saved_at ASC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(note_id)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn list_by_note(&self, note_id: &str) -> Result<Vec<NoteVersion>> {
        let rows = sqlx::query_as::<_, VersionRecord>(
            r#"
            SELECT * FROM note_versions
            WHERE note_id = ?
            ORDER BY saved_at DESC, rowid DESC
            "#,
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(NoteVersion::from).collect())
    }

    async fn delete_versions(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM note_versions WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = query.build().execute(&self.pool).await?.rows_affected();

        tracing::debug!("Deleted {} versions", rows);
        Ok(rows)
    }

    async fn delete_versions_for_note(&self, note_id: &str) -> Result<u64> {
        let rows = sqlx::query("DELETE FROM note_versions WHERE note_id = ?")
            .bind(note_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Deleted {} versions of note {}", rows, note_id);
        Ok(rows)
    }
}
