//! Notes service
//!
//! High-level business logic for notes operations. Every mutation records
//! the note's prior state through the [`VersionManager`] before applying
//! the change.

use crate::config::{COMMENT_BEFORE_DELETE, COMMENT_BEFORE_UPDATE, COMMENT_INITIAL};
use crate::database::{
    Attachment, NewNote, Note, NoteContent, NoteFilter, NotePatch, NoteStore, Patch, PrimaryImage,
    VersionStore,
};
use crate::error::{AppError, Result};
use crate::services::versions::{ensure_owner, VersionManager};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Service for managing notes
#[derive(Clone)]
pub struct NotesService {
    notes: Arc<dyn NoteStore>,
    versions: Arc<dyn VersionStore>,
    history: VersionManager,
}

impl NotesService {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        versions: Arc<dyn VersionStore>,
        history: VersionManager,
    ) -> Self {
        Self {
            notes,
            versions,
            history,
        }
    }

    /// Create a new note and record its initial version
    pub async fn create_note(&self, owner_id: &str, new_note: NewNote) -> Result<Note> {
        tracing::info!("Creating new note for {}: {}", owner_id, new_note.title);

        let content = NoteContent {
            title: new_note.title,
            description: new_note.description,
            tag: new_note.tag,
            primary_image: new_note.primary_image,
            attachments: new_note.attachments,
            pinned: new_note.pinned,
            reminder_at: new_note.reminder_at,
        };

        let note = self.notes.create_note(owner_id, &content).await?;
        self.history.record(&note, COMMENT_INITIAL).await;

        tracing::info!("Note created successfully: {}", note.id);

        Ok(note)
    }

    /// Get a note owned by `requester_id`
    pub async fn get_note(&self, id: &str, requester_id: &str) -> Result<Note> {
        let note = self.notes.get_note(id).await?;
        ensure_owner(&note, requester_id)?;
        Ok(note)
    }

    /// List a user's notes, pinned first
    pub async fn list_notes(&self, owner_id: &str, filter: &NoteFilter) -> Result<Vec<Note>> {
        let notes = self.notes.list_notes(owner_id).await?;

        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let tag = filter.tag.as_deref().filter(|t| !t.is_empty());

        let filtered = notes
            .into_iter()
            .filter(|note| tag.map_or(true, |tag| note.content.tag == tag))
            .filter(|note| {
                search.as_deref().map_or(true, |query| {
                    note.content.title.to_lowercase().contains(query)
                        || note.content.description.to_lowercase().contains(query)
                        || note.content.tag.to_lowercase().contains(query)
                })
            })
            .collect();

        Ok(filtered)
    }

    /// Notes with a reminder set, soonest first
    pub async fn list_reminders(&self, owner_id: &str) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .notes
            .list_notes(owner_id)
            .await?
            .into_iter()
            .filter(|note| note.content.reminder_at.is_some())
            .collect();

        notes.sort_by_key(|note| note.content.reminder_at);

        Ok(notes)
    }

    /// Apply a partial update; absent fields keep their values
    pub async fn update_note(&self, id: &str, requester_id: &str, patch: NotePatch) -> Result<Note> {
        tracing::debug!("Updating note: {}", id);

        let note = self.get_note(id, requester_id).await?;

        let mut next = note.clone();
        apply_patch(&mut next.content, patch)?;

        self.history.record(&note, COMMENT_BEFORE_UPDATE).await;

        let saved = self.notes.save_note(&next).await?;

        tracing::debug!("Note updated successfully: {}", saved.id);

        Ok(saved)
    }

    pub async fn set_pinned(&self, id: &str, requester_id: &str, pinned: bool) -> Result<Note> {
        let patch = NotePatch {
            pinned: Patch::Value(pinned),
            ..Default::default()
        };
        self.update_note(id, requester_id, patch).await
    }

    /// Set or clear (`None`) a note's reminder
    pub async fn set_reminder(
        &self,
        id: &str,
        requester_id: &str,
        reminder_at: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let patch = NotePatch {
            reminder_at: reminder_at.map_or(Patch::Null, Patch::Value),
            ..Default::default()
        };
        self.update_note(id, requester_id, patch).await
    }

    /// Append already-stored attachments to a note
    pub async fn add_attachments(
        &self,
        id: &str,
        requester_id: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Note> {
        let patch = NotePatch {
            add_attachments: attachments,
            ..Default::default()
        };
        self.update_note(id, requester_id, patch).await
    }

    /// Replace a note's primary image
    pub async fn set_primary_image(
        &self,
        id: &str,
        requester_id: &str,
        image: PrimaryImage,
    ) -> Result<Note> {
        let patch = NotePatch {
            primary_image: Patch::Value(image),
            ..Default::default()
        };
        self.update_note(id, requester_id, patch).await
    }

    /// Remove the attachment at `index`
    pub async fn remove_attachment(&self, id: &str, requester_id: &str, index: usize) -> Result<Note> {
        let note = self.get_note(id, requester_id).await?;

        if index >= note.content.attachments.len() {
            return Err(AppError::NotFound(format!("Attachment {}", index)));
        }

        let mut next = note.clone();
        let removed = next.content.attachments.remove(index);

        self.history.record(&note, COMMENT_BEFORE_UPDATE).await;

        let saved = self.notes.save_note(&next).await?;

        tracing::info!("Removed attachment {} from note {}", removed.original_name, id);

        Ok(saved)
    }

    /// Delete a note together with its version history
    pub async fn delete_note(&self, id: &str, requester_id: &str) -> Result<()> {
        tracing::info!("Deleting note: {}", id);

        let note = self.get_note(id, requester_id).await?;

        self.history.record(&note, COMMENT_BEFORE_DELETE).await;

        self.notes.delete_note(id).await?;

        // The schema cascades too; this covers stores without foreign keys
        if let Err(e) = self.versions.delete_versions_for_note(id).await {
            tracing::error!("Failed to delete versions of note {}: {}", id, e);
        }

        tracing::info!("Note deleted successfully: {}", id);

        Ok(())
    }

    pub fn history(&self) -> &VersionManager {
        &self.history
    }
}

fn apply_patch(content: &mut NoteContent, patch: NotePatch) -> Result<()> {
    match patch.title {
        Patch::Unset => {}
        Patch::Null => return Err(AppError::Validation("Title cannot be cleared".to_string())),
        Patch::Value(title) => content.title = title,
    }

    match patch.description {
        Patch::Unset => {}
        Patch::Null => {
            return Err(AppError::Validation(
                "Description cannot be cleared".to_string(),
            ))
        }
        Patch::Value(description) => content.description = description,
    }

    patch.tag.apply_or(&mut content.tag, String::new());
    patch.pinned.apply_or(&mut content.pinned, false);
    patch.primary_image.apply_optional(&mut content.primary_image);
    patch.reminder_at.apply_optional(&mut content.reminder_at);
    content.attachments.extend(patch.add_attachments);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::FlakyVersions;
    use crate::database::{initialize_database, memory_pool, Repository};
    use crate::services::versions::PruneMode;
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    async fn create_test_service() -> (NotesService, Repository) {
        let pool = memory_pool().await.unwrap();
        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let store = Arc::new(repo.clone());
        let history = VersionManager::new(store.clone(), store.clone(), 10, PruneMode::Inline);

        (NotesService::new(store.clone(), store, history), repo)
    }

    async fn create_flaky_service() -> (NotesService, Repository, Arc<FlakyVersions>) {
        let pool = memory_pool().await.unwrap();
        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let notes = Arc::new(repo.clone());
        let versions = Arc::new(FlakyVersions::new(repo.clone()));
        let history = VersionManager::new(notes.clone(), versions.clone(), 10, PruneMode::Inline);

        (
            NotesService::new(notes, versions.clone(), history),
            repo,
            versions,
        )
    }

    fn new_note(title: &str, description: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    fn describe(description: &str) -> NotePatch {
        NotePatch {
            description: Patch::Value(description.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_records_initial_version() {
        let (service, _repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        let versions = service.history().list_versions(&note.id, "alice").await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].comment, "Initial version");
        assert_eq!(versions[0].content, note.content);
    }

    #[tokio::test]
    async fn test_groceries_twelve_edits() {
        let (service, repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk"))
            .await
            .unwrap();

        let mut latest = note.clone();
        for i in 1..=12 {
            latest = service
                .update_note(&note.id, "alice", describe(&format!("v{}", i)))
                .await
                .unwrap();
        }

        assert_eq!(latest.content.description, "v12");
        assert_eq!(repo.count_versions(&note.id).await.unwrap(), 10);

        let versions = service.history().list_versions(&note.id, "alice").await.unwrap();
        let descriptions: Vec<&str> = versions
            .iter()
            .map(|v| v.content.description.as_str())
            .collect();
        assert!(!descriptions.contains(&"milk"));
        assert!(!descriptions.contains(&"v1"));
        assert_eq!(descriptions.first(), Some(&"v11"));
        assert_eq!(descriptions.last(), Some(&"v2"));
        assert!(versions.iter().all(|v| v.comment == "Before update"));
    }

    #[tokio::test]
    async fn test_update_snapshots_previous_state() {
        let (service, _repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        let updated = service
            .update_note(&note.id, "alice", describe("eggs and butter"))
            .await
            .unwrap();
        assert_eq!(updated.content.description, "eggs and butter");
        assert_eq!(updated.content.title, "Groceries");

        let versions = service.history().list_versions(&note.id, "alice").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].comment, "Before update");
        assert_eq!(versions[0].content.description, "milk and bread");
    }

    #[tokio::test]
    async fn test_partial_update_semantics() {
        let (service, _repo) = create_test_service().await;

        let mut input = new_note("Groceries", "milk and bread");
        input.tag = "home".to_string();
        input.reminder_at = Some(Utc::now() + Duration::hours(2));
        let note = service.create_note("alice", input).await.unwrap();

        let cleared = service
            .update_note(
                &note.id,
                "alice",
                NotePatch {
                    reminder_at: Patch::Null,
                    pinned: Patch::Value(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(cleared.content.reminder_at, None);
        assert!(cleared.content.pinned);
        assert_eq!(cleared.content.tag, "home");
        assert_eq!(cleared.content.description, "milk and bread");
    }

    #[tokio::test]
    async fn test_update_rejects_clearing_title() {
        let (service, _repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        let result = service
            .update_note(
                &note.id,
                "alice",
                NotePatch {
                    title: Patch::Null,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let versions = service.history().list_versions(&note.id, "alice").await.unwrap();
        assert_eq!(versions.len(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let (service, _repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        let result = service.update_note(&note.id, "mallory", describe("stolen note")).await;
        assert!(matches!(result, Err(AppError::Authorization)));

        let fetched = service.get_note(&note.id, "alice").await.unwrap();
        assert_eq!(fetched.content.description, "milk and bread");
    }

    #[tokio::test]
    async fn test_fifteen_edits_keep_ten_versions() {
        let (service, repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        for i in 1..=15 {
            service
                .update_note(&note.id, "alice", describe(&format!("revision {}", i)))
                .await
                .unwrap();
        }

        assert_eq!(repo.count_versions(&note.id).await.unwrap(), 10);
        let versions = service.history().list_versions(&note.id, "alice").await.unwrap();
        assert!(versions.iter().all(|v| v.comment == "Before update"));
        assert_eq!(versions[0].content.description, "revision 14");
    }

    #[tokio::test]
    async fn test_delete_removes_versions() {
        let (service, repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();
        for i in 0..3 {
            service
                .update_note(&note.id, "alice", describe(&format!("revision {}", i)))
                .await
                .unwrap();
        }

        service.delete_note(&note.id, "alice").await.unwrap();

        assert_eq!(repo.count_versions(&note.id).await.unwrap(), 0);
        assert!(matches!(
            service.history().list_versions(&note.id, "alice").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_attachment() {
        let (service, _repo) = create_test_service().await;

        let mut input = new_note("Receipts", "scanned receipts");
        input.attachments = vec![
            Attachment {
                path: "/uploads/aa/bb/aabb".to_string(),
                original_name: "a.pdf".to_string(),
                media_type: "application/pdf".to_string(),
                byte_size: 10,
            },
            Attachment {
                path: "/uploads/cc/dd/ccdd".to_string(),
                original_name: "b.pdf".to_string(),
                media_type: "application/pdf".to_string(),
                byte_size: 20,
            },
        ];
        let note = service.create_note("alice", input).await.unwrap();

        let missing = service.remove_attachment(&note.id, "alice", 2).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let updated = service.remove_attachment(&note.id, "alice", 0).await.unwrap();
        assert_eq!(updated.content.attachments.len(), 1);
        assert_eq!(updated.content.attachments[0].original_name, "b.pdf");

        let versions = service.history().list_versions(&note.id, "alice").await.unwrap();
        assert_eq!(versions[0].content.attachments.len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_reminders() {
        let (service, _repo) = create_test_service().await;

        let mut work = new_note("Standup", "discuss the release plan");
        work.tag = "work".to_string();
        work.reminder_at = Some(Utc::now() + Duration::hours(3));
        service.create_note("alice", work).await.unwrap();

        let mut home = new_note("Groceries", "milk and bread");
        home.tag = "home".to_string();
        home.reminder_at = Some(Utc::now() + Duration::hours(1));
        service.create_note("alice", home).await.unwrap();

        service
            .create_note("alice", new_note("Ideas", "a plan for the garden"))
            .await
            .unwrap();

        let by_tag = service
            .list_notes(
                "alice",
                &NoteFilter {
                    tag: Some("work".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].content.title, "Standup");

        let by_text = service
            .list_notes(
                "alice",
                &NoteFilter {
                    search: Some("PLAN".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_text.len(), 2);

        let reminders = service.list_reminders("alice").await.unwrap();
        assert_eq!(reminders.len(), 2);
        assert_eq!(reminders[0].content.title, "Groceries");

        assert!(service.list_notes("bob", &NoteFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_pinned_and_reminder() {
        let (service, _repo) = create_test_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        let pinned = service.set_pinned(&note.id, "alice", true).await.unwrap();
        assert!(pinned.content.pinned);

        let at = Utc::now() + Duration::days(1);
        let reminded = service.set_reminder(&note.id, "alice", Some(at)).await.unwrap();
        assert_eq!(reminded.content.reminder_at, Some(at));

        let cleared = service.set_reminder(&note.id, "alice", None).await.unwrap();
        assert_eq!(cleared.content.reminder_at, None);
        assert!(cleared.content.pinned);
    }

    #[tokio::test]
    async fn test_update_succeeds_when_snapshot_fails() {
        let (service, repo, versions) = create_flaky_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        versions.fail_inserts.store(true, Ordering::SeqCst);

        let updated = service
            .update_note(&note.id, "alice", describe("eggs and butter"))
            .await
            .unwrap();
        assert_eq!(updated.content.description, "eggs and butter");

        let stored = repo.get_note(&note.id).await.unwrap();
        assert_eq!(stored.content.description, "eggs and butter");
        assert_eq!(repo.count_versions(&note.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_succeeds_when_snapshot_fails() {
        let (service, repo, versions) = create_flaky_service().await;
        versions.fail_inserts.store(true, Ordering::SeqCst);

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        assert_eq!(repo.get_note(&note.id).await.unwrap().content, note.content);
        assert_eq!(repo.count_versions(&note.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_history_writes_fail() {
        let (service, repo, versions) = create_flaky_service().await;

        let note = service
            .create_note("alice", new_note("Groceries", "milk and bread"))
            .await
            .unwrap();

        versions.fail_inserts.store(true, Ordering::SeqCst);
        versions.fail_purges.store(true, Ordering::SeqCst);

        service.delete_note(&note.id, "alice").await.unwrap();

        assert!(matches!(repo.get_note(&note.id).await, Err(AppError::NotFound(_))));
        // Foreign key cascade still clears the history
        assert_eq!(repo.count_versions(&note.id).await.unwrap(), 0);
    }
}
