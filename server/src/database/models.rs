//! Database models
//!
//! Rust structs representing notes and their version snapshots.
//! Rows are read through flat `*Record` structs and converted into the
//! nested domain types the services and API work with.

use crate::config::{MIN_DESCRIPTION_LENGTH, MIN_TITLE_LENGTH};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// File attached to a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Public storage path, e.g. `/uploads/ab/cd/abcd...`
    pub path: String,
    pub original_name: String,
    pub media_type: String,
    pub byte_size: i64,
}

/// The single distinguished image of a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryImage {
    pub path: String,
    pub original_name: String,
}

/// Every field a snapshot copies and a restore writes back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteContent {
    pub title: String,
    /// Rich-text markup
    pub description: String,
    pub tag: String,
    pub primary_image: Option<PrimaryImage>,
    pub attachments: Vec<Attachment>,
    pub pinned: bool,
    pub reminder_at: Option<DateTime<Utc>>,
}

/// A live note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub owner_id: String,
    #[serde(flatten)]
    pub content: NoteContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a note's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteVersion {
    pub id: String,
    pub note_id: String,
    pub owner_id: String,
    #[serde(flatten)]
    pub content: NoteContent,
    pub saved_at: DateTime<Utc>,
    pub comment: String,
}

/// Snapshot about to be written
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub note_id: String,
    pub owner_id: String,
    pub content: NoteContent,
    pub saved_at: DateTime<Utc>,
    pub comment: String,
}

impl NewVersion {
    /// Capture `note` as it stands now
    pub fn of(note: &Note, comment: &str) -> Self {
        Self {
            note_id: note.id.clone(),
            owner_id: note.owner_id.clone(),
            content: note.content.clone(),
            saved_at: Utc::now(),
            comment: comment.to_string(),
        }
    }
}

/// Create note request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub reminder_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub primary_image: Option<PrimaryImage>,
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

impl NewNote {
    /// Length rules applied to client input
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_description(&self.description)
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().chars().count() < MIN_TITLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Title must be at least {} characters",
            MIN_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    if description.trim().chars().count() < MIN_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "Description must be at least {} characters",
            MIN_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

/// One field of a partial update.
///
/// `Unset` leaves the stored value alone, `Null` clears it and `Value`
/// replaces it. With `#[serde(default)]`, a missing JSON key becomes
/// `Unset` and an explicit `null` becomes `Null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    /// Apply to a nullable field
    pub fn apply_optional(self, field: &mut Option<T>) {
        match self {
            Patch::Unset => {}
            Patch::Null => *field = None,
            Patch::Value(value) => *field = Some(value),
        }
    }

    /// Apply to a non-nullable field, writing `cleared` on `Null`
    pub fn apply_or(self, field: &mut T, cleared: T) {
        match self {
            Patch::Unset => {}
            Patch::Null => *field = cleared,
            Patch::Value(value) => *field = value,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// Reminder patch where `null`, `""` and `"null"` all clear the reminder
pub fn deserialize_reminder_patch<'de, D>(
    deserializer: D,
) -> std::result::Result<Patch<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("null") => Ok(Patch::Null),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|dt| Patch::Value(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// Update note request
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Patch<String>,
    pub description: Patch<String>,
    pub tag: Patch<String>,
    pub primary_image: Patch<PrimaryImage>,
    pub pinned: Patch<bool>,
    pub reminder_at: Patch<DateTime<Utc>>,
    /// Appended to the existing attachments
    pub add_attachments: Vec<Attachment>,
}

impl NotePatch {
    /// Length rules for supplied fields; title and description cannot be cleared
    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Patch::Unset => {}
            Patch::Null => return Err(AppError::Validation("Title cannot be cleared".to_string())),
            Patch::Value(title) => validate_title(title)?,
        }
        match &self.description {
            Patch::Unset => Ok(()),
            Patch::Null => Err(AppError::Validation(
                "Description cannot be cleared".to_string(),
            )),
            Patch::Value(description) => validate_description(description),
        }
    }
}

/// Listing filter for a user's notes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    /// Case-insensitive match on title, description or tag
    pub search: Option<String>,
    /// Exact tag
    pub tag: Option<String>,
}

/// Row shape of the `notes` table
#[derive(Debug, FromRow)]
pub(crate) struct NoteRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub tag: String,
    pub image_path: Option<String>,
    pub image_original_name: Option<String>,
    pub attachments: Json<Vec<Attachment>>,
    pub pinned: bool,
    pub reminder_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the `note_versions` table
#[derive(Debug, FromRow)]
pub(crate) struct VersionRecord {
    pub id: String,
    pub note_id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub tag: String,
    pub image_path: Option<String>,
    pub image_original_name: Option<String>,
    pub attachments: Json<Vec<Attachment>>,
    pub pinned: bool,
    pub reminder_at: Option<DateTime<Utc>>,
    pub saved_at: DateTime<Utc>,
    pub comment: String,
}

fn primary_image(path: Option<String>, original_name: Option<String>) -> Option<PrimaryImage> {
    path.map(|path| PrimaryImage {
        path,
        original_name: original_name.unwrap_or_default(),
    })
}

impl From<NoteRecord> for Note {
    fn from(row: NoteRecord) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            content: NoteContent {
                title: row.title,
                description: row.description,
                tag: row.tag,
                primary_image: primary_image(row.image_path, row.image_original_name),
                attachments: row.attachments.0,
                pinned: row.pinned,
                reminder_at: row.reminder_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<VersionRecord> for NoteVersion {
    fn from(row: VersionRecord) -> Self {
        Self {
            id: row.id,
            note_id: row.note_id,
            owner_id: row.owner_id,
            content: NoteContent {
                title: row.title,
                description: row.description,
                tag: row.tag,
                primary_image: primary_image(row.image_path, row.image_original_name),
                attachments: row.attachments.0,
                pinned: row.pinned,
                reminder_at: row.reminder_at,
            },
            saved_at: row.saved_at,
            comment: row.comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_serializes_flat() {
        let note = Note {
            id: "n1".to_string(),
            owner_id: "u1".to_string(),
            content: NoteContent {
                title: "Groceries".to_string(),
                description: "milk and eggs".to_string(),
                tag: "home".to_string(),
                primary_image: None,
                attachments: vec![],
                pinned: true,
                reminder_at: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["title"], "Groceries");
        assert_eq!(value["pinned"], true);
        assert!(value["primary_image"].is_null());
        assert!(value.get("content").is_none());
    }

    #[derive(Deserialize)]
    struct Body {
        #[serde(default)]
        tag: Patch<String>,
        #[serde(default, deserialize_with = "deserialize_reminder_patch")]
        reminder_at: Patch<DateTime<Utc>>,
    }

    #[test]
    fn test_patch_distinguishes_absent_and_null() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        assert!(absent.tag.is_unset());
        assert!(absent.reminder_at.is_unset());

        let null: Body = serde_json::from_str(r#"{"tag": null, "reminder_at": null}"#).unwrap();
        assert_eq!(null.tag, Patch::Null);
        assert_eq!(null.reminder_at, Patch::Null);

        let value: Body =
            serde_json::from_str(r#"{"tag": "work", "reminder_at": "2026-01-02T03:04:05Z"}"#)
                .unwrap();
        assert_eq!(value.tag, Patch::Value("work".to_string()));
        assert!(matches!(value.reminder_at, Patch::Value(_)));
    }

    #[test]
    fn test_empty_reminder_clears() {
        let empty: Body = serde_json::from_str(r#"{"reminder_at": ""}"#).unwrap();
        assert_eq!(empty.reminder_at, Patch::Null);

        let sentinel: Body = serde_json::from_str(r#"{"reminder_at": "null"}"#).unwrap();
        assert_eq!(sentinel.reminder_at, Patch::Null);

        assert!(serde_json::from_str::<Body>(r#"{"reminder_at": "tomorrow"}"#).is_err());
    }

    #[test]
    fn test_patch_apply() {
        let mut reminder = Some(1);
        Patch::Unset.apply_optional(&mut reminder);
        assert_eq!(reminder, Some(1));
        Patch::Null.apply_optional(&mut reminder);
        assert_eq!(reminder, None);
        Patch::Value(2).apply_optional(&mut reminder);
        assert_eq!(reminder, Some(2));

        let mut tag = "home".to_string();
        Patch::Null.apply_or(&mut tag, String::new());
        assert_eq!(tag, "");
    }

    #[test]
    fn test_new_note_validation() {
        let note = |title: &str, description: &str| NewNote {
            title: title.to_string(),
            description: description.to_string(),
            ..Default::default()
        };

        assert!(note("Groceries", "milk and bread").validate().is_ok());
        assert!(matches!(
            note("Hi", "long enough text").validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            note("Groceries", "milk").validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_validation() {
        assert!(NotePatch::default().validate().is_ok());

        let cleared = NotePatch {
            title: Patch::Null,
            ..Default::default()
        };
        assert!(matches!(cleared.validate(), Err(AppError::Validation(_))));

        let short = NotePatch {
            description: Patch::Value("eggs".to_string()),
            ..Default::default()
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_image_without_name_keeps_path() {
        let image = primary_image(Some("/uploads/ab/cd/abcd".to_string()), None).unwrap();
        assert_eq!(image.path, "/uploads/ab/cd/abcd");
        assert_eq!(image.original_name, "");
        assert!(primary_image(None, Some("x.png".to_string())).is_none());
    }
}
