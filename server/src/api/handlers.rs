//! HTTP handlers
//!
//! Thin adapters between axum extractors and the services. Note bodies are
//! accepted as JSON or as `multipart/form-data` carrying the same text
//! fields plus `image` and `attachments` files.

use crate::api::identity::RequestUser;
use crate::app::AppState;
use crate::config::{MAX_CREATE_ATTACHMENTS, MAX_UPDATE_ATTACHMENTS, UPLOADS_URL_PREFIX};
use crate::database::{
    deserialize_reminder_patch, NewNote, Note, NoteFilter, NotePatch, NoteVersion, Patch,
};
use crate::error::{AppError, Result};
use crate::services::Upload;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Request bodies
// ============================================================================

/// JSON body of `PUT /api/notes/{id}`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteBody {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub tag: Patch<String>,
    #[serde(default)]
    pub pinned: Patch<bool>,
    #[serde(default, deserialize_with = "deserialize_reminder_patch")]
    pub reminder_at: Patch<DateTime<Utc>>,
    /// Only `null` is accepted; new images go through the upload routes
    #[serde(default)]
    pub primary_image: Patch<serde_json::Value>,
}

impl TryFrom<UpdateNoteBody> for NotePatch {
    type Error = AppError;

    fn try_from(body: UpdateNoteBody) -> Result<Self> {
        let primary_image = match body.primary_image {
            Patch::Unset => Patch::Unset,
            Patch::Null => Patch::Null,
            Patch::Value(_) => {
                return Err(AppError::Validation(
                    "primary_image can only be cleared here; upload images as multipart"
                        .to_string(),
                ))
            }
        };

        Ok(NotePatch {
            title: body.title,
            description: body.description,
            tag: body.tag,
            primary_image,
            pinned: body.pinned,
            reminder_at: body.reminder_at,
            add_attachments: Vec::new(),
        })
    }
}

/// Parsed `multipart/form-data` note body
#[derive(Debug, Default)]
struct NoteForm {
    fields: HashMap<String, String>,
    image: Option<Upload>,
    attachments: Vec<Upload>,
}

impl NoteForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = NoteForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "image" | "attachments" => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let media_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Read error: {}", e)))?
                        .to_vec();

                    let upload = Upload {
                        filename,
                        media_type,
                        data,
                    };
                    if name == "image" {
                        form.image = Some(upload);
                    } else {
                        form.attachments.push(upload);
                    }
                }
                _ => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Read error: {}", e)))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" | "" => Ok(false),
        other => Err(AppError::Validation(format!("{}: not a boolean: {}", name, other))),
    }
}

/// Empty and `"null"` clear the reminder
fn parse_reminder(value: &str) -> Result<Patch<DateTime<Utc>>> {
    match value.trim() {
        "" | "null" => Ok(Patch::Null),
        raw => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Patch::Value(dt.with_timezone(&Utc)))
            .map_err(|e| AppError::Validation(format!("reminder_at: {}", e))),
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn multipart(request: Request, state: &AppState) -> Result<Multipart> {
    Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::Validation(e.body_text()))
}

async fn json<T: serde::de::DeserializeOwned>(request: Request, state: &AppState) -> Result<T> {
    Json::<T>::from_request(request, state)
        .await
        .map(|Json(body)| body)
        .map_err(|e| AppError::Validation(e.body_text()))
}

// ============================================================================
// Notes
// ============================================================================

pub async fn list_notes(
    State(state): State<AppState>,
    user: RequestUser,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<Note>>> {
    let notes = state.notes.list_notes(&user.user_id, &filter).await?;
    Ok(Json(notes))
}

pub async fn list_reminders(
    State(state): State<AppState>,
    user: RequestUser,
) -> Result<Json<Vec<Note>>> {
    let notes = state.notes.list_reminders(&user.user_id).await?;
    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    user: RequestUser,
    request: Request,
) -> Result<(StatusCode, Json<Note>)> {
    let new_note = if is_multipart(&request) {
        let mut form = NoteForm::read(multipart(request, &state).await?).await?;

        let reminder_at = match form.take("reminder_at") {
            Some(raw) => match parse_reminder(&raw)? {
                Patch::Value(at) => Some(at),
                _ => None,
            },
            None => None,
        };
        let pinned = match form.take("pinned") {
            Some(raw) => parse_bool("pinned", &raw)?,
            None => false,
        };

        let mut new_note = NewNote {
            title: form.take("title").unwrap_or_default(),
            description: form.take("description").unwrap_or_default(),
            tag: form.take("tag").unwrap_or_default(),
            pinned,
            reminder_at,
            ..Default::default()
        };
        new_note.validate()?;

        new_note.attachments = state
            .attachments
            .store_attachments(&form.attachments, MAX_CREATE_ATTACHMENTS)
            .await?;
        if let Some(image) = &form.image {
            new_note.primary_image = Some(state.attachments.store_image(image).await?);
        }

        new_note
    } else {
        let new_note = json::<NewNote>(request, &state).await?;
        new_note.validate()?;
        new_note
    };

    let note = state.notes.create_note(&user.user_id, new_note).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<AppState>,
    user: RequestUser,
    Path(id): Path<String>,
) -> Result<Json<Note>> {
    let note = state.notes.get_note(&id, &user.user_id).await?;
    Ok(Json(note))
}

pub async fn update_note(
    State(state): State<AppState>,
    user: RequestUser,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Note>> {
    let patch = if is_multipart(&request) {
        let mut form = NoteForm::read(multipart(request, &state).await?).await?;
        let mut patch = NotePatch::default();

        if let Some(title) = form.take("title") {
            patch.title = Patch::Value(title);
        }
        if let Some(description) = form.take("description") {
            patch.description = Patch::Value(description);
        }
        if let Some(tag) = form.take("tag") {
            patch.tag = Patch::Value(tag);
        }
        if let Some(raw) = form.take("pinned") {
            patch.pinned = Patch::Value(parse_bool("pinned", &raw)?);
        }
        if let Some(raw) = form.take("reminder_at") {
            patch.reminder_at = parse_reminder(&raw)?;
        }
        if form.take("primary_image").is_some_and(|v| v.trim() == "null") {
            patch.primary_image = Patch::Null;
        }
        patch.validate()?;

        // Ownership first so strangers cannot fill the upload store
        state.notes.get_note(&id, &user.user_id).await?;

        if let Some(image) = &form.image {
            patch.primary_image = Patch::Value(state.attachments.store_image(image).await?);
        }
        patch.add_attachments = state
            .attachments
            .store_attachments(&form.attachments, MAX_UPDATE_ATTACHMENTS)
            .await?;

        patch
    } else {
        let patch = NotePatch::try_from(json::<UpdateNoteBody>(request, &state).await?)?;
        patch.validate()?;
        patch
    };

    let note = state.notes.update_note(&id, &user.user_id, patch).await?;
    Ok(Json(note))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: &'static str,
    pub id: String,
}

pub async fn delete_note(
    State(state): State<AppState>,
    user: RequestUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.notes.delete_note(&id, &user.user_id).await?;
    Ok(Json(DeleteResponse {
        success: "Note has been deleted",
        id,
    }))
}

// ============================================================================
// Versions
// ============================================================================

pub async fn list_versions(
    State(state): State<AppState>,
    user: RequestUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<NoteVersion>>> {
    let versions = state.versions.list_versions(&id, &user.user_id).await?;
    Ok(Json(versions))
}

pub async fn get_version(
    State(state): State<AppState>,
    user: RequestUser,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<NoteVersion>> {
    let version = state
        .versions
        .get_version(&id, &version_id, &user.user_id)
        .await?;
    Ok(Json(version))
}

pub async fn restore_version(
    State(state): State<AppState>,
    user: RequestUser,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<Note>> {
    let note = state.versions.restore(&id, &version_id, &user.user_id).await?;
    Ok(Json(note))
}

// ============================================================================
// Attachments and images
// ============================================================================

pub async fn add_attachments(
    State(state): State<AppState>,
    user: RequestUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Note>> {
    let form = NoteForm::read(multipart).await?;
    if form.attachments.is_empty() {
        return Err(AppError::Validation("No attachments uploaded".to_string()));
    }

    // Ownership first so strangers cannot fill the upload store
    state.notes.get_note(&id, &user.user_id).await?;

    let attachments = state
        .attachments
        .store_attachments(&form.attachments, MAX_UPDATE_ATTACHMENTS)
        .await?;
    let note = state
        .notes
        .add_attachments(&id, &user.user_id, attachments)
        .await?;
    Ok(Json(note))
}

pub async fn remove_attachment(
    State(state): State<AppState>,
    user: RequestUser,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Json<Note>> {
    let note = state
        .notes
        .remove_attachment(&id, &user.user_id, index)
        .await?;
    Ok(Json(note))
}

pub async fn set_image(
    State(state): State<AppState>,
    user: RequestUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Note>> {
    let form = NoteForm::read(multipart).await?;
    let upload = form
        .image
        .ok_or_else(|| AppError::Validation("Missing image in multipart form".to_string()))?;

    state.notes.get_note(&id, &user.user_id).await?;

    let image = state.attachments.store_image(&upload).await?;
    let note = state
        .notes
        .set_primary_image(&id, &user.user_id, image)
        .await?;
    Ok(Json(note))
}

/// Serve a stored upload by its public path, typed from its magic bytes
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse> {
    let storage_path = format!("{}/{}", UPLOADS_URL_PREFIX, path.trim_start_matches('/'));
    let data = state.attachments.read(&storage_path).await?;

    let content_type = infer::get(&data)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        data,
    ))
}
