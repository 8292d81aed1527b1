//! Attachments service
//!
//! Validates uploaded files and writes them to the UploadStore, producing
//! the `Attachment` / `PrimaryImage` values notes refer to.

use crate::config::{MAX_FILENAME_LENGTH, MAX_UPLOAD_BYTES};
use crate::database::{Attachment, PrimaryImage};
use crate::error::{AppError, Result};
use crate::storage::UploadStore;

/// One file received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Service for storing uploaded files
#[derive(Clone)]
pub struct AttachmentsService {
    store: UploadStore,
}

impl AttachmentsService {
    pub fn new(store: UploadStore) -> Self {
        Self { store }
    }

    /// Store an attachment and describe it
    pub async fn store_attachment(&self, upload: &Upload) -> Result<Attachment> {
        tracing::info!(
            "Storing attachment: {} ({} bytes)",
            upload.filename,
            upload.data.len()
        );

        check_size(upload)?;

        let path = self.store.put(&upload.data).await?;

        Ok(Attachment {
            path,
            original_name: sanitize_filename(&upload.filename),
            media_type: upload.media_type.clone(),
            byte_size: upload.data.len() as i64,
        })
    }

    /// Store a batch, rejecting it whole when it exceeds `limit`
    pub async fn store_attachments(&self, uploads: &[Upload], limit: usize) -> Result<Vec<Attachment>> {
        if uploads.len() > limit {
            return Err(AppError::Validation(format!(
                "At most {} attachments are allowed",
                limit
            )));
        }

        let mut attachments = Vec::with_capacity(uploads.len());
        for upload in uploads {
            attachments.push(self.store_attachment(upload).await?);
        }

        Ok(attachments)
    }

    /// Store a note's primary image; only `image/*` media types are accepted
    pub async fn store_image(&self, upload: &Upload) -> Result<PrimaryImage> {
        if !upload.media_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Unsupported image type: {}",
                upload.media_type
            )));
        }

        check_size(upload)?;

        let path = self.store.put(&upload.data).await?;

        tracing::info!("Stored image: {} at {}", upload.filename, path);

        Ok(PrimaryImage {
            path,
            original_name: sanitize_filename(&upload.filename),
        })
    }

    /// Read a stored file by its public path
    pub async fn read(&self, storage_path: &str) -> Result<Vec<u8>> {
        self.store.get(storage_path).await
    }
}

fn check_size(upload: &Upload) -> Result<()> {
    if upload.data.is_empty() {
        return Err(AppError::Validation(format!("{} is empty", upload.filename)));
    }
    if upload.data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "{} exceeds the {} byte upload limit",
            upload.filename, MAX_UPLOAD_BYTES
        )));
    }
    Ok(())
}

/// Sanitize filename to prevent path traversal attacks
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(MAX_FILENAME_LENGTH)
        .collect()
}
