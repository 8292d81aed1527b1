//! Content-addressed storage for uploaded files
//!
//! Uploaded images and attachments are stored under their SHA-256 hash in a
//! two-level directory layout and exposed through a public storage path.
//!
//! Example: hash "abcd1234..." is stored at "<root>/ab/cd/abcd1234..." and
//! referenced by notes as "/uploads/ab/cd/abcd1234...".

use crate::config::UPLOADS_URL_PREFIX;
use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Content-addressed upload store
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root directory if needed
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Upload store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Store `data` and return its public storage path
    pub async fn put(&self, data: &[u8]) -> Result<String> {
        let hash = hash_bytes(data);
        let path = self.file_path(&hash);

        if fs::try_exists(&path).await? {
            tracing::debug!("Upload already stored: {}", hash);
            return Ok(storage_path(&hash));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Per-writer temp file + rename keeps readers from seeing partial content
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            // A concurrent writer stored the same content first
            if fs::try_exists(&path).await? {
                return Ok(storage_path(&hash));
            }
            return Err(e.into());
        }

        tracing::debug!("Stored upload: {} ({} bytes)", hash, data.len());

        Ok(storage_path(&hash))
    }

    /// Read the file behind a public storage path
    pub async fn get(&self, storage_path: &str) -> Result<Vec<u8>> {
        let hash = parse_storage_path(storage_path)?;
        let path = self.file_path(hash);

        if !fs::try_exists(&path).await? {
            return Err(AppError::NotFound(format!("Upload {}", storage_path)));
        }

        Ok(fs::read(&path).await?)
    }

    pub async fn exists(&self, storage_path: &str) -> Result<bool> {
        match parse_storage_path(storage_path) {
            Ok(hash) => Ok(fs::try_exists(self.file_path(hash)).await?),
            Err(_) => Ok(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[0..2]).join(&hash[2..4]).join(hash)
    }
}

fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn storage_path(hash: &str) -> String {
    format!("{}/{}/{}/{}", UPLOADS_URL_PREFIX, &hash[0..2], &hash[2..4], hash)
}

/// Extract the hash from "/uploads/ab/cd/<hash>", rejecting anything else
fn parse_storage_path(storage_path: &str) -> Result<&str> {
    let invalid = || AppError::NotFound(format!("Upload {}", storage_path));

    let rest = storage_path
        .strip_prefix(UPLOADS_URL_PREFIX)
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(invalid)?;

    let mut parts = rest.split('/');
    let (Some(p1), Some(p2), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let is_hash = hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit());
    if !is_hash || p1 != &hash[0..2] || p2 != &hash[2..4] {
        return Err(invalid());
    }

    Ok(hash)
}
