//! Settings service
//!
//! Manages server settings persistence using JSON file storage.

use crate::config::{DEFAULT_VERSION_RETENTION, MAX_VERSION_RETENTION, MIN_VERSION_RETENTION};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variable naming the settings file
pub const SETTINGS_PATH_ENV: &str = "NOTEVAULT_SETTINGS";

/// Environment variable overriding `server.bind_address`
pub const BIND_ADDRESS_ENV: &str = "NOTEVAULT_BIND";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Where the database and uploads live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Holds `notevault.db` and the `uploads/` directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Version history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSettings {
    /// Snapshots kept per note
    #[serde(default = "default_retention_limit")]
    pub retention_limit: usize,
    /// Prune off the request path
    #[serde(default = "default_true")]
    pub prune_in_background: bool,
}

fn default_retention_limit() -> usize {
    DEFAULT_VERSION_RETENTION
}

fn default_true() -> bool {
    true
}

impl Default for VersionSettings {
    fn default() -> Self {
        Self {
            retention_limit: default_retention_limit(),
            prune_in_background: true,
        }
    }
}

/// Credential table for the `auth-token` header
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Token → user id
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub versions: VersionSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let limit = self.versions.retention_limit;
        if !(MIN_VERSION_RETENTION..=MAX_VERSION_RETENTION).contains(&limit) {
            return Err(AppError::Validation(format!(
                "versions.retention_limit must be between {} and {}, got {}",
                MIN_VERSION_RETENTION, MAX_VERSION_RETENTION, limit
            )));
        }

        if self.server.bind_address.trim().is_empty() {
            return Err(AppError::Validation(
                "server.bind_address cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.storage.data_dir.join("notevault.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.storage.data_dir.join("uploads")
    }
}

/// Service for loading and saving the settings file
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    /// Settings file named by `NOTEVAULT_SETTINGS`, or `settings.json`
    pub fn from_env() -> Self {
        let path = std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("settings.json"));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<Settings> {
        let settings = if fs::try_exists(&self.settings_path).await? {
            let content = fs::read_to_string(&self.settings_path).await?;
            serde_json::from_str(&content)
                .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?
        } else {
            tracing::info!("Settings file not found, creating default settings");
            let default = Settings::default();
            self.save(&default).await?;
            default
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Load settings and apply environment overrides
    pub async fn load_with_env(&self) -> Result<Settings> {
        let mut settings = self.load().await?;

        if let Ok(bind) = std::env::var(BIND_ADDRESS_ENV) {
            tracing::info!("Bind address overridden by {}: {}", BIND_ADDRESS_ENV, bind);
            settings.server.bind_address = bind;
            settings.validate()?;
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.settings_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }
}
