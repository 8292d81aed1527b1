//! Application configuration constants
//!
//! Central location for retention defaults, validation boundaries,
//! and upload limits used throughout the application.

// ===== Version History =====

/// Number of snapshots kept per note when settings do not override it
pub const DEFAULT_VERSION_RETENTION: usize = 10;

/// A note always keeps at least its latest snapshot
pub const MIN_VERSION_RETENTION: usize = 1;

/// Upper bound on configurable retention (prevents unbounded growth)
pub const MAX_VERSION_RETENTION: usize = 1_000;

/// Comment on the snapshot taken right after a note is created
pub const COMMENT_INITIAL: &str = "Initial version";

/// Comment on the snapshot taken before an edit is applied
pub const COMMENT_BEFORE_UPDATE: &str = "Before update";

/// Comment on the snapshot taken before a note is deleted
pub const COMMENT_BEFORE_DELETE: &str = "Before delete";

/// Comment on the snapshot taken before a version is restored
pub const COMMENT_BACKUP_BEFORE_RESTORE: &str = "Backup before restore";

// ===== Note Validation =====

/// Minimum title length in characters
pub const MIN_TITLE_LENGTH: usize = 3;

/// Minimum description length in characters
pub const MIN_DESCRIPTION_LENGTH: usize = 10;

// ===== Uploads =====

/// Maximum attachments accepted alongside a new note
pub const MAX_CREATE_ATTACHMENTS: usize = 3;

/// Maximum attachments accepted in a single upload to an existing note
pub const MAX_UPDATE_ATTACHMENTS: usize = 5;

/// Maximum size of a single uploaded file (10 MiB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum length for a stored original filename
pub const MAX_FILENAME_LENGTH: usize = 255;

/// URL prefix under which uploaded files are served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

// ===== Identity =====

/// Request header carrying the caller's credential
pub const AUTH_TOKEN_HEADER: &str = "auth-token";
