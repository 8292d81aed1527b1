//! Services module
//!
//! Business logic services that coordinate between the HTTP layer and the stores.

pub mod attachments;
pub mod notes;
pub mod settings;
pub mod versions;

pub use attachments::{AttachmentsService, Upload};
pub use notes::NotesService;
pub use settings::{Settings, SettingsService};
pub use versions::{PruneMode, VersionManager};
