//! Storage module
//!
//! Provides file storage for uploaded images and attachments.

pub mod upload_store;

pub use upload_store::UploadStore;
