//! NoteVault library
//!
//! Personal notes service with per-note version history. The binary in
//! `main.rs` serves [`api::create_router`]; the modules are public for
//! integration testing.

pub mod api;
pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;
