//! API route definitions

use super::handlers;
use crate::app::AppState;
use crate::config::{MAX_UPDATE_ATTACHMENTS, MAX_UPLOAD_BYTES};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    // One multipart request may carry an image plus a full batch of attachments
    let body_limit = MAX_UPLOAD_BYTES * (MAX_UPDATE_ATTACHMENTS + 1);

    Router::new()
        .route("/health", get(handlers::health))
        // Notes
        .route(
            "/api/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/api/notes/{id}",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/api/reminders", get(handlers::list_reminders))
        // Version history
        .route("/api/notes/{id}/versions", get(handlers::list_versions))
        .route(
            "/api/notes/{id}/versions/{version_id}",
            get(handlers::get_version),
        )
        .route(
            "/api/notes/{id}/restore/{version_id}",
            post(handlers::restore_version),
        )
        // Uploads
        .route(
            "/api/notes/{id}/attachments",
            post(handlers::add_attachments),
        )
        .route(
            "/api/notes/{id}/attachments/{index}",
            delete(handlers::remove_attachment),
        )
        .route("/api/notes/{id}/image", put(handlers::set_image))
        .route("/uploads/{*path}", get(handlers::serve_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
