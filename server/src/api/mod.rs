//! HTTP API
//!
//! axum router, handlers and caller identity.

pub mod handlers;
pub mod identity;
pub mod routes;

pub use identity::{IdentityResolver, RequestUser, TokenTable};
pub use routes::create_router;
