//! Caller identity
//!
//! The `auth-token` header carries an opaque credential that an
//! [`IdentityResolver`] maps to a user id. Handlers take a [`RequestUser`]
//! parameter to require one.

use crate::app::AppState;
use crate::config::AUTH_TOKEN_HEADER;
use crate::error::AppError;
use crate::services::settings::AuthSettings;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::collections::HashMap;

/// Maps a credential to the id of the user it belongs to
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> Option<String>;
}

/// Static token → user id table
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, String>,
}

impl TokenTable {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn from_settings(auth: &AuthSettings) -> Self {
        if auth.tokens.is_empty() {
            tracing::warn!("No auth tokens configured; every request will be rejected");
        }
        Self::new(auth.tokens.clone())
    }
}

impl IdentityResolver for TokenTable {
    fn resolve(&self, credential: &str) -> Option<String> {
        self.tokens.get(credential).cloned()
    }
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct RequestUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for RequestUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let user_id = state
            .identity
            .resolve(credential)
            .ok_or(AppError::Unauthenticated)?;

        Ok(Self { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_table_resolves_known_tokens() {
        let table = TokenTable::new(HashMap::from([
            ("t-alice".to_string(), "alice".to_string()),
            ("t-bob".to_string(), "bob".to_string()),
        ]));

        assert_eq!(table.resolve("t-alice").as_deref(), Some("alice"));
        assert_eq!(table.resolve("t-bob").as_deref(), Some("bob"));
        assert_eq!(table.resolve("t-carol"), None);
        assert_eq!(table.resolve(""), None);
    }

    #[test]
    fn test_from_settings() {
        let mut auth = AuthSettings::default();
        auth.tokens.insert("secret".to_string(), "alice".to_string());

        let table = TokenTable::from_settings(&auth);
        assert_eq!(table.resolve("secret").as_deref(), Some("alice"));
    }
}
