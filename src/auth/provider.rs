use std::collections::HashMap;

use async_trait::async_trait;

use crate::auth::models::AuthenticatedUser;
use crate::error::AppError;

/// Resolves bearer credentials to a signed-in user.
///
/// Handed to the HTTP layer through `AppState` instead of a process-wide
/// session, so tests can substitute their own.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the token is unknown.
    async fn verify_token(&self, token: &str) -> Result<Option<AuthenticatedUser>, AppError>;
}

/// Fixed token table loaded from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenProvider {
    users: HashMap<String, AuthenticatedUser>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.users.insert(token.into(), user);
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn verify_token(&self, token: &str) -> Result<Option<AuthenticatedUser>, AppError> {
        Ok(self.users.get(token).cloned())
    }
}
