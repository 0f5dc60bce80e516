use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The signed-in caller, as resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Unique user identifier. Records are stored under this id.
    pub user_id: String,
    /// Name shown on comments.
    pub display_name: String,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }
}

/// Abort a mutation when nobody is signed in.
pub fn require_user<'a>(
    user: Option<&'a AuthenticatedUser>,
    action: &str,
) -> Result<&'a AuthenticatedUser, AppError> {
    user.ok_or_else(|| AppError::Unauthenticated(format!("You must be signed in to {action}")))
}
