use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::app::AppState;
use crate::auth::demo_auth::session_user;
use crate::auth::models::AuthenticatedUser;
use crate::error::AppError;

/// The caller's identity, if any.
///
/// Resolution order: an `Authorization: Bearer` token checked against the
/// identity provider, then (in demo mode) the demo session cookie. An unknown
/// bearer token is rejected outright rather than treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl MaybeUser {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.0.as_ref()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(header) = parts.headers.get(AUTHORIZATION) {
            let token = header
                .to_str()
                .ok()
                .and_then(bearer_token)
                .ok_or_else(|| {
                    AppError::Unauthenticated("Malformed Authorization header".into())
                })?;
            return match state.identity.verify_token(token).await? {
                Some(user) => Ok(MaybeUser(Some(user))),
                None => Err(AppError::Unauthenticated("Invalid access token".into())),
            };
        }

        if state.demo_mode {
            let jar = CookieJar::from_headers(&parts.headers);
            return Ok(MaybeUser(session_user(&jar)?));
        }

        Ok(MaybeUser(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
