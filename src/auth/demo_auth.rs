use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::models::AuthenticatedUser;
use crate::error::AppError;

/// Name of the cookie carrying the demo session.
pub const SESSION_COOKIE: &str = "collabverse_demo_user";

/// Built-in demo user definition.
#[derive(Debug, Clone)]
struct DemoUser {
    username: &'static str,
    password: &'static str,
    display_name: &'static str,
    email: &'static str,
}

/// The hard-coded demo users available when demo mode is on.
const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        username: "ada",
        password: "ada",
        display_name: "Ada Lovelace",
        email: "ada@demo.collabverse.dev",
    },
    DemoUser {
        username: "grace",
        password: "grace",
        display_name: "Grace Hopper",
        email: "grace@demo.collabverse.dev",
    },
    DemoUser {
        username: "alan",
        password: "alan",
        display_name: "Alan Turing",
        email: "alan@demo.collabverse.dev",
    },
];

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: AuthenticatedUser,
}

/// Validate demo credentials and return the corresponding user.
pub fn authenticate_demo_user(
    username: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    DEMO_USERS
        .iter()
        .find(|u| u.username == username && u.password == password)
        .map(|u| AuthenticatedUser::new(format!("demo-{}", u.username), u.display_name, u.email))
        .ok_or_else(|| AppError::Unauthenticated("Invalid username or password".into()))
}

/// Read the demo session from the cookie jar, if there is one.
pub fn session_user(jar: &CookieJar) -> Result<Option<AuthenticatedUser>, AppError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    serde_json::from_str(cookie.value())
        .map(Some)
        .map_err(|e| AppError::Unauthenticated(format!("Invalid session: {}", e)))
}

/// `POST /api/auth/login`: demo login handler.
///
/// Validates credentials against the built-in user table.
/// On success, sets the session cookie and returns the user info.
pub async fn login_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    jar: CookieJar,
    axum::Json(req): axum::Json<LoginRequest>,
) -> Result<(CookieJar, axum::Json<LoginResponse>), AppError> {
    if !state.demo_mode {
        return Err(AppError::NotFound("Demo login is disabled".into()));
    }

    let user = authenticate_demo_user(&req.username, &req.password)?;

    let user_json = serde_json::to_string(&user)
        .map_err(|e| AppError::Internal(format!("Failed to serialize user: {}", e)))?;

    let cookie = Cookie::build((SESSION_COOKIE, user_json))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    tracing::info!(user_id = %user.user_id, "Demo user signed in");

    Ok((
        jar.add(cookie),
        axum::Json(LoginResponse {
            message: "Login successful".to_string(),
            user,
        }),
    ))
}

/// `GET /api/auth/me`: returns the caller, from a bearer token or the demo cookie.
pub async fn me_handler(
    crate::auth::middleware::MaybeUser(user): crate::auth::middleware::MaybeUser,
) -> Result<axum::Json<AuthenticatedUser>, AppError> {
    user.map(axum::Json)
        .ok_or_else(|| AppError::Unauthenticated("Not logged in".into()))
}

/// `POST /api/auth/logout`: clears the demo session cookie.
pub async fn logout_handler(jar: CookieJar) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").removal().build();

    jar.remove(cookie)
}
