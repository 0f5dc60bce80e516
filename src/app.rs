use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{dashboard, funding, listings, projects};
use crate::auth::demo_auth;
use crate::auth::provider::IdentityProvider;
use crate::store::DocumentStore;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Enables the demo login endpoints and cookie sessions.
    pub demo_mode: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        demo_mode: bool,
    ) -> Self {
        Self {
            store,
            identity,
            demo_mode,
        }
    }
}

/// Build the HTTP API router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/projects",
            get(listings::projects_handler).post(projects::create_project_handler),
        )
        .route("/projects/{owner}/{id}", get(projects::get_project_handler))
        .route(
            "/projects/{owner}/{id}/like",
            post(projects::like_project_handler),
        )
        .route(
            "/projects/{owner}/{id}/comments",
            get(projects::list_comments_handler).post(projects::add_comment_handler),
        )
        .route(
            "/funding",
            get(listings::funding_handler).post(funding::post_funding_handler),
        )
        .route("/funding/{owner}/{id}", get(funding::get_funding_handler))
        .route("/funding/{owner}/{id}/apply", post(funding::apply_handler))
        .route("/mentorship", get(listings::mentorship_handler))
        .route("/me/projects", get(projects::my_projects_handler))
        .route("/me/dashboard", get(dashboard::dashboard_handler));

    let auth = Router::new()
        .route("/login", post(demo_auth::login_handler))
        .route("/me", get(demo_auth::me_handler))
        .route("/logout", post(demo_auth::logout_handler));

    Router::new()
        .nest("/api/v1", api)
        .nest("/api/auth", auth)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
