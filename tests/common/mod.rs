#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use collabverse::app::{router, AppState};
use collabverse::auth::models::AuthenticatedUser;
use collabverse::auth::provider::StaticTokenProvider;
use collabverse::store::memory::InMemoryStore;
use collabverse::store::DocumentStore;

/// Bearer tokens known to every test environment.
pub const ADA_TOKEN: &str = "tok-ada";
pub const GRACE_TOKEN: &str = "tok-grace";

/// An in-memory store plus the API router wired to it.
pub struct TestEnv {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
}

impl TestEnv {
    /// Empty store, demo mode on.
    pub fn start() -> Self {
        Self::with_tree(json!({}))
    }

    /// Seed the store with a raw tree, e.g. `{"owners": {...}}`.
    pub fn with_tree(tree: Value) -> Self {
        Self::build(tree, true)
    }

    /// Demo login disabled; only bearer tokens authenticate.
    pub fn without_demo() -> Self {
        Self::build(json!({}), false)
    }

    fn build(tree: Value, demo_mode: bool) -> Self {
        let store = Arc::new(InMemoryStore::with_tree(tree));
        let identity = StaticTokenProvider::new()
            .with_token(
                ADA_TOKEN,
                AuthenticatedUser::new("u-ada", "Ada Lovelace", "ada@example.com"),
            )
            .with_token(
                GRACE_TOKEN,
                AuthenticatedUser::new("u-grace", "Grace Hopper", "grace@example.com"),
            );
        let state = AppState::new(
            store.clone() as Arc<dyn DocumentStore>,
            Arc::new(identity),
            demo_mode,
        );

        Self {
            router: router(state),
            store,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .expect_success_by_default()
            .build(self.router.clone())
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .build(self.router.clone())
    }

    /// Helper: create a project via the API as the holder of `token`.
    pub async fn create_project(
        &self,
        server: &axum_test::TestServer,
        token: &str,
        title: &str,
        category: &str,
    ) -> Value {
        server
            .post("/api/v1/projects")
            .authorization_bearer(token)
            .json(&project_form(title, category))
            .await
            .json()
    }
}

/// A complete project submission.
pub fn project_form(title: &str, category: &str) -> Value {
    json!({
        "title": title,
        "description": format!("{title} description"),
        "funding_goal": 2.0,
        "num_collaborators": 3,
        "github_link": "https://github.com/lab/project",
        "date_of_creation": "2024-05-01",
        "project_category": category,
        "skills_required": "React, Node",
        "open_to_collaborators": true,
        "funding_available": false,
        "seeking_mentorship": false,
        "remote_collaboration": true,
        "author_name": "Ada Lovelace",
        "author_institution": "Analytical Society",
        "location": "London"
    })
}
