mod common;

use common::{ADA_TOKEN, TestEnv};

#[tokio::test]
async fn login_success_sets_cookie() {
    let env = TestEnv::start();
    let server = env.server();

    let response = server
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "ada",
            "password": "ada"
        }))
        .await;

    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["message"].as_str(), Some("Login successful"));
    assert_eq!(body["user"]["user_id"].as_str(), Some("demo-ada"));
    assert_eq!(body["user"]["display_name"].as_str(), Some("Ada Lovelace"));
}

#[tokio::test]
async fn login_invalid_credentials() {
    let env = TestEnv::start();
    let server = env.server_permissive();

    let response = server
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "ada",
            "password": "wrongpassword"
        }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn login_disabled_outside_demo_mode() {
    let env = TestEnv::without_demo();
    let server = env.server_permissive();

    let response = server
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "ada",
            "password": "ada"
        }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn me_with_valid_cookie() {
    let env = TestEnv::start();
    let server = env.server();

    server
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "grace",
            "password": "grace"
        }))
        .await;

    // Cookie is sent automatically.
    let response = server.get("/api/auth/me").await;
    response.assert_status_ok();

    let user: serde_json::Value = response.json();
    assert_eq!(user["user_id"].as_str(), Some("demo-grace"));
}

#[tokio::test]
async fn me_with_bearer_token() {
    let env = TestEnv::without_demo();
    let server = env.server();

    let user: serde_json::Value = server
        .get("/api/auth/me")
        .authorization_bearer(ADA_TOKEN)
        .await
        .json();
    assert_eq!(user["user_id"].as_str(), Some("u-ada"));
}

#[tokio::test]
async fn me_without_session() {
    let env = TestEnv::start();
    let server = env.server_permissive();

    let response = server.get("/api/auth/me").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn unknown_bearer_token_rejected() {
    let env = TestEnv::start();
    let server = env.server_permissive();

    let response = server
        .get("/api/auth/me")
        .authorization_bearer("not-a-token")
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn logout_clears_session() {
    let env = TestEnv::start();
    let server = env.server_permissive();

    server
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": "alan",
            "password": "alan"
        }))
        .await
        .assert_status_ok();
    server.get("/api/auth/me").await.assert_status_ok();

    server.post("/api/auth/logout").await.assert_status_ok();

    server.get("/api/auth/me").await.assert_status_unauthorized();
}
