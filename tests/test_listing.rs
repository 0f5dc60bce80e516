mod common;

use common::TestEnv;
use serde_json::{json, Value};

fn two_owner_tree() -> Value {
    json!({"owners": {
        "u1": {
            "projects": {
                "p1": {"title": "A", "category": "X", "createdAt": "2024-01-01", "stars": 5,
                       "skillsRequired": "React, Node", "remoteCollaboration": true},
                "p3": {"title": "Mentored", "category": "Y", "createdAt": "2024-03-01",
                       "seekingMentorship": true}
            },
            "funding": {
                "f1": {"title": "Seed Grant", "category": "Grants", "tags": "Climate, Seed",
                       "appliedProjects": {"p9": true}}
            }
        },
        "u2": {
            "projects": {
                "p2": {"title": "B", "category": "Y", "createdAt": "2024-02-01", "stars": 10}
            }
        }
    }})
}

fn titles(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn category_filter_selects_one_owner() {
    let env = TestEnv::with_tree(two_owner_tree());
    let server = env.server();

    let body: Value = server
        .get("/api/v1/projects")
        .add_query_param("category", "X")
        .await
        .json();

    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["ownerId"], "u1");
    assert_eq!(body["items"][0]["recordId"], "p1");
    assert_eq!(body["items"][0]["title"], "A");
}

#[tokio::test]
async fn all_categories_lists_everything() {
    let env = TestEnv::with_tree(two_owner_tree());
    let server = env.server();

    let body: Value = server
        .get("/api/v1/projects")
        .add_query_param("category", "All Categories")
        .await
        .json();
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn sort_most_recent_and_most_popular() {
    let env = TestEnv::with_tree(two_owner_tree());
    let server = env.server();

    let recent: Value = server
        .get("/api/v1/projects")
        .add_query_param("sort", "recent")
        .await
        .json();
    assert_eq!(titles(&recent), ["Mentored", "B", "A"]);

    let popular: Value = server
        .get("/api/v1/projects")
        .add_query_param("sort", "popular")
        .await
        .json();
    assert_eq!(titles(&popular), ["B", "A", "Mentored"]);
}

#[tokio::test]
async fn text_query_matches_skills() {
    let env = TestEnv::with_tree(two_owner_tree());
    let server = env.server();

    let body: Value = server
        .get("/api/v1/projects")
        .add_query_param("q", "react")
        .await
        .json();
    assert_eq!(titles(&body), ["A"]);
}

#[tokio::test]
async fn toggle_filters() {
    let env = TestEnv::with_tree(two_owner_tree());
    let server = env.server();

    let body: Value = server
        .get("/api/v1/projects")
        .add_query_param("remote_ok", "true")
        .await
        .json();
    assert_eq!(titles(&body), ["A"]);

    let mentorship: Value = server.get("/api/v1/mentorship").await.json();
    assert_eq!(titles(&mentorship), ["Mentored"]);
}

#[tokio::test]
async fn funding_listing() {
    let env = TestEnv::with_tree(two_owner_tree());
    let server = env.server();

    let body: Value = server
        .get("/api/v1/funding")
        .add_query_param("q", "climate")
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["ownerId"], "u1");
    assert_eq!(body["items"][0]["tags"], "Climate, Seed");
}

#[tokio::test]
async fn empty_store_gives_empty_listing() {
    let env = TestEnv::start();
    let server = env.server();

    let body: Value = server.get("/api/v1/projects").await.json();
    assert_eq!(body, json!({"total": 0, "items": []}));
}

#[tokio::test]
async fn unknown_sort_key_is_bad_request() {
    let env = TestEnv::with_tree(two_owner_tree());
    let server = env.server_permissive();

    let response = server
        .get("/api/v1/projects")
        .add_query_param("sort", "alphabetical")
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("alphabetical"));
}
