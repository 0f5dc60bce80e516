use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::record::{Collection, RecordKey};
use crate::store::{DocumentStore, StorePath};

/// Sample listings owned by the demo users.
fn demo_records() -> Vec<(Collection, RecordKey, Value)> {
    vec![
        (
            Collection::Projects,
            RecordKey::new("demo-ada", "reef-mapping"),
            json!({
                "title": "Coral Reef Mapping",
                "description": "Drone surveys and image segmentation of reef health.",
                "fundingGoal": 4.0,
                "numCollaborators": 5,
                "githubLink": "https://github.com/collabverse/reef-mapping",
                "dateOfCreation": "2024-02-10",
                "projectCategory": "Environmental Science",
                "skillsRequired": "Python, Computer Vision, Drones",
                "createdAt": "2024-02-10T09:00:00.000Z",
                "openToCollaborators": true,
                "fundingAvailable": false,
                "seekingMentorship": true,
                "remoteCollaboration": true,
                "author": {"name": "Ada Lovelace", "institution": "Analytical Society"},
                "location": "Cairns",
                "stars": 12
            }),
        ),
        (
            Collection::Projects,
            RecordKey::new("demo-grace", "compiler-tutor"),
            json!({
                "title": "Compiler Tutor",
                "description": "An interactive course that builds a compiler step by step.",
                "fundingGoal": 1.5,
                "numCollaborators": 2,
                "githubLink": "https://github.com/collabverse/compiler-tutor",
                "dateOfCreation": "2024-03-22",
                "projectCategory": "Computer Science",
                "skillsRequired": "Rust, React, Node",
                "createdAt": "2024-03-22T14:30:00.000Z",
                "openToCollaborators": true,
                "fundingAvailable": true,
                "seekingMentorship": false,
                "remoteCollaboration": true,
                "author": {"name": "Grace Hopper", "institution": "Navy Lab"},
                "location": "Arlington",
                "stars": 30
            }),
        ),
        (
            Collection::Funding,
            RecordKey::new("demo-alan", "open-science-grant"),
            json!({
                "title": "Open Science Grant",
                "amount": 10.0,
                "deadline": "2025-06-30",
                "category": "Grants",
                "org": "Bletchley Foundation",
                "description": "Funding for reproducible, openly published research.",
                "tags": "Open Science, Reproducibility",
                "createdAt": "2024-01-05T08:00:00.000Z"
            }),
        ),
    ]
}

/// Seed the demo listings. Records that already exist are left untouched.
pub async fn seed_demo_data(store: &dyn DocumentStore) -> Result<usize, AppError> {
    tracing::info!("Starting demo data seeding...");

    let mut created = 0;
    for (collection, key, record) in demo_records() {
        let path = StorePath::record(collection, &key)?;
        if store.create_if_absent(&path, record).await? {
            tracing::info!("Seeded {} record '{}'", collection, key);
            created += 1;
        } else {
            tracing::info!("{} record '{}' already exists, skipping.", collection, key);
        }
    }

    tracing::info!(created, "Demo data seeding complete");
    Ok(created)
}
