use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::comment::Comment;
use crate::models::lenient;
use crate::models::record::{Collection, ListingRecord, Toggle};
use crate::models::tags::TagList;

/// Who is behind a project, as entered on the submission form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    pub name: String,
    pub institution: String,
}

/// A research project stored at `owners/{ownerId}/projects/{recordId}`.
///
/// Every field has a default so partially-filled records still list. Counters
/// and maps that were never written read as zero or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "lenient::number")]
    pub funding_goal: f64,
    #[serde(deserialize_with = "lenient::counter")]
    pub num_collaborators: u64,
    pub github_link: String,
    pub date_of_creation: String,
    pub project_category: String,
    /// Older records carry `category` instead of `projectCategory`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub skills_required: TagList,
    #[serde(
        deserialize_with = "lenient::timestamp",
        serialize_with = "lenient::serialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::truthy")]
    pub open_to_collaborators: bool,
    #[serde(deserialize_with = "lenient::truthy")]
    pub funding_available: bool,
    #[serde(deserialize_with = "lenient::truthy")]
    pub seeking_mentorship: bool,
    #[serde(deserialize_with = "lenient::truthy")]
    pub remote_collaboration: bool,
    pub author: Author,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient::counter")]
    pub stars: u64,
    #[serde(deserialize_with = "lenient::counter")]
    pub likes: u64,
    #[serde(
        deserialize_with = "lenient::entries",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub liked_by: BTreeMap<String, bool>,
    #[serde(
        deserialize_with = "lenient::entries",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub comments: BTreeMap<String, Comment>,
}

impl ListingRecord for Project {
    const COLLECTION: Collection = Collection::Projects;

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> &str {
        if self.project_category.is_empty() {
            &self.category
        } else {
            &self.project_category
        }
    }

    fn tokens(&self) -> &[String] {
        self.skills_required.tokens()
    }

    fn flag(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::OpenToCollaborators => self.open_to_collaborators,
            Toggle::FundingAvailable => self.funding_available,
            Toggle::SeekingMentorship => self.seeking_mentorship,
            Toggle::RemoteOk => self.remote_collaboration,
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn popularity(&self) -> u64 {
        self.stars
    }

    fn collaborators(&self) -> u64 {
        self.num_collaborators
    }
}
