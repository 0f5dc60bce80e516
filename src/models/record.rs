use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The named sub-collections kept under every owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Projects,
    Funding,
}

impl Collection {
    /// The path segment used in the store.
    pub fn segment(&self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::Funding => "funding",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Global identity of a record: the owner it is nested under plus its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub owner_id: String,
    pub record_id: String,
}

impl RecordKey {
    pub fn new(owner_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            record_id: record_id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.record_id)
    }
}

/// A record lifted out of the owner-keyed tree, annotated with where it lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listed<T> {
    pub owner_id: String,
    pub record_id: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Listed<T> {
    pub fn new(key: RecordKey, record: T) -> Self {
        Self {
            owner_id: key.owner_id,
            record_id: key.record_id,
            record,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.owner_id, &self.record_id)
    }
}

/// Boolean listing filters. Each one, when active, requires its flag to be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Toggle {
    OpenToCollaborators,
    FundingAvailable,
    SeekingMentorship,
    RemoteOk,
}

impl Toggle {
    pub const ALL: [Toggle; 4] = [
        Toggle::OpenToCollaborators,
        Toggle::FundingAvailable,
        Toggle::SeekingMentorship,
        Toggle::RemoteOk,
    ];
}

/// The view of a record the listing pipeline filters and sorts on.
pub trait ListingRecord {
    /// Which owner sub-collection holds records of this type.
    const COLLECTION: Collection;

    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    /// Tag or skill tokens searched by the free-text query.
    fn tokens(&self) -> &[String];
    fn flag(&self, toggle: Toggle) -> bool;
    fn created_at(&self) -> Option<DateTime<Utc>>;
    /// Counter behind the "most popular" ordering.
    fn popularity(&self) -> u64;
    /// Counter behind the "most collaborators" ordering.
    fn collaborators(&self) -> u64;
}
