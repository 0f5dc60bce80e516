use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::lenient;
use crate::models::record::{Collection, ListingRecord, Toggle};
use crate::models::tags::TagList;

/// A funding opportunity stored at `owners/{ownerId}/funding/{recordId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FundingOpportunity {
    pub title: String,
    #[serde(deserialize_with = "lenient::number")]
    pub amount: f64,
    pub deadline: String,
    pub category: String,
    pub org: String,
    pub description: String,
    pub tags: TagList,
    #[serde(
        deserialize_with = "lenient::timestamp",
        serialize_with = "lenient::serialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Ids of the projects that applied. Stored as `{projectId: true}`.
    #[serde(
        deserialize_with = "read_id_set",
        serialize_with = "write_id_set",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub applied_projects: BTreeSet<String>,
}

impl ListingRecord for FundingOpportunity {
    const COLLECTION: Collection = Collection::Funding;

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn tokens(&self) -> &[String] {
        self.tags.tokens()
    }

    // Funding posts carry none of the project flags.
    fn flag(&self, _toggle: Toggle) -> bool {
        false
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn popularity(&self) -> u64 {
        self.applied_projects.len() as u64
    }

    fn collaborators(&self) -> u64 {
        0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdSet {
    List(Vec<serde_json::Value>),
    Map(BTreeMap<String, serde_json::Value>),
}

/// Accepts the legacy array form (`["p1", "p2"]`) and the map form (`{"p1": true}`).
fn read_id_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawIdSet>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawIdSet::List(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(RawIdSet::Map(entries)) => entries
            .into_iter()
            .filter(|(_, marker)| {
                !matches!(marker, serde_json::Value::Null | serde_json::Value::Bool(false))
            })
            .map(|(id, _)| id)
            .collect(),
        None => BTreeSet::new(),
    })
}

fn write_id_set<S>(ids: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(ids.iter().map(|id| (id, true)))
}
