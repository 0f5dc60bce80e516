//! Listing pipeline: retrieve the owner-keyed tree, flatten it, filter, sort.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;
use crate::models::record::{Listed, ListingRecord, RecordKey, Toggle};
use crate::store::{DocumentStore, StorePath};

/// Category selection. `All` is the "no category filter" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Exact, case-sensitive match against the record's category.
    Exactly(String),
}

impl CategoryFilter {
    /// `"all"`, `"All"`, `"All Categories"` and blank input select everything.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "all" | "All" | "All Categories" => CategoryFilter::All,
            other => CategoryFilter::Exactly(other.to_string()),
        }
    }

    fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Exactly(wanted) => wanted == category,
        }
    }
}

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Keep retrieval order.
    #[default]
    Relevance,
    MostRecent,
    MostPopular,
    MostCollaborators,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "relevance" => Ok(SortKey::Relevance),
            "recent" | "most-recent" => Ok(SortKey::MostRecent),
            "popular" | "most-popular" => Ok(SortKey::MostPopular),
            "collaborators" | "most-collaborators" => Ok(SortKey::MostCollaborators),
            other => Err(AppError::Validation(format!(
                "Unknown sort key '{other}'. Expected: relevance, recent, popular, collaborators"
            ))),
        }
    }
}

/// Everything a listing page selects: category, free text, toggles and ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub category: CategoryFilter,
    pub text: String,
    pub toggles: BTreeSet<Toggle>,
    pub sort: SortKey,
}

impl ListingQuery {
    pub fn with_toggle(mut self, toggle: Toggle) -> Self {
        self.toggles.insert(toggle);
        self
    }

    /// Does `record` pass the category, text and toggle filters?
    pub fn matches<T: ListingRecord>(&self, record: &T) -> bool {
        self.category.matches(record.category())
            && text_matches(&self.text, record)
            && self.toggles.iter().all(|toggle| record.flag(*toggle))
    }
}

fn text_matches<T: ListingRecord>(query: &str, record: &T) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    record.title().to_lowercase().contains(&needle)
        || record.description().to_lowercase().contains(&needle)
        || record
            .tokens()
            .iter()
            .any(|token| token.to_lowercase().contains(&needle))
}

/// Flatten `{ownerId: {collection: {recordId: fields}}}` into annotated records.
///
/// Owners without the collection are skipped. A record that does not fit the
/// schema is skipped with a warning instead of failing the whole listing.
pub fn flatten<T>(tree: Option<Value>) -> Vec<Listed<T>>
where
    T: ListingRecord + DeserializeOwned,
{
    let Some(Value::Object(owners)) = tree else {
        return vec![];
    };
    let collection = T::COLLECTION.segment();

    let mut flattened = Vec::new();
    for (owner_id, mut owner) in owners {
        let Some(Value::Object(records)) = owner.get_mut(collection).map(Value::take) else {
            continue;
        };
        for (record_id, fields) in records {
            match serde_json::from_value::<T>(fields) {
                Ok(record) => {
                    flattened.push(Listed::new(RecordKey::new(&owner_id, record_id), record))
                }
                Err(e) => tracing::warn!(
                    owner_id = %owner_id,
                    record_id = %record_id,
                    "Skipping malformed {collection} record: {e}"
                ),
            }
        }
    }
    flattened
}

/// Keep the records that satisfy `query`'s filters, preserving order.
pub fn filter<T: ListingRecord>(records: Vec<Listed<T>>, query: &ListingQuery) -> Vec<Listed<T>> {
    records
        .into_iter()
        .filter(|listed| query.matches(&listed.record))
        .collect()
}

/// Stable sort by `key`. Ties keep their incoming order.
pub fn sort<T: ListingRecord>(records: &mut [Listed<T>], key: SortKey) {
    match key {
        SortKey::Relevance => {}
        // `None < Some(_)`, so records without a timestamp end up last.
        SortKey::MostRecent => {
            records.sort_by(|a, b| b.record.created_at().cmp(&a.record.created_at()))
        }
        SortKey::MostPopular => {
            records.sort_by(|a, b| b.record.popularity().cmp(&a.record.popularity()))
        }
        SortKey::MostCollaborators => {
            records.sort_by(|a, b| b.record.collaborators().cmp(&a.record.collaborators()))
        }
    }
}

/// Read the whole owner tree and flatten the `T` collection out of it.
pub async fn retrieve<T>(store: &dyn DocumentStore) -> Result<Vec<Listed<T>>, AppError>
where
    T: ListingRecord + DeserializeOwned,
{
    let tree = store.read(&StorePath::owners()).await?;
    Ok(flatten(tree))
}

/// Apply the filters and ordering of `query` to already retrieved records.
pub fn apply<T: ListingRecord>(records: Vec<Listed<T>>, query: &ListingQuery) -> Vec<Listed<T>> {
    let mut visible = filter(records, query);
    sort(&mut visible, query.sort);
    visible
}

/// Produce the visible listing for a page.
///
/// A store failure is logged and yields an empty listing: the page shows
/// "no results" rather than an error.
pub async fn load<T>(store: &dyn DocumentStore, query: &ListingQuery) -> Vec<Listed<T>>
where
    T: ListingRecord + DeserializeOwned,
{
    match retrieve::<T>(store).await {
        Ok(records) => apply(records, query),
        Err(e) => {
            tracing::error!("Failed to retrieve {} listing: {e}", T::COLLECTION);
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::funding::FundingOpportunity;
    use crate::models::project::Project;
    use crate::store::memory::InMemoryStore;
    use crate::store::MockDocumentStore;
    use serde_json::json;
    use std::collections::HashSet;

    fn project(fields: Value) -> Listed<Project> {
        Listed::new(
            RecordKey::new("u", "p"),
            serde_json::from_value(fields).unwrap(),
        )
    }

    fn titles(records: &[Listed<Project>]) -> Vec<&str> {
        records.iter().map(|r| r.record.title.as_str()).collect()
    }

    fn sample_tree() -> Value {
        json!({
            "u1": {"projects": {
                "p1": {"title": "A", "category": "X"},
                "p2": {"title": "C", "category": "Y", "skillsRequired": "React, Node"}
            }},
            "u2": {"projects": {"p1": {"title": "B", "category": "Y"}},
                   "funding": {"f1": {"title": "Grant", "category": "Grants"}}},
            "u3": {}
        })
    }

    #[test]
    fn test_flatten_annotates_provenance() {
        let records: Vec<Listed<Project>> = flatten(Some(sample_tree()));
        assert_eq!(records.len(), 3);

        let keys: HashSet<RecordKey> = records.iter().map(Listed::key).collect();
        assert_eq!(keys.len(), records.len(), "(ownerId, recordId) pairs must be unique");
        assert!(keys.contains(&RecordKey::new("u1", "p1")));
        assert!(keys.contains(&RecordKey::new("u2", "p1")));
    }

    #[test]
    fn test_flatten_selects_collection() {
        let funding: Vec<Listed<FundingOpportunity>> = flatten(Some(sample_tree()));
        assert_eq!(funding.len(), 1);
        assert_eq!(funding[0].key(), RecordKey::new("u2", "f1"));
    }

    #[test]
    fn test_flatten_absent_tree_is_empty() {
        assert!(flatten::<Project>(None).is_empty());
        assert!(flatten::<Project>(Some(json!("garbage"))).is_empty());
    }

    #[test]
    fn test_flatten_skips_malformed_records() {
        let tree = json!({"u1": {"projects": {
            "good": {"title": "ok"},
            "bad": {"title": ["not", "a", "string"]}
        }}});
        let records: Vec<Listed<Project>> = flatten(Some(tree));
        assert_eq!(titles(&records), ["ok"]);
    }

    #[test]
    fn test_category_scenario() {
        let tree = json!({
            "u1": {"projects": {"p1": {"title": "A", "category": "X"}}},
            "u2": {"projects": {"p2": {"title": "B", "category": "Y"}}}
        });
        let query = ListingQuery {
            category: CategoryFilter::parse("X"),
            ..Default::default()
        };
        let result = apply(flatten::<Project>(Some(tree)), &query);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].owner_id, "u1");
        assert_eq!(result[0].record_id, "p1");
        assert_eq!(result[0].record.title, "A");
        assert_eq!(result[0].record.category(), "X");
    }

    #[test]
    fn test_comment_counts_do_not_hide_projects() {
        let tree = json!({"u1": {"projects": {
            "p1": {"title": "Solar", "comments": 15},
            "p2": {"title": "Wind"},
            "p3": {"title": "Tidal", "comments": {"c1": {"text": 42}}}
        }}});
        let titles: Vec<String> = flatten::<Project>(Some(tree))
            .into_iter()
            .map(|listed| listed.record.title)
            .collect();
        assert_eq!(titles, ["Solar", "Wind", "Tidal"]);
    }

    #[test]
    fn test_project_category_wins_over_legacy_key() {
        let tree = json!({"u1": {"projects": {
            "p1": {"title": "A", "category": "Y", "projectCategory": "X"}
        }}});
        let query = ListingQuery {
            category: CategoryFilter::parse("X"),
            ..Default::default()
        };
        assert_eq!(apply(flatten::<Project>(Some(tree)), &query).len(), 1);
    }

    #[test]
    fn test_category_all_equals_no_filter() {
        let records: Vec<Listed<Project>> = flatten(Some(sample_tree()));
        for sentinel in ["all", "All", "All Categories", ""] {
            let query = ListingQuery {
                category: CategoryFilter::parse(sentinel),
                ..Default::default()
            };
            assert_eq!(filter(records.clone(), &query), records, "{sentinel:?}");
        }
    }

    #[test]
    fn test_category_match_is_case_sensitive() {
        let records = vec![project(json!({"title": "A", "category": "Biotechnology"}))];
        let query = ListingQuery {
            category: CategoryFilter::parse("biotechnology"),
            ..Default::default()
        };
        assert!(filter(records, &query).is_empty());
    }

    #[test]
    fn test_empty_text_equals_no_filter() {
        let records: Vec<Listed<Project>> = flatten(Some(sample_tree()));
        let query = ListingQuery {
            text: String::new(),
            ..Default::default()
        };
        assert_eq!(filter(records.clone(), &query), records);
    }

    #[test]
    fn test_text_matches_skill_tokens_case_insensitively() {
        let records = vec![
            project(json!({"title": "Web", "skillsRequired": "React, Node"})),
            project(json!({"title": "Other", "skillsRequired": "Rust"})),
        ];
        let query = ListingQuery {
            text: "react".to_string(),
            ..Default::default()
        };
        assert_eq!(titles(&filter(records, &query)), ["Web"]);
    }

    #[test]
    fn test_text_matches_title_and_description() {
        let records = vec![
            project(json!({"title": "Quantum Sensors"})),
            project(json!({"title": "X", "description": "uses QUANTUM annealing"})),
            project(json!({"title": "Y", "description": "classical"})),
        ];
        let query = ListingQuery {
            text: " Quantum ".to_string(),
            ..Default::default()
        };
        assert_eq!(titles(&filter(records, &query)), ["Quantum Sensors", "X"]);
    }

    #[test]
    fn test_active_toggle_excludes_absent_field() {
        let records = vec![
            project(json!({"title": "remote", "remoteCollaboration": true})),
            project(json!({"title": "unknown"})),
            project(json!({"title": "onsite", "remoteCollaboration": false})),
        ];
        let query = ListingQuery::default().with_toggle(Toggle::RemoteOk);
        assert_eq!(titles(&filter(records, &query)), ["remote"]);
    }

    #[test]
    fn test_all_active_toggles_must_hold() {
        let records = vec![
            project(json!({"title": "both", "openToCollaborators": true, "fundingAvailable": true})),
            project(json!({"title": "one", "openToCollaborators": true})),
        ];
        let query = ListingQuery::default()
            .with_toggle(Toggle::OpenToCollaborators)
            .with_toggle(Toggle::FundingAvailable);
        assert_eq!(titles(&filter(records, &query)), ["both"]);
    }

    #[test]
    fn test_sort_most_recent() {
        let mut records = vec![
            project(json!({"title": "jan", "createdAt": "2024-01-01"})),
            project(json!({"title": "mar", "createdAt": "2024-03-01"})),
            project(json!({"title": "feb", "createdAt": "2024-02-01"})),
        ];
        sort(&mut records, SortKey::MostRecent);
        assert_eq!(titles(&records), ["mar", "feb", "jan"]);
    }

    #[test]
    fn test_sort_most_recent_puts_missing_last_and_is_stable() {
        let mut records = vec![
            project(json!({"title": "none"})),
            project(json!({"title": "a", "createdAt": "2024-01-01"})),
            project(json!({"title": "b", "createdAt": "2024-01-01T00:00:00.000Z"})),
        ];
        sort(&mut records, SortKey::MostRecent);
        assert_eq!(titles(&records), ["a", "b", "none"]);
    }

    #[test]
    fn test_sort_most_popular_treats_missing_as_zero() {
        let mut records = vec![
            project(json!({"title": "five", "stars": 5})),
            project(json!({"title": "absent"})),
            project(json!({"title": "ten", "stars": 10})),
        ];
        sort(&mut records, SortKey::MostPopular);
        assert_eq!(titles(&records), ["ten", "five", "absent"]);
    }

    #[test]
    fn test_sort_most_collaborators() {
        let mut records = vec![
            project(json!({"title": "two", "numCollaborators": 2})),
            project(json!({"title": "absent"})),
            project(json!({"title": "seven", "numCollaborators": "7"})),
        ];
        sort(&mut records, SortKey::MostCollaborators);
        assert_eq!(titles(&records), ["seven", "two", "absent"]);
    }

    #[test]
    fn test_relevance_keeps_order() {
        let mut records = vec![
            project(json!({"title": "b", "stars": 1})),
            project(json!({"title": "a", "stars": 9})),
        ];
        sort(&mut records, SortKey::Relevance);
        assert_eq!(titles(&records), ["b", "a"]);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("recent".parse::<SortKey>().unwrap(), SortKey::MostRecent);
        assert_eq!("Most-Popular".parse::<SortKey>().unwrap(), SortKey::MostPopular);
        assert_eq!("collaborators".parse::<SortKey>().unwrap(), SortKey::MostCollaborators);
        assert_eq!("".parse::<SortKey>().unwrap(), SortKey::Relevance);
        assert!(matches!("oldest".parse::<SortKey>(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_load_from_empty_store() {
        let store = InMemoryStore::new();
        let records: Vec<Listed<Project>> = load(&store, &ListingQuery::default()).await;
        assert!(records.is_empty());
        assert!(retrieve::<Project>(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_degrades_to_empty_when_store_fails() {
        let mut store = MockDocumentStore::new();
        store
            .expect_read()
            .times(1)
            .returning(|_| Err(AppError::Store("connection refused".into())));

        let records: Vec<Listed<Project>> = load(&store, &ListingQuery::default()).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_propagates_store_failure() {
        let mut store = MockDocumentStore::new();
        store
            .expect_read()
            .returning(|_| Err(AppError::Store("timeout".into())));

        let result = retrieve::<FundingOpportunity>(&store).await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
