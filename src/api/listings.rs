use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::listing::{self, CategoryFilter, ListingQuery};
use crate::models::funding::FundingOpportunity;
use crate::models::project::Project;
use crate::models::record::{Listed, ListingRecord, Toggle};
use crate::store::DocumentStore;

/// Query-string parameters shared by every listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingParams {
    pub category: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    #[serde(default)]
    pub open_to_collaborators: bool,
    #[serde(default)]
    pub funding_available: bool,
    #[serde(default)]
    pub seeking_mentorship: bool,
    #[serde(default, alias = "remote_collaboration")]
    pub remote_ok: bool,
    pub sort: Option<String>,
}

impl ListingParams {
    pub fn into_query(self) -> Result<ListingQuery, AppError> {
        let toggles = [
            (self.open_to_collaborators, Toggle::OpenToCollaborators),
            (self.funding_available, Toggle::FundingAvailable),
            (self.seeking_mentorship, Toggle::SeekingMentorship),
            (self.remote_ok, Toggle::RemoteOk),
        ]
        .into_iter()
        .filter_map(|(active, toggle)| active.then_some(toggle))
        .collect();

        Ok(ListingQuery {
            category: self
                .category
                .as_deref()
                .map(CategoryFilter::parse)
                .unwrap_or_default(),
            text: self.q.unwrap_or_default(),
            toggles,
            sort: self.sort.as_deref().unwrap_or_default().parse()?,
        })
    }
}

/// Response body of the listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse<T> {
    pub total: usize,
    pub items: Vec<Listed<T>>,
}

impl<T> From<Vec<Listed<T>>> for ListingResponse<T> {
    fn from(items: Vec<Listed<T>>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

/// Core listing logic shared by the handlers.
///
/// Invalid parameters are rejected; a failing store yields an empty listing.
pub async fn process_listing<T>(
    store: &dyn DocumentStore,
    params: ListingParams,
) -> Result<ListingResponse<T>, AppError>
where
    T: ListingRecord + DeserializeOwned,
{
    let query = params.into_query()?;
    let items = listing::load::<T>(store, &query).await;
    tracing::debug!(
        collection = %T::COLLECTION,
        total = items.len(),
        "Listing served"
    );
    Ok(items.into())
}

/// Projects looking for a mentor.
pub async fn process_mentorship_listing(
    store: &dyn DocumentStore,
    params: ListingParams,
) -> Result<ListingResponse<Project>, AppError> {
    process_listing(
        store,
        ListingParams {
            seeking_mentorship: true,
            ..params
        },
    )
    .await
}

/// Axum handler for `GET /api/v1/projects`.
pub async fn projects_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    axum::extract::Query(params): axum::extract::Query<ListingParams>,
) -> Result<axum::Json<ListingResponse<Project>>, AppError> {
    let response = process_listing(state.store.as_ref(), params).await?;
    Ok(axum::Json(response))
}

/// Axum handler for `GET /api/v1/funding`.
pub async fn funding_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    axum::extract::Query(params): axum::extract::Query<ListingParams>,
) -> Result<axum::Json<ListingResponse<FundingOpportunity>>, AppError> {
    let response = process_listing(state.store.as_ref(), params).await?;
    Ok(axum::Json(response))
}

/// Axum handler for `GET /api/v1/mentorship`.
pub async fn mentorship_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    axum::extract::Query(params): axum::extract::Query<ListingParams>,
) -> Result<axum::Json<ListingResponse<Project>>, AppError> {
    let response = process_mentorship_listing(state.store.as_ref(), params).await?;
    Ok(axum::Json(response))
}
