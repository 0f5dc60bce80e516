use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::middleware::MaybeUser;
use crate::auth::models::{require_user, AuthenticatedUser};
use crate::error::AppError;
use crate::models::funding::FundingOpportunity;
use crate::models::record::{Collection, Listed, RecordKey};
use crate::models::tags::TagList;
use crate::store::{DocumentStore, StorePath};

/// The request payload for posting a funding opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewFunding {
    pub title: String,
    pub amount: Option<f64>,
    pub deadline: String,
    pub category: String,
    pub org: String,
    pub description: String,
    /// Comma-separated tags.
    pub tags: String,
}

impl NewFunding {
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("category", &self.category),
            ("description", &self.description),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Please fill in all required fields. Missing: {}",
                missing.join(", ")
            )));
        }
        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(AppError::Validation(
                    "amount must be a non-negative number".into(),
                ));
            }
        }
        Ok(())
    }

    fn into_funding(self) -> FundingOpportunity {
        FundingOpportunity {
            title: self.title.trim().to_string(),
            amount: self.amount.unwrap_or_default(),
            deadline: self.deadline.trim().to_string(),
            category: self.category.trim().to_string(),
            org: self.org.trim().to_string(),
            description: self.description.trim().to_string(),
            tags: TagList::parse(&self.tags),
            created_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// The request payload for applying to a funding opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub project_id: String,
    /// Owner of the project. Defaults to the caller; anyone else is refused.
    #[serde(default)]
    pub project_owner_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub outcome: ApplyOutcome,
    pub funding: RecordKey,
    pub project_id: String,
}

/// Validate and append a funding opportunity under the caller.
pub async fn post_funding(
    store: &dyn DocumentStore,
    user: Option<&AuthenticatedUser>,
    request: NewFunding,
) -> Result<Listed<FundingOpportunity>, AppError> {
    let user = require_user(user, "post funding opportunities")?;
    request.validate()?;

    let funding = request.into_funding();
    let value = serde_json::to_value(&funding)
        .map_err(|e| AppError::Internal(format!("Failed to serialize funding: {}", e)))?;
    let record_id = store
        .append(
            &StorePath::collection(&user.user_id, Collection::Funding)?,
            value,
        )
        .await?;

    let key = RecordKey::new(&user.user_id, record_id);
    tracing::info!(funding = %key, "Funding opportunity posted");
    Ok(Listed::new(key, funding))
}

pub async fn get_funding(
    store: &dyn DocumentStore,
    key: &RecordKey,
) -> Result<Listed<FundingOpportunity>, AppError> {
    let value = store
        .read(&StorePath::record(Collection::Funding, key)?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Funding opportunity '{}' not found", key)))?;
    let funding = serde_json::from_value(value).map_err(|e| {
        AppError::Internal(format!("Funding opportunity '{}' is malformed: {}", key, e))
    })?;
    Ok(Listed::new(key.clone(), funding))
}

/// Apply to a funding opportunity with one of the caller's projects.
///
/// The application mark is created atomically, so repeating an application
/// (or racing it) records it once.
pub async fn apply_to_funding(
    store: &dyn DocumentStore,
    user: Option<&AuthenticatedUser>,
    funding: &RecordKey,
    request: ApplyRequest,
) -> Result<ApplyResponse, AppError> {
    let user = require_user(user, "apply for funding")?;

    if let Some(owner) = request.project_owner_id.as_deref() {
        if owner != user.user_id {
            return Err(AppError::Forbidden(
                "You can only apply with your own projects".into(),
            ));
        }
    }
    let project = RecordKey::new(&user.user_id, &request.project_id);

    let funding_path = StorePath::record(Collection::Funding, funding)?;
    if store.read(&funding_path).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Funding opportunity '{}' not found",
            funding
        )));
    }
    if store
        .read(&StorePath::record(Collection::Projects, &project)?)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!(
            "Project '{}' not found among your projects",
            request.project_id
        )));
    }

    let marker = funding_path
        .child("appliedProjects")?
        .child(&request.project_id)?;
    let outcome = if store.create_if_absent(&marker, Value::Bool(true)).await? {
        tracing::info!(funding = %funding, project = %project, "Applied to funding");
        ApplyOutcome::Applied
    } else {
        ApplyOutcome::AlreadyApplied
    };

    Ok(ApplyResponse {
        outcome,
        funding: funding.clone(),
        project_id: request.project_id,
    })
}

/// Axum handler for `POST /api/v1/funding`.
pub async fn post_funding_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    user: MaybeUser,
    axum::Json(request): axum::Json<NewFunding>,
) -> Result<(axum::http::StatusCode, axum::Json<Listed<FundingOpportunity>>), AppError> {
    let posted = post_funding(state.store.as_ref(), user.user(), request).await?;
    Ok((axum::http::StatusCode::CREATED, axum::Json(posted)))
}

/// Axum handler for `GET /api/v1/funding/{owner}/{id}`.
pub async fn get_funding_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    axum::extract::Path((owner_id, record_id)): axum::extract::Path<(String, String)>,
) -> Result<axum::Json<Listed<FundingOpportunity>>, AppError> {
    let key = RecordKey::new(owner_id, record_id);
    Ok(axum::Json(get_funding(state.store.as_ref(), &key).await?))
}

/// Axum handler for `POST /api/v1/funding/{owner}/{id}/apply`.
pub async fn apply_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    user: MaybeUser,
    axum::extract::Path((owner_id, record_id)): axum::extract::Path<(String, String)>,
    axum::Json(request): axum::Json<ApplyRequest>,
) -> Result<axum::Json<ApplyResponse>, AppError> {
    let key = RecordKey::new(owner_id, record_id);
    let response = apply_to_funding(state.store.as_ref(), user.user(), &key, request).await?;
    Ok(axum::Json(response))
}
