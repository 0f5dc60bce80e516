use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::middleware::MaybeUser;
use crate::auth::models::{require_user, AuthenticatedUser};
use crate::error::AppError;
use crate::listing;
use crate::models::funding::FundingOpportunity;
use crate::models::project::Project;
use crate::store::{DocumentStore, StorePath};

/// Totals shown on an owner's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub active_projects: usize,
    pub funding_posted: usize,
    pub total_collaborators: u64,
    pub funding_goal_total: f64,
    /// Applications received across the owner's funding posts.
    pub applications_received: usize,
    pub likes_received: u64,
}

pub async fn owner_dashboard(
    store: &dyn DocumentStore,
    user: Option<&AuthenticatedUser>,
) -> Result<DashboardSummary, AppError> {
    let user = require_user(user, "view your dashboard")?;
    let Some(owner) = store.read(&StorePath::owner(&user.user_id)?).await? else {
        return Ok(DashboardSummary::default());
    };

    let mut tree = serde_json::Map::new();
    tree.insert(user.user_id.clone(), owner);
    let tree = Value::Object(tree);

    let projects = listing::flatten::<Project>(Some(tree.clone()));
    let funding = listing::flatten::<FundingOpportunity>(Some(tree));

    Ok(DashboardSummary {
        active_projects: projects.len(),
        funding_posted: funding.len(),
        total_collaborators: projects.iter().map(|p| p.record.num_collaborators).sum(),
        funding_goal_total: projects.iter().map(|p| p.record.funding_goal).sum(),
        applications_received: funding
            .iter()
            .map(|f| f.record.applied_projects.len())
            .sum(),
        likes_received: projects.iter().map(|p| p.record.likes).sum(),
    })
}

/// Axum handler for `GET /api/v1/me/dashboard`.
pub async fn dashboard_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    user: MaybeUser,
) -> Result<axum::Json<DashboardSummary>, AppError> {
    Ok(axum::Json(
        owner_dashboard(state.store.as_ref(), user.user()).await?,
    ))
}
