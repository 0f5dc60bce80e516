use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::middleware::MaybeUser;
use crate::auth::models::{require_user, AuthenticatedUser};
use crate::error::AppError;
use crate::listing;
use crate::models::comment::{Comment, CommentEntry};
use crate::models::lenient;
use crate::models::project::{Author, Project};
use crate::models::record::{Collection, Listed, RecordKey};
use crate::models::tags::TagList;
use crate::store::{generate_key, DocumentStore, StorePath};

/// The request payload for creating a project. Mirrors the submission form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub funding_goal: Option<f64>,
    pub num_collaborators: Option<u32>,
    pub github_link: String,
    pub date_of_creation: String,
    pub project_category: String,
    /// Comma-separated skills, e.g. `"React, Node"`.
    pub skills_required: String,
    pub open_to_collaborators: bool,
    pub funding_available: bool,
    pub seeking_mentorship: bool,
    pub remote_collaboration: bool,
    pub author_name: String,
    pub author_institution: String,
    pub location: String,
}

impl NewProject {
    /// Every form field is required. Collects all missing fields in one message.
    pub fn validate(&self) -> Result<(), AppError> {
        let text_fields = [
            ("title", &self.title),
            ("description", &self.description),
            ("github_link", &self.github_link),
            ("date_of_creation", &self.date_of_creation),
            ("project_category", &self.project_category),
            ("skills_required", &self.skills_required),
            ("author_name", &self.author_name),
            ("author_institution", &self.author_institution),
            ("location", &self.location),
        ];
        let mut missing: Vec<&str> = text_fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if self.funding_goal.is_none() {
            missing.push("funding_goal");
        }
        if self.num_collaborators.is_none() {
            missing.push("num_collaborators");
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "All fields are required. Missing: {}",
                missing.join(", ")
            )));
        }

        if let Some(goal) = self.funding_goal {
            if !goal.is_finite() || goal < 0.0 {
                return Err(AppError::Validation(
                    "funding_goal must be a non-negative number".into(),
                ));
            }
        }
        if TagList::parse(&self.skills_required).is_empty() {
            return Err(AppError::Validation(
                "skills_required must list at least one skill".into(),
            ));
        }
        Ok(())
    }

    fn into_project(self) -> Project {
        Project {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            funding_goal: self.funding_goal.unwrap_or_default(),
            num_collaborators: u64::from(self.num_collaborators.unwrap_or_default()),
            github_link: self.github_link.trim().to_string(),
            date_of_creation: self.date_of_creation.trim().to_string(),
            project_category: self.project_category.trim().to_string(),
            skills_required: TagList::parse(&self.skills_required),
            created_at: Some(Utc::now()),
            open_to_collaborators: self.open_to_collaborators,
            funding_available: self.funding_available,
            seeking_mentorship: self.seeking_mentorship,
            remote_collaboration: self.remote_collaboration,
            author: Author {
                name: self.author_name.trim().to_string(),
                institution: self.author_institution.trim().to_string(),
            },
            location: Some(self.location.trim().to_string()),
            ..Default::default()
        }
    }
}

/// Outcome of a like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: u64,
    /// `false` when the caller had already liked the project.
    pub counted: bool,
}

/// The request payload for a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub text: String,
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize record: {}", e)))
}

/// Validate and store a new project under the caller.
///
/// Nothing is written when the caller is anonymous or a field is missing.
pub async fn create_project(
    store: &dyn DocumentStore,
    user: Option<&AuthenticatedUser>,
    request: NewProject,
) -> Result<Listed<Project>, AppError> {
    let user = require_user(user, "add a project")?;
    request.validate()?;

    let project = request.into_project();
    let key = RecordKey::new(&user.user_id, generate_key());
    store
        .write(
            &StorePath::record(Collection::Projects, &key)?,
            to_value(&project)?,
        )
        .await?;

    tracing::info!(project = %key, "Project created");
    Ok(Listed::new(key, project))
}

/// Look up one project by owner and id.
pub async fn get_project(
    store: &dyn DocumentStore,
    key: &RecordKey,
) -> Result<Listed<Project>, AppError> {
    let value = store
        .read(&StorePath::record(Collection::Projects, key)?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project '{}' not found", key)))?;
    let project = serde_json::from_value(value)
        .map_err(|e| AppError::Internal(format!("Project '{}' is malformed: {}", key, e)))?;
    Ok(Listed::new(key.clone(), project))
}

async fn ensure_project_exists(store: &dyn DocumentStore, key: &RecordKey) -> Result<(), AppError> {
    let path = StorePath::record(Collection::Projects, key)?;
    match store.read(&path).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("Project '{}' not found", key))),
    }
}

/// Like a project once per user.
///
/// The liker is recorded with an atomic create-if-absent before the counter
/// is incremented atomically, so concurrent likes are neither lost nor doubled.
pub async fn like_project(
    store: &dyn DocumentStore,
    user: Option<&AuthenticatedUser>,
    key: &RecordKey,
) -> Result<LikeResponse, AppError> {
    let user = require_user(user, "like a project")?;
    ensure_project_exists(store, key).await?;

    let record = StorePath::record(Collection::Projects, key)?;
    let marker = record.child("likedBy")?.child(&user.user_id)?;
    let likes_path = record.child("likes")?;

    if !store.create_if_absent(&marker, Value::Bool(true)).await? {
        let current = store.read(&likes_path).await?;
        return Ok(LikeResponse {
            likes: lenient::counter_value(current.as_ref()),
            counted: false,
        });
    }

    let likes = match store.increment(&likes_path, 1).await {
        Ok(likes) => likes,
        Err(e) => {
            // Undo the marker so the like can be retried.
            if let Err(cleanup) = store.write(&marker, Value::Null).await {
                tracing::error!(
                    project = %key,
                    user_id = %user.user_id,
                    "Failed to remove like marker: {cleanup}"
                );
            }
            return Err(e);
        }
    };
    tracing::info!(project = %key, user_id = %user.user_id, likes, "Project liked");
    Ok(LikeResponse {
        likes: u64::try_from(likes).unwrap_or(0),
        counted: true,
    })
}

/// Append a comment to a project.
pub async fn comment_on_project(
    store: &dyn DocumentStore,
    user: Option<&AuthenticatedUser>,
    key: &RecordKey,
    request: NewComment,
) -> Result<CommentEntry, AppError> {
    let user = require_user(user, "comment")?;
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".into()));
    }
    ensure_project_exists(store, key).await?;

    let comment = Comment {
        text: text.to_string(),
        author: user.display_name.clone(),
        author_id: Some(user.user_id.clone()),
        timestamp: Some(Utc::now()),
    };
    let id = store
        .append(&StorePath::comments(key)?, to_value(&comment)?)
        .await?;

    tracing::info!(project = %key, comment_id = %id, "Comment added");
    Ok(CommentEntry { id, comment })
}

/// Comments of a project, oldest first.
pub async fn list_comments(
    store: &dyn DocumentStore,
    key: &RecordKey,
) -> Result<Vec<CommentEntry>, AppError> {
    let project = get_project(store, key).await?;
    let mut entries: Vec<CommentEntry> = project
        .record
        .comments
        .into_iter()
        .map(|(id, comment)| CommentEntry { id, comment })
        .collect();
    // Keys are time-ordered too, so they settle timestamp ties.
    entries.sort_by(|a, b| {
        a.comment
            .timestamp
            .cmp(&b.comment.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(entries)
}

/// The caller's own projects.
pub async fn owner_projects(
    store: &dyn DocumentStore,
    user: Option<&AuthenticatedUser>,
) -> Result<Vec<Listed<Project>>, AppError> {
    let user = require_user(user, "see your projects")?;
    let subtree = store.read(&StorePath::owner(&user.user_id)?).await?;
    let tree = subtree.map(|owner| {
        let mut owners = serde_json::Map::new();
        owners.insert(user.user_id.clone(), owner);
        Value::Object(owners)
    });
    Ok(listing::flatten(tree))
}

/// Axum handler for `POST /api/v1/projects`.
pub async fn create_project_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    user: MaybeUser,
    axum::Json(request): axum::Json<NewProject>,
) -> Result<(axum::http::StatusCode, axum::Json<Listed<Project>>), AppError> {
    let created = create_project(state.store.as_ref(), user.user(), request).await?;
    Ok((axum::http::StatusCode::CREATED, axum::Json(created)))
}

/// Axum handler for `GET /api/v1/projects/{owner}/{id}`.
pub async fn get_project_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    axum::extract::Path((owner_id, record_id)): axum::extract::Path<(String, String)>,
) -> Result<axum::Json<Listed<Project>>, AppError> {
    let key = RecordKey::new(owner_id, record_id);
    Ok(axum::Json(get_project(state.store.as_ref(), &key).await?))
}

/// Axum handler for `POST /api/v1/projects/{owner}/{id}/like`.
pub async fn like_project_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    user: MaybeUser,
    axum::extract::Path((owner_id, record_id)): axum::extract::Path<(String, String)>,
) -> Result<axum::Json<LikeResponse>, AppError> {
    let key = RecordKey::new(owner_id, record_id);
    Ok(axum::Json(
        like_project(state.store.as_ref(), user.user(), &key).await?,
    ))
}

/// Axum handler for `POST /api/v1/projects/{owner}/{id}/comments`.
pub async fn add_comment_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    user: MaybeUser,
    axum::extract::Path((owner_id, record_id)): axum::extract::Path<(String, String)>,
    axum::Json(request): axum::Json<NewComment>,
) -> Result<(axum::http::StatusCode, axum::Json<CommentEntry>), AppError> {
    let key = RecordKey::new(owner_id, record_id);
    let entry = comment_on_project(state.store.as_ref(), user.user(), &key, request).await?;
    Ok((axum::http::StatusCode::CREATED, axum::Json(entry)))
}

/// Axum handler for `GET /api/v1/projects/{owner}/{id}/comments`.
pub async fn list_comments_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    axum::extract::Path((owner_id, record_id)): axum::extract::Path<(String, String)>,
) -> Result<axum::Json<Vec<CommentEntry>>, AppError> {
    let key = RecordKey::new(owner_id, record_id);
    Ok(axum::Json(list_comments(state.store.as_ref(), &key).await?))
}

/// Axum handler for `GET /api/v1/me/projects`.
pub async fn my_projects_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    user: MaybeUser,
) -> Result<axum::Json<Vec<Listed<Project>>>, AppError> {
    Ok(axum::Json(
        owner_projects(state.store.as_ref(), user.user()).await?,
    ))
}
