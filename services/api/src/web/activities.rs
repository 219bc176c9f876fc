//! services/api/src/web/activities.rs

use crate::error::{ApiError, ApiResult};
use crate::web::access::require_project_access;
use crate::web::dto::{ActivityDto, ProjectQuery};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// GET /api/activities - A project's activity feed, newest first
#[utoipa::path(
    get,
    path = "/api/activities",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Activity feed", body = [ActivityDto]),
        (status = 400, description = "Project ID required"),
        (status = 403, description = "No access")
    )
)]
pub async fn list_activities_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<Vec<ActivityDto>>> {
    let project_id = query
        .project_id
        .ok_or_else(|| ApiError::bad_request("Project ID required"))?;
    require_project_access(&state, project_id, user_id).await?;

    let activities = state.db.list_activities(project_id).await?;
    Ok(Json(activities.into_iter().map(ActivityDto::from).collect()))
}
