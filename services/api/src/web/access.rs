//! services/api/src/web/access.rs
//!
//! Project-level authorization shared by the REST handlers and the realtime
//! subscription path. A user may access a project they own or belong to.

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use uuid::Uuid;
use workflow_core::domain::{MemberRole, Project, TaskWithAssignee};

/// The caller's role in `project`, if any. Owners count even without a membership row.
pub async fn role_in(
    state: &AppState,
    project: &Project,
    user_id: Uuid,
) -> ApiResult<Option<MemberRole>> {
    if project.owner_id == user_id {
        return Ok(Some(MemberRole::Owner));
    }
    Ok(state
        .db
        .get_membership(project.id, user_id)
        .await?
        .map(|m| m.role))
}

/// Loads the project, failing with 403 unless the caller owns or belongs to it.
pub async fn require_project_access(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> ApiResult<Project> {
    let project = state.db.get_project(project_id).await?;
    match role_in(state, &project, user_id).await? {
        Some(_) => Ok(project),
        None => Err(ApiError::forbidden("You do not have access to this project")),
    }
}

/// Loads the project, failing with 403 unless the caller owns it.
pub async fn require_project_owner(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> ApiResult<Project> {
    let project = state.db.get_project(project_id).await?;
    if project.owner_id == user_id {
        Ok(project)
    } else {
        Err(ApiError::forbidden("Only the project owner can do that"))
    }
}

/// Loads a task and its project, failing with 403 unless the caller can access the project.
pub async fn require_task_access(
    state: &AppState,
    task_id: Uuid,
    user_id: Uuid,
) -> ApiResult<(TaskWithAssignee, Project)> {
    let task = state.db.get_task(task_id).await?;
    let project = state.db.get_project(task.task.project_id).await?;
    match role_in(state, &project, user_id).await? {
        Some(_) => Ok((task, project)),
        None => Err(ApiError::forbidden("You do not have access to this task")),
    }
}

/// Rejects assignees who are not part of the project.
pub async fn require_assignable(
    state: &AppState,
    project: &Project,
    assignee: Option<Uuid>,
) -> ApiResult<()> {
    let Some(assignee) = assignee else {
        return Ok(());
    };
    match role_in(state, project, assignee).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::bad_request(
            "Assignee is not a member of this project",
        )),
    }
}

/// Whether the caller may read `project_id`. Missing projects simply deny.
pub async fn can_access_project(state: &AppState, project_id: Uuid, user_id: Uuid) -> bool {
    match state.db.get_project(project_id).await {
        Ok(project) => matches!(role_in(state, &project, user_id).await, Ok(Some(_))),
        Err(_) => false,
    }
}
