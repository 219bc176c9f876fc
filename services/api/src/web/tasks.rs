//! services/api/src/web/tasks.rs
//!
//! Task endpoints. Every write records an activity and publishes the matching
//! realtime event on the project's channel.

use crate::error::{ApiError, ApiResult};
use crate::web::access::{require_assignable, require_project_access, require_task_access};
use crate::web::dto::{CreateTaskRequest, PatchTaskRequest, SuccessDto, TaskDto, TaskQuery};
use crate::web::events::{broadcast, log_activity, send_notification};
use crate::web::extract::JsonBody;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;
use workflow_core::domain::{
    ActivityType, NewActivity, NewNotification, NewTask, TaskFilter, TaskPatch, TaskStatus,
    TaskWithAssignee, User,
};
use workflow_core::realtime::RealtimeEvent;

fn task_link(task: &TaskWithAssignee) -> String {
    format!("/projects/{}/tasks/{}", task.task.project_id, task.task.id)
}

/// Tells the assignee about a task, unless they assigned it to themselves.
async fn notify_assignee(
    state: &AppState,
    task: &TaskWithAssignee,
    actor: &User,
) -> ApiResult<()> {
    match task.task.assigned_to_id {
        Some(assignee) if assignee != actor.id => {
            send_notification(
                state,
                NewNotification {
                    user_id: assignee,
                    message: format!(
                        "{} assigned you a task: {}",
                        actor.display_name(),
                        task.task.title
                    ),
                    link: Some(task_link(task)),
                },
            )
            .await?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// GET /api/tasks - Tasks of a project, optionally filtered and sorted
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "Tasks", body = [TaskDto]),
        (status = 400, description = "Project ID missing or bad filter"),
        (status = 403, description = "No access")
    )
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<TaskDto>>> {
    let project_id = query
        .project_id
        .ok_or_else(|| ApiError::bad_request("Project ID required"))?;
    let filter = TaskFilter::parse(project_id, query.status.as_deref(), query.sort.as_deref())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    require_project_access(&state, project_id, user_id).await?;
    let tasks = state.db.list_tasks(&filter).await?;
    Ok(Json(tasks.into_iter().map(TaskDto::from).collect()))
}

/// POST /api/tasks - Create a task
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskDto),
        (status = 400, description = "Title and projectId required"),
        (status = 403, description = "No access")
    )
)]
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.as_deref().map(str::trim).unwrap_or_default();
    let (false, Some(project_id)) = (title.is_empty(), req.project_id) else {
        return Err(ApiError::bad_request("Title and projectId required"));
    };

    let project = require_project_access(&state, project_id, user_id).await?;
    require_assignable(&state, &project, req.assigned_to_id).await?;
    let actor = state.db.get_user_by_id(user_id).await?;

    let task = state
        .db
        .create_task(NewTask {
            title: title.to_string(),
            description: req.description.filter(|d| !d.trim().is_empty()),
            project_id,
            assigned_to_id: req.assigned_to_id,
            due_date: req.due_date,
        })
        .await?;

    broadcast(&state, RealtimeEvent::TaskCreated(task.clone())).await;
    log_activity(
        &state,
        NewActivity {
            activity_type: ActivityType::TaskCreated,
            message: format!(
                "Task \"{}\" was created by {}",
                task.task.title,
                actor.display_name()
            ),
            project_id,
            task_id: Some(task.task.id),
            user_id: Some(user_id),
        },
    )
    .await?;
    notify_assignee(&state, &task, &actor).await?;

    Ok((StatusCode::CREATED, Json(TaskDto::from(task))))
}

/// GET /api/tasks/{id} - One task
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = TaskDto),
        (status = 403, description = "No access"),
        (status = 404, description = "No such task")
    )
)]
pub async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskDto>> {
    let (task, _) = require_task_access(&state, task_id, user_id).await?;
    Ok(Json(task.into()))
}

/// PATCH /api/tasks/{id} - Partially update a task
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    request_body = PatchTaskRequest,
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task updated", body = TaskDto),
        (status = 400, description = "Bad status or assignee"),
        (status = 403, description = "No access"),
        (status = 404, description = "No such task")
    )
)]
pub async fn patch_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(task_id): Path<Uuid>,
    JsonBody(req): JsonBody<PatchTaskRequest>,
) -> ApiResult<Json<TaskDto>> {
    let (_, project) = require_task_access(&state, task_id, user_id).await?;

    let status = req
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if let Some(assignee) = req.assigned_to_id {
        require_assignable(&state, &project, assignee).await?;
    }
    let patch = TaskPatch {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        status,
        due_date: req.due_date,
        assigned_to_id: req.assigned_to_id,
    };

    let actor = state.db.get_user_by_id(user_id).await?;
    let task = state.db.update_task(task_id, &patch).await?;

    notify_assignee(&state, &task, &actor).await?;
    log_activity(
        &state,
        NewActivity {
            activity_type: ActivityType::TaskUpdated,
            message: format!(
                "Task \"{}\" was updated by {}",
                task.task.title,
                actor.display_name()
            ),
            project_id: task.task.project_id,
            task_id: Some(task.task.id),
            user_id: Some(user_id),
        },
    )
    .await?;
    broadcast(&state, RealtimeEvent::TaskUpdated(task.clone())).await;

    Ok(Json(task.into()))
}

/// DELETE /api/tasks/{id} - Delete a task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = SuccessDto),
        (status = 403, description = "No access"),
        (status = 404, description = "No such task")
    )
)]
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<SuccessDto>> {
    require_task_access(&state, task_id, user_id).await?;
    let actor = state.db.get_user_by_id(user_id).await?;
    let deleted = state.db.delete_task(task_id).await?;

    // The row is gone, so the activity cannot reference it.
    log_activity(
        &state,
        NewActivity {
            activity_type: ActivityType::TaskDeleted,
            message: format!(
                "Task \"{}\" was deleted by {}",
                deleted.title,
                actor.display_name()
            ),
            project_id: deleted.project_id,
            task_id: None,
            user_id: Some(user_id),
        },
    )
    .await?;
    broadcast(&state, RealtimeEvent::TaskDeleted(deleted)).await;

    Ok(Json(SuccessDto::ok()))
}
