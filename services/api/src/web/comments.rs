//! services/api/src/web/comments.rs

use crate::error::{ApiError, ApiResult};
use crate::web::access::require_task_access;
use crate::web::dto::{CommentDto, CommentQuery, CreateCommentRequest};
use crate::web::events::{broadcast, log_activity, send_notification};
use crate::web::extract::JsonBody;
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;
use workflow_core::domain::{ActivityType, NewActivity, NewNotification};
use workflow_core::realtime::RealtimeEvent;

/// GET /api/comments - Comments on a task, oldest first
#[utoipa::path(
    get,
    path = "/api/comments",
    params(CommentQuery),
    responses(
        (status = 200, description = "Comments", body = [CommentDto]),
        (status = 400, description = "taskId is required"),
        (status = 403, description = "No access")
    )
)]
pub async fn list_comments_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<CommentQuery>,
) -> ApiResult<Json<Vec<CommentDto>>> {
    let task_id = query
        .task_id
        .ok_or_else(|| ApiError::bad_request("taskId is required"))?;
    require_task_access(&state, task_id, user_id).await?;

    let comments = state.db.list_comments(task_id).await?;
    Ok(Json(comments.into_iter().map(CommentDto::from).collect()))
}

/// POST /api/comments - Comment on a task
#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentDto),
        (status = 400, description = "Content and taskId required"),
        (status = 403, description = "No access")
    )
)]
pub async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.as_deref().map(str::trim).unwrap_or_default();
    let (false, Some(task_id)) = (content.is_empty(), req.task_id) else {
        return Err(ApiError::bad_request("Content and taskId required"));
    };

    let (task, _) = require_task_access(&state, task_id, user_id).await?;
    let comment = state.db.create_comment(task_id, user_id, content).await?;
    let project_id = task.task.project_id;
    let author = comment.author.display_name();

    broadcast(
        &state,
        RealtimeEvent::CommentCreated {
            project_id,
            comment: comment.clone(),
        },
    )
    .await;
    log_activity(
        &state,
        NewActivity {
            activity_type: ActivityType::CommentAdded,
            message: format!("{} commented on \"{}\"", author, task.task.title),
            project_id,
            task_id: Some(task_id),
            user_id: Some(user_id),
        },
    )
    .await?;

    if let Some(assignee) = task.task.assigned_to_id.filter(|id| *id != user_id) {
        send_notification(
            &state,
            NewNotification {
                user_id: assignee,
                message: format!("{} commented on your task: {}", author, task.task.title),
                link: Some(format!("/projects/{}/tasks/{}", project_id, task_id)),
            },
        )
        .await?;
    }

    Ok((StatusCode::CREATED, Json(CommentDto::from(comment))))
}
