//! services/api/src/web/notifications.rs

use crate::error::ApiResult;
use crate::web::dto::{MarkReadRequest, MarkReadResponse, NotificationDto};
use crate::web::extract::JsonBody;
use crate::web::state::AppState;
use axum::{extract::State, Extension, Json};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// GET /api/notifications - The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses((status = 200, description = "Notifications", body = [NotificationDto]))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> ApiResult<Json<Vec<NotificationDto>>> {
    let notifications = state.db.list_notifications(user_id).await?;
    Ok(Json(notifications.into_iter().map(NotificationDto::from).collect()))
}

/// PATCH /api/notifications - Mark notifications read
///
/// Ids belonging to other users are ignored.
#[utoipa::path(
    patch,
    path = "/api/notifications",
    request_body = MarkReadRequest,
    responses((status = 200, description = "Notifications marked", body = MarkReadResponse))
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    JsonBody(req): JsonBody<MarkReadRequest>,
) -> ApiResult<Json<MarkReadResponse>> {
    let updated = state.db.mark_notifications_read(user_id, &req.ids).await?;
    debug!("Marked {} of {} notifications read for {}", updated, req.ids.len(), user_id);
    Ok(Json(MarkReadResponse {
        success: true,
        updated,
    }))
}
