//! services/api/src/web/analytics.rs

use crate::error::ApiResult;
use crate::web::dto::AnalyticsDto;
use crate::web::state::AppState;
use axum::{extract::State, Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

/// GET /api/analytics - Task counters across the projects the caller owns
#[utoipa::path(
    get,
    path = "/api/analytics",
    responses((status = 200, description = "Task counters", body = AnalyticsDto))
)]
pub async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> ApiResult<Json<AnalyticsDto>> {
    let analytics = state.db.analytics_for_owner(user_id).await?;
    Ok(Json(analytics.into()))
}
