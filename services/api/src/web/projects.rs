//! services/api/src/web/projects.rs
//!
//! Project CRUD and membership management.

use crate::error::{ApiError, ApiResult};
use crate::web::access::{require_project_access, require_project_owner, role_in};
use crate::web::dto::{
    AddMemberRequest, CreateProjectRequest, MemberDto, MembershipDto, ProjectDto, SuccessDto,
    UpdateProjectRequest,
};
use crate::web::events::{log_activity, send_notification};
use crate::web::extract::JsonBody;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use workflow_core::domain::{ActivityType, MemberRole, NewActivity, NewNotification, ProjectUpdate};
use workflow_core::ports::PortError;

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /api/projects - Projects the caller owns or belongs to
#[utoipa::path(
    get,
    path = "/api/projects",
    responses((status = 200, description = "Visible projects", body = [ProjectDto]))
)]
pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> ApiResult<Json<Vec<ProjectDto>>> {
    let projects = state.db.list_projects_for_user(user_id).await?;
    Ok(Json(projects.into_iter().map(ProjectDto::from).collect()))
}

/// POST /api/projects - Create a project owned by the caller
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectDto),
        (status = 400, description = "Name missing")
    )
)]
pub async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    JsonBody(req): JsonBody<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let name =
        non_blank(req.name).ok_or_else(|| ApiError::bad_request("Project name required"))?;
    let description = non_blank(req.description);

    let actor = state.db.get_user_by_id(user_id).await?;
    let project = state
        .db
        .create_project(user_id, &name, description.as_deref())
        .await?;
    info!("Project {} created by {}", project.id, user_id);

    log_activity(
        &state,
        NewActivity {
            activity_type: ActivityType::ProjectCreated,
            message: format!(
                "Project \"{}\" was created by {}",
                project.name,
                actor.display_name()
            ),
            project_id: project.id,
            task_id: None,
            user_id: Some(user_id),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ProjectDto::from(project))))
}

/// PUT /api/projects/{id} - Edit a project (owner only)
#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    request_body = UpdateProjectRequest,
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project updated", body = ProjectDto),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "No such project")
    )
)]
pub async fn update_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(project_id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectDto>> {
    require_project_owner(&state, project_id, user_id).await?;

    if matches!(&req.name, Some(name) if name.trim().is_empty()) {
        return Err(ApiError::bad_request("Project name cannot be empty"));
    }
    let update = ProjectUpdate {
        name: non_blank(req.name),
        description: req.description,
        status: non_blank(req.status),
    };
    let project = state.db.update_project(project_id, &update).await?;
    Ok(Json(project.into()))
}

/// DELETE /api/projects/{id} - Delete a project and everything in it (owner only)
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project deleted", body = SuccessDto),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "No such project")
    )
)]
pub async fn delete_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<SuccessDto>> {
    require_project_owner(&state, project_id, user_id).await?;
    state.db.delete_project(project_id).await?;
    info!("Project {} deleted by {}", project_id, user_id);
    Ok(Json(SuccessDto::ok()))
}

/// GET /api/projects/{id}/membership - The caller's role in a project
#[utoipa::path(
    get,
    path = "/api/projects/{id}/membership",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Membership", body = MembershipDto))
)]
pub async fn membership_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<MembershipDto>> {
    let role = match state.db.get_project(project_id).await {
        Ok(project) => role_in(&state, &project, user_id).await?,
        Err(PortError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };
    Ok(Json(MembershipDto {
        role: role.map(|r| r.to_string()),
        allowed: role.is_some(),
    }))
}

/// GET /api/projects/{id}/members - Everyone on a project
#[utoipa::path(
    get,
    path = "/api/projects/{id}/members",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Members", body = [MemberDto]),
        (status = 403, description = "No access")
    )
)]
pub async fn list_members_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberDto>>> {
    require_project_access(&state, project_id, user_id).await?;
    let members = state.db.list_members(project_id).await?;
    Ok(Json(members.into_iter().map(MemberDto::from).collect()))
}

/// POST /api/projects/{id}/members - Add a user by email (owner only)
#[utoipa::path(
    post,
    path = "/api/projects/{id}/members",
    request_body = AddMemberRequest,
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 201, description = "Member added", body = MemberDto),
        (status = 404, description = "No such user"),
        (status = 409, description = "Already a member")
    )
)]
pub async fn add_member_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(project_id): Path<Uuid>,
    JsonBody(req): JsonBody<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let project = require_project_owner(&state, project_id, user_id).await?;
    let email = non_blank(req.email)
        .map(|e| e.to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    let invitee = match state.db.get_user_by_email(&email).await {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => return Err(ApiError::not_found("User not found")),
        Err(e) => return Err(e.into()),
    };
    let actor = state.db.get_user_by_id(user_id).await?;
    let member = state
        .db
        .add_member(project_id, invitee.id, MemberRole::Member)
        .await?;

    log_activity(
        &state,
        NewActivity {
            activity_type: ActivityType::MemberAdded,
            message: format!(
                "{} was added to the project by {}",
                invitee.display_name(),
                actor.display_name()
            ),
            project_id,
            task_id: None,
            user_id: Some(user_id),
        },
    )
    .await?;
    send_notification(
        &state,
        NewNotification {
            user_id: invitee.id,
            message: format!(
                "{} added you to the project: {}",
                actor.display_name(),
                project.name
            ),
            link: Some(format!("/projects/{}", project_id)),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MemberDto::new(member, invitee.summary())),
    ))
}

/// DELETE /api/projects/{id}/members/{member_id} - Remove a member
///
/// The owner may remove anyone but themselves; members may remove themselves.
#[utoipa::path(
    delete,
    path = "/api/projects/{id}/members/{member_id}",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("member_id" = Uuid, Path, description = "Membership id")
    ),
    responses(
        (status = 200, description = "Member removed", body = SuccessDto),
        (status = 400, description = "Cannot remove project owner"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn remove_member_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SuccessDto>> {
    let project = state.db.get_project(project_id).await?;

    let member = match state.db.get_member(member_id).await {
        Ok(member) if member.project_id == project_id => member,
        Ok(_) | Err(PortError::NotFound(_)) => return Err(ApiError::not_found("Member not found")),
        Err(e) => return Err(e.into()),
    };
    if project.owner_id != user_id && member.user_id != user_id {
        return Err(ApiError::forbidden("Only the project owner can remove members"));
    }
    if member.role == MemberRole::Owner {
        return Err(ApiError::bad_request("Cannot remove project owner"));
    }

    state.db.remove_member(member_id).await?;

    let removed = state.db.get_user_by_id(member.user_id).await?;
    let message = if member.user_id == user_id {
        format!("{} left the project", removed.display_name())
    } else {
        let actor = state.db.get_user_by_id(user_id).await?;
        format!(
            "{} was removed from the project by {}",
            removed.display_name(),
            actor.display_name()
        )
    };
    log_activity(
        &state,
        NewActivity {
            activity_type: ActivityType::MemberRemoved,
            message,
            project_id,
            task_id: None,
            user_id: Some(user_id),
        },
    )
    .await?;

    Ok(Json(SuccessDto::ok()))
}
