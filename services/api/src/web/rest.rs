//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use crate::web::{
    activities, analytics, auth, comments, dto, notifications, projects, tasks, ws_handler,
};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::forgot_password_handler,
        auth::reset_password_handler,
        projects::list_projects_handler,
        projects::create_project_handler,
        projects::update_project_handler,
        projects::delete_project_handler,
        projects::membership_handler,
        projects::list_members_handler,
        projects::add_member_handler,
        projects::remove_member_handler,
        tasks::list_tasks_handler,
        tasks::create_task_handler,
        tasks::get_task_handler,
        tasks::patch_task_handler,
        tasks::delete_task_handler,
        comments::list_comments_handler,
        comments::create_comment_handler,
        activities::list_activities_handler,
        notifications::list_notifications_handler,
        notifications::mark_read_handler,
        analytics::analytics_handler,
        ws_handler::ws_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::ForgotPasswordRequest,
            auth::ResetPasswordRequest,
            dto::UserDto,
            dto::ProjectDto,
            dto::MemberDto,
            dto::MembershipDto,
            dto::TaskDto,
            dto::CommentDto,
            dto::TaskRefDto,
            dto::ActivityDto,
            dto::NotificationDto,
            dto::ProjectCountDto,
            dto::AssigneeCountDto,
            dto::AnalyticsDto,
            dto::SuccessDto,
            dto::MarkReadResponse,
            dto::MessageDto,
            dto::CreateProjectRequest,
            dto::UpdateProjectRequest,
            dto::AddMemberRequest,
            dto::CreateTaskRequest,
            dto::PatchTaskRequest,
            dto::CreateCommentRequest,
            dto::MarkReadRequest,
        )
    ),
    tags(
        (name = "Workflow API", description = "Projects, tasks, comments and realtime updates for teams.")
    )
)]
pub struct ApiDoc;
