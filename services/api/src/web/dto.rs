//! services/api/src/web/dto.rs
//!
//! JSON shapes exchanged with clients, and their conversions from the core
//! domain types. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use workflow_core::domain::{
    ActivityWithRefs, Analytics, CommentWithAuthor, MemberWithUser, Notification, Project,
    ProjectMember, Task, TaskWithAssignee, UserSummary,
};
use workflow_core::realtime::RealtimeEvent;

//=========================================================================================
// Response Payloads
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

impl From<UserSummary> for UserDto {
    fn from(u: UserSummary) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectDto {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            status: p.status,
            owner_id: p.owner_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub user: UserDto,
}

impl MemberDto {
    pub fn new(member: ProjectMember, user: UserSummary) -> Self {
        Self {
            id: member.id,
            project_id: member.project_id,
            user_id: member.user_id,
            role: member.role.to_string(),
            created_at: member.created_at,
            user: user.into(),
        }
    }
}

impl From<MemberWithUser> for MemberDto {
    fn from(m: MemberWithUser) -> Self {
        Self::new(m.member, m.user)
    }
}

/// Whether the caller belongs to a project, and in which role.
#[derive(Debug, Serialize, ToSchema)]
pub struct MembershipDto {
    pub role: Option<String>,
    pub allowed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub project_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_to: Option<UserDto>,
}

impl From<Task> for TaskDto {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            status: t.status.to_string(),
            project_id: t.project_id,
            assigned_to_id: t.assigned_to_id,
            due_date: t.due_date,
            created_at: t.created_at,
            updated_at: t.updated_at,
            assigned_to: None,
        }
    }
}

impl From<TaskWithAssignee> for TaskDto {
    fn from(t: TaskWithAssignee) -> Self {
        Self {
            assigned_to: t.assigned_to.map(UserDto::from),
            ..Self::from(t.task)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: Uuid,
    pub content: String,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub author: UserDto,
}

impl From<CommentWithAuthor> for CommentDto {
    fn from(c: CommentWithAuthor) -> Self {
        Self {
            id: c.comment.id,
            content: c.comment.content,
            task_id: c.comment.task_id,
            author_id: c.comment.author_id,
            created_at: c.comment.created_at,
            author: c.author.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskRefDto {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub message: String,
    pub project_id: Uuid,
    pub task_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub user: Option<UserDto>,
    pub task: Option<TaskRefDto>,
}

impl From<ActivityWithRefs> for ActivityDto {
    fn from(a: ActivityWithRefs) -> Self {
        Self {
            id: a.activity.id,
            activity_type: a.activity.activity_type.to_string(),
            message: a.activity.message,
            project_id: a.activity.project_id,
            task_id: a.activity.task_id,
            user_id: a.activity.user_id,
            created_at: a.activity.created_at,
            user: a.user.map(UserDto::from),
            task: a.task.map(|t| TaskRefDto {
                id: t.id,
                title: t.title,
            }),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            message: n.message,
            link: n.link,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCountDto {
    pub project_id: Uuid,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeCountDto {
    pub assigned_to_id: Option<Uuid>,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDto {
    pub total_tasks: i64,
    pub completed: i64,
    pub pending: i64,
    pub tasks_by_project: Vec<ProjectCountDto>,
    pub tasks_by_user: Vec<AssigneeCountDto>,
}

impl From<Analytics> for AnalyticsDto {
    fn from(a: Analytics) -> Self {
        Self {
            total_tasks: a.total_tasks,
            completed: a.completed,
            pending: a.pending,
            tasks_by_project: a
                .tasks_by_project
                .into_iter()
                .map(|(project_id, count)| ProjectCountDto { project_id, count })
                .collect(),
            tasks_by_user: a
                .tasks_by_user
                .into_iter()
                .map(|(assigned_to_id, count)| AssigneeCountDto {
                    assigned_to_id,
                    count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessDto {
    pub success: bool,
}

impl SuccessDto {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkReadResponse {
    pub success: bool,
    pub updated: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageDto {
    pub message: String,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// A partial task update. Omitted fields stay as they are; `null` clears
/// `description`, `dueDate` and `assignedToId`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub assigned_to_id: Option<Option<Uuid>>,
}

/// Marks a field as supplied, even when its value is `null`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub task_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
    /// `todo`, `in_progress`, `done` or `all`.
    pub status: Option<String>,
    /// `newest` (default), `oldest` or `due`.
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProjectQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CommentQuery {
    pub task_id: Option<Uuid>,
}

//=========================================================================================
// Realtime Payloads
//=========================================================================================

/// The JSON body delivered with a realtime event.
pub fn event_payload(event: &RealtimeEvent) -> serde_json::Result<Value> {
    match event {
        RealtimeEvent::TaskCreated(t) | RealtimeEvent::TaskUpdated(t) => {
            serde_json::to_value(TaskDto::from(t.clone()))
        }
        RealtimeEvent::TaskDeleted(t) => serde_json::to_value(TaskDto::from(t.clone())),
        RealtimeEvent::CommentCreated { comment, .. } => {
            serde_json::to_value(CommentDto::from(comment.clone()))
        }
        RealtimeEvent::ActivityCreated(a) => serde_json::to_value(ActivityDto::from(a.clone())),
        RealtimeEvent::NotificationCreated(n) => {
            serde_json::to_value(NotificationDto::from(n.clone()))
        }
    }
}
