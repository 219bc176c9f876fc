//! crates/workflow_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status assigned to a freshly created project.
pub const DEFAULT_PROJECT_STATUS: &str = "active";

//=========================================================================================
// Users and Authentication
//=========================================================================================

/// Represents a user - used throughout the app.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The name shown in activity and notification messages.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The public part of a user, embedded in tasks, comments and activities.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

impl UserSummary {
    /// Same rule as `User::display_name`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    /// Absent for accounts that never set a password.
    pub hashed_password: Option<String>,
}

// Represents a browser login session (auth cookie or bearer token)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Projects and Membership
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when editing a project. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "OWNER",
            MemberRole::Member => "MEMBER",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(MemberRole::Owner),
            "MEMBER" => Ok(MemberRole::Member),
            _ => Err(ParseDomainError::new("member role", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

/// A membership row joined with the member's user record.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberWithUser {
    pub member: ProjectMember,
    pub user: UserSummary,
}

//=========================================================================================
// Tasks
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(ParseDomainError::new("task status", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub project_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskWithAssignee {
    pub task: Task,
    pub assigned_to: Option<UserSummary>,
}

/// The data needed to insert a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// A partial task update.
///
/// The outer `Option` says whether a field was supplied at all; for nullable
/// columns the inner `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to_id: Option<Option<Uuid>>,
}

impl TaskPatch {
    /// Applies the patch onto a task. Blank titles are ignored.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = self.title.as_ref().filter(|t| !t.trim().is_empty()) {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to_id) = self.assigned_to_id {
            task.assigned_to_id = assigned_to_id;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    #[default]
    Newest,
    Oldest,
    Due,
}

impl FromStr for TaskSort {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(TaskSort::Newest),
            "oldest" => Ok(TaskSort::Oldest),
            "due" => Ok(TaskSort::Due),
            _ => Err(ParseDomainError::new("task sort", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub project_id: Uuid,
    pub status: Option<TaskStatus>,
    pub sort: TaskSort,
}

impl TaskFilter {
    /// Builds a filter from raw query values. A status of `all` means no filter.
    pub fn parse(
        project_id: Uuid,
        status: Option<&str>,
        sort: Option<&str>,
    ) -> Result<Self, ParseDomainError> {
        let status = match status.map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(s.parse()?),
        };
        let sort = sort.map(str::parse).transpose()?.unwrap_or_default();
        Ok(Self {
            project_id,
            status,
            sort,
        })
    }
}

//=========================================================================================
// Comments
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: UserSummary,
}

//=========================================================================================
// Activities and Notifications
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    ProjectCreated,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    CommentAdded,
    MemberAdded,
    MemberRemoved,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::ProjectCreated => "PROJECT_CREATED",
            ActivityType::TaskCreated => "TASK_CREATED",
            ActivityType::TaskUpdated => "TASK_UPDATED",
            ActivityType::TaskDeleted => "TASK_DELETED",
            ActivityType::CommentAdded => "COMMENT_ADDED",
            ActivityType::MemberAdded => "MEMBER_ADDED",
            ActivityType::MemberRemoved => "MEMBER_REMOVED",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROJECT_CREATED" => Ok(ActivityType::ProjectCreated),
            "TASK_CREATED" => Ok(ActivityType::TaskCreated),
            "TASK_UPDATED" => Ok(ActivityType::TaskUpdated),
            "TASK_DELETED" => Ok(ActivityType::TaskDeleted),
            "COMMENT_ADDED" => Ok(ActivityType::CommentAdded),
            "MEMBER_ADDED" => Ok(ActivityType::MemberAdded),
            "MEMBER_REMOVED" => Ok(ActivityType::MemberRemoved),
            _ => Err(ParseDomainError::new("activity type", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: Uuid,
    pub activity_type: ActivityType,
    pub message: String,
    pub project_id: Uuid,
    pub task_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A task reference carried by activity listings.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityWithRefs {
    pub activity: Activity,
    pub user: Option<UserSummary>,
    pub task: Option<TaskRef>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub activity_type: ActivityType,
    pub message: String,
    pub project_id: Uuid,
    pub task_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub message: String,
    pub link: Option<String>,
}

//=========================================================================================
// Analytics
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analytics {
    pub total_tasks: i64,
    pub completed: i64,
    pub pending: i64,
    pub tasks_by_project: Vec<(Uuid, i64)>,
    /// Unassigned tasks are grouped under `None`.
    pub tasks_by_user: Vec<(Option<Uuid>, i64)>,
}

//=========================================================================================
// Parse Errors
//=========================================================================================

/// Returned when a wire string does not name a known domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseDomainError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseDomainError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Write docs".to_string(),
            description: Some("draft".to_string()),
            status: TaskStatus::Todo,
            project_id: Uuid::new_v4(),
            assigned_to_id: Some(Uuid::new_v4()),
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn task_status_accepts_both_separators() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("In-Progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("DONE".parse::<TaskStatus>(), Ok(TaskStatus::Done));
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn filter_treats_all_as_no_status() {
        let project_id = Uuid::new_v4();
        let filter = TaskFilter::parse(project_id, Some("all"), None).unwrap();
        assert_eq!(filter.status, None);
        assert_eq!(filter.sort, TaskSort::Newest);

        let filter = TaskFilter::parse(project_id, Some("done"), Some("due")).unwrap();
        assert_eq!(filter.status, Some(TaskStatus::Done));
        assert_eq!(filter.sort, TaskSort::Due);

        assert!(TaskFilter::parse(project_id, None, Some("sideways")).is_err());
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user = User {
            id: Uuid::new_v4(),
            name: None,
            email: "ana@example.com".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name(), "ana@example.com");
        assert_eq!(user.summary().display_name(), "ana@example.com");

        let named = UserSummary {
            name: Some("Ana".to_string()),
            ..user.summary()
        };
        assert_eq!(named.display_name(), "Ana");
    }

    #[test]
    fn patch_leaves_absent_fields_alone() {
        let mut task = sample_task();
        let before = task.clone();
        TaskPatch::default().apply(&mut task);
        assert_eq!(task, before);
    }

    #[test]
    fn patch_clears_nullable_fields_and_ignores_blank_title() {
        let mut task = sample_task();
        let patch = TaskPatch {
            title: Some("   ".to_string()),
            description: Some(None),
            status: Some(TaskStatus::Done),
            assigned_to_id: Some(None),
            ..Default::default()
        };
        patch.apply(&mut task);
        assert_eq!(task.title, "Write docs");
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.assigned_to_id, None);
    }

    #[test]
    fn activity_type_round_trips_through_wire_name() {
        for ty in [
            ActivityType::ProjectCreated,
            ActivityType::TaskDeleted,
            ActivityType::MemberRemoved,
        ] {
            assert_eq!(ty.as_str().parse::<ActivityType>(), Ok(ty));
        }
    }
}
