//! crates/workflow_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases,
//! realtime transports or mail delivery.

use crate::domain::{
    ActivityWithRefs, Analytics, CommentWithAuthor, MemberRole, MemberWithUser, NewActivity,
    NewNotification, NewTask, Notification, Project, ProjectMember, ProjectUpdate, Task,
    TaskFilter, TaskPatch, TaskWithAssignee, User, UserCredentials,
};
use crate::realtime::RealtimeEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(
        &self,
        name: Option<&str>,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Password Reset ---
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Replaces the password of the user holding an unexpired `token` and
    /// clears the token. Fails with `NotFound` for unknown or expired tokens.
    async fn reset_password(
        &self,
        token: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<Uuid>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user, or `Unauthorized` for missing and expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Projects ---
    /// Creates the project together with the owner's `OWNER` membership.
    async fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Project>;

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project>;

    /// Projects the user owns or is a member of, newest first.
    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>>;

    async fn update_project(&self, project_id: Uuid, update: &ProjectUpdate)
        -> PortResult<Project>;

    /// Removes the project and everything hanging off it.
    async fn delete_project(&self, project_id: Uuid) -> PortResult<()>;

    // --- Membership ---
    async fn get_membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<ProjectMember>>;

    async fn list_members(&self, project_id: Uuid) -> PortResult<Vec<MemberWithUser>>;

    /// Fails with `Conflict` when the user already belongs to the project.
    async fn add_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> PortResult<ProjectMember>;

    async fn get_member(&self, member_id: Uuid) -> PortResult<ProjectMember>;

    async fn remove_member(&self, member_id: Uuid) -> PortResult<()>;

    // --- Tasks ---
    async fn create_task(&self, task: NewTask) -> PortResult<TaskWithAssignee>;

    async fn get_task(&self, task_id: Uuid) -> PortResult<TaskWithAssignee>;

    async fn list_tasks(&self, filter: &TaskFilter) -> PortResult<Vec<TaskWithAssignee>>;

    async fn update_task(&self, task_id: Uuid, patch: &TaskPatch)
        -> PortResult<TaskWithAssignee>;

    /// Deletes the task and its comments, returning the removed row.
    async fn delete_task(&self, task_id: Uuid) -> PortResult<Task>;

    // --- Comments ---
    async fn create_comment(
        &self,
        task_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> PortResult<CommentWithAuthor>;

    /// Comments on a task, oldest first.
    async fn list_comments(&self, task_id: Uuid) -> PortResult<Vec<CommentWithAuthor>>;

    // --- Activities ---
    async fn create_activity(&self, activity: NewActivity) -> PortResult<ActivityWithRefs>;

    /// The project's activity feed, newest first.
    async fn list_activities(&self, project_id: Uuid) -> PortResult<Vec<ActivityWithRefs>>;

    // --- Notifications ---
    async fn create_notification(&self, notification: NewNotification)
        -> PortResult<Notification>;

    /// The user's notifications, newest first.
    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<Notification>>;

    /// Marks the given notifications read, ignoring ids owned by someone else.
    /// Returns the number of rows touched.
    async fn mark_notifications_read(&self, user_id: Uuid, ids: &[Uuid]) -> PortResult<u64>;

    // --- Analytics ---
    /// Task counters over every project owned by `owner_id`.
    async fn analytics_for_owner(&self, owner_id: Uuid) -> PortResult<Analytics>;
}

#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Hands an event to the transport. There is no delivery guarantee; an
    /// error only means the transport refused it.
    async fn publish(&self, event: RealtimeEvent) -> PortResult<()>;
}

/// A message handed to the mail transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait MailService: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> PortResult<()>;
}
