//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use workflow_core::domain::{
    Activity, ActivityWithRefs, Analytics, Comment, CommentWithAuthor, MemberRole,
    MemberWithUser, NewActivity, NewNotification, NewTask, Notification, Project, ProjectMember,
    ProjectUpdate, Task, TaskFilter, TaskPatch, TaskRef, TaskSort, TaskWithAssignee, User,
    UserCredentials, UserSummary, DEFAULT_PROJECT_STATUS,
};
use workflow_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Translates a `sqlx` failure into a port error, naming the missing item for
/// `RowNotFound` and mapping constraint violations to client errors.
fn port_err(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        sqlx::Error::Database(ref db) => match db.code().as_deref() {
            // unique_violation
            Some("23505") => PortError::Conflict(db.message().to_string()),
            // foreign_key_violation
            Some("23503") => PortError::Invalid(db.message().to_string()),
            _ => PortError::Unexpected(e.to_string()),
        },
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn corrupt<E: std::fmt::Display>(e: E) -> PortError {
    PortError::Unexpected(format!("corrupt row: {}", e))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: Option<String>,
    email: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    name: Option<String>,
    email: String,
    password_hash: Option<String>,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            name: self.name,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProjectRecord {
    fn to_domain(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
            description: self.description,
            status: self.status,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MemberRecord {
    id: Uuid,
    project_id: Uuid,
    user_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
}
impl MemberRecord {
    fn to_domain(self) -> PortResult<ProjectMember> {
        Ok(ProjectMember {
            id: self.id,
            project_id: self.project_id,
            user_id: self.user_id,
            role: self.role.parse().map_err(corrupt)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct MemberWithUserRecord {
    #[sqlx(flatten)]
    member: MemberRecord,
    user_name: Option<String>,
    user_email: String,
}
impl MemberWithUserRecord {
    fn to_domain(self) -> PortResult<MemberWithUser> {
        let user = UserSummary {
            id: self.member.user_id,
            name: self.user_name,
            email: self.user_email,
        };
        Ok(MemberWithUser {
            member: self.member.to_domain()?,
            user,
        })
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    project_id: Uuid,
    assigned_to_id: Option<Uuid>,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl TaskRecord {
    fn to_domain(self) -> PortResult<Task> {
        Ok(Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status: self.status.parse().map_err(corrupt)?,
            project_id: self.project_id,
            assigned_to_id: self.assigned_to_id,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TaskWithAssigneeRecord {
    #[sqlx(flatten)]
    task: TaskRecord,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}
impl TaskWithAssigneeRecord {
    fn to_domain(self) -> PortResult<TaskWithAssignee> {
        let assigned_to = match (self.task.assigned_to_id, self.assignee_email) {
            (Some(id), Some(email)) => Some(UserSummary {
                id,
                name: self.assignee_name,
                email,
            }),
            _ => None,
        };
        Ok(TaskWithAssignee {
            task: self.task.to_domain()?,
            assigned_to,
        })
    }
}

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    content: String,
    task_id: Uuid,
    author_id: Uuid,
    created_at: DateTime<Utc>,
    author_name: Option<String>,
    author_email: String,
}
impl CommentRecord {
    fn to_domain(self) -> CommentWithAuthor {
        CommentWithAuthor {
            author: UserSummary {
                id: self.author_id,
                name: self.author_name,
                email: self.author_email,
            },
            comment: Comment {
                id: self.id,
                content: self.content,
                task_id: self.task_id,
                author_id: self.author_id,
                created_at: self.created_at,
            },
        }
    }
}

#[derive(FromRow)]
struct ActivityRecord {
    id: Uuid,
    activity_type: String,
    message: String,
    project_id: Uuid,
    task_id: Option<Uuid>,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
    task_title: Option<String>,
}
impl ActivityRecord {
    fn to_domain(self) -> PortResult<ActivityWithRefs> {
        let user = match (self.user_id, self.user_email) {
            (Some(id), Some(email)) => Some(UserSummary {
                id,
                name: self.user_name,
                email,
            }),
            _ => None,
        };
        let task = match (self.task_id, self.task_title) {
            (Some(id), Some(title)) => Some(TaskRef { id, title }),
            _ => None,
        };
        Ok(ActivityWithRefs {
            activity: Activity {
                id: self.id,
                activity_type: self.activity_type.parse().map_err(corrupt)?,
                message: self.message,
                project_id: self.project_id,
                task_id: self.task_id,
                user_id: self.user_id,
                created_at: self.created_at,
            },
            user,
            task,
        })
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    message: String,
    link: Option<String>,
    read: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            user_id: self.user_id,
            message: self.message,
            link: self.link,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Shared SQL Fragments
//=========================================================================================

const PROJECT_COLUMNS: &str = "id, name, description, status, owner_id, created_at, updated_at";

const MEMBER_COLUMNS: &str = "id, project_id, user_id, role, created_at";

/// Selects from a relation named `t` shaped like `tasks`, joined to the assignee.
const TASK_FROM_T: &str = "SELECT t.id, t.title, t.description, t.status, t.project_id, \
     t.assigned_to_id, t.due_date, t.created_at, t.updated_at, \
     u.name AS assignee_name, u.email AS assignee_email \
     FROM t LEFT JOIN users u ON u.id = t.assigned_to_id";

/// Selects from a relation named `c` shaped like `comments`, joined to the author.
const COMMENT_FROM_C: &str = "SELECT c.id, c.content, c.task_id, c.author_id, c.created_at, \
     u.name AS author_name, u.email AS author_email \
     FROM c JOIN users u ON u.id = c.author_id";

/// Selects from a relation named `a` shaped like `activities`, joined to its refs.
const ACTIVITY_FROM_A: &str = "SELECT a.id, a.activity_type, a.message, a.project_id, \
     a.task_id, a.user_id, a.created_at, \
     u.name AS user_name, u.email AS user_email, tk.title AS task_title \
     FROM a LEFT JOIN users u ON u.id = a.user_id \
     LEFT JOIN tasks tk ON tk.id = a.task_id";

const NOTIFICATION_COLUMNS: &str = "id, user_id, message, link, read, created_at";

fn task_order(sort: TaskSort) -> &'static str {
    match sort {
        TaskSort::Newest => "t.created_at DESC",
        TaskSort::Oldest => "t.created_at ASC",
        TaskSort::Due => "t.due_date ASC NULLS LAST, t.created_at DESC",
    }
}

impl DbAdapter {
    async fn fetch_task(&self, task_id: Uuid) -> PortResult<TaskWithAssignee> {
        let sql = format!("WITH t AS (SELECT * FROM tasks WHERE id = $1) {TASK_FROM_T}");
        sqlx::query_as::<_, TaskWithAssigneeRecord>(&sql)
            .bind(task_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, || format!("Task {} not found", task_id)))?
            .to_domain()
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        name: Option<&str>,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match port_err(e, String::new) {
            PortError::Conflict(_) => PortError::Conflict("Email already registered".to_string()),
            other => other,
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_err(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_err(e, || format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, name, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_err(e, || format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expiry = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "UPDATE users SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL \
             WHERE reset_token = $1 AND reset_token_expiry > $3 RETURNING id",
        )
        .bind(token)
        .bind(hashed_password)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound("Invalid or expired token".to_string()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Project> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "INSERT INTO projects (id, name, description, status, owner_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PROJECT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(description)
            .bind(DEFAULT_PROJECT_STATUS)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| port_err(e, String::new))?;

        sqlx::query(
            "INSERT INTO project_members (id, project_id, user_id, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(record.id)
        .bind(owner_id)
        .bind(MemberRole::Owner.as_str())
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, || format!("Project {} not found", project_id)))?;
        Ok(record.to_domain())
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.owner_id = $1 OR EXISTS \
             (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = $1) \
             ORDER BY p.created_at DESC"
        );
        let records = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_project(
        &self,
        project_id: Uuid,
        update: &ProjectUpdate,
    ) -> PortResult<Project> {
        let sql = format!(
            "UPDATE projects SET name = COALESCE($2, name), \
             description = COALESCE($3, description), status = COALESCE($4, status), \
             updated_at = now() WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(project_id)
            .bind(update.name.as_deref())
            .bind(update.description.as_deref())
            .bind(update.status.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, || format!("Project {} not found", project_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_project(&self, project_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Project {} not found", project_id)));
        }
        Ok(())
    }

    async fn get_membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<ProjectMember>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members WHERE project_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, MemberRecord>(&sql)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(MemberRecord::to_domain)
            .transpose()
    }

    async fn list_members(&self, project_id: Uuid) -> PortResult<Vec<MemberWithUser>> {
        let records = sqlx::query_as::<_, MemberWithUserRecord>(
            "SELECT m.id, m.project_id, m.user_id, m.role, m.created_at, \
             u.name AS user_name, u.email AS user_email \
             FROM project_members m JOIN users u ON u.id = m.user_id \
             WHERE m.project_id = $1 ORDER BY m.created_at ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn add_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> PortResult<ProjectMember> {
        let sql = format!(
            "INSERT INTO project_members (id, project_id, user_id, role) \
             VALUES ($1, $2, $3, $4) RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, MemberRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match port_err(e, String::new) {
                PortError::Conflict(_) => {
                    PortError::Conflict("User is already a member of this project".to_string())
                }
                other => other,
            })?
            .to_domain()
    }

    async fn get_member(&self, member_id: Uuid) -> PortResult<ProjectMember> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM project_members WHERE id = $1");
        sqlx::query_as::<_, MemberRecord>(&sql)
            .bind(member_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, || "Member not found".to_string()))?
            .to_domain()
    }

    async fn remove_member(&self, member_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM project_members WHERE id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Member not found".to_string()));
        }
        Ok(())
    }

    async fn create_task(&self, task: NewTask) -> PortResult<TaskWithAssignee> {
        let sql = format!(
            "WITH t AS (INSERT INTO tasks (id, title, description, project_id, assigned_to_id, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *) {TASK_FROM_T}"
        );
        sqlx::query_as::<_, TaskWithAssigneeRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&task.title)
            .bind(task.description.as_deref())
            .bind(task.project_id)
            .bind(task.assigned_to_id)
            .bind(task.due_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, String::new))?
            .to_domain()
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<TaskWithAssignee> {
        self.fetch_task(task_id).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> PortResult<Vec<TaskWithAssignee>> {
        let sql = format!(
            "WITH t AS (SELECT * FROM tasks WHERE project_id = $1 \
             AND ($2::text IS NULL OR status = $2)) {TASK_FROM_T} ORDER BY {}",
            task_order(filter.sort)
        );
        let records = sqlx::query_as::<_, TaskWithAssigneeRecord>(&sql)
            .bind(filter.project_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> PortResult<TaskWithAssignee> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // The row lock serializes concurrent patches, so each one applies onto the
        // other's committed result instead of overwriting it with a stale read.
        let mut task = sqlx::query_as::<_, TaskRecord>(
            "SELECT id, title, description, status, project_id, assigned_to_id, due_date, \
             created_at, updated_at FROM tasks WHERE id = $1 FOR UPDATE",
        )
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))?
        .to_domain()?;
        patch.apply(&mut task);

        let sql = format!(
            "WITH t AS (UPDATE tasks SET title = $2, description = $3, status = $4, \
             assigned_to_id = $5, due_date = $6, updated_at = now() \
             WHERE id = $1 RETURNING *) {TASK_FROM_T}"
        );
        let updated = sqlx::query_as::<_, TaskWithAssigneeRecord>(&sql)
            .bind(task_id)
            .bind(&task.title)
            .bind(task.description.as_deref())
            .bind(task.status.as_str())
            .bind(task.assigned_to_id)
            .bind(task.due_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| port_err(e, || format!("Task {} not found", task_id)))?
            .to_domain()?;

        tx.commit().await.map_err(unexpected)?;
        Ok(updated)
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<Task> {
        sqlx::query_as::<_, TaskRecord>(
            "DELETE FROM tasks WHERE id = $1 RETURNING id, title, description, status, \
             project_id, assigned_to_id, due_date, created_at, updated_at",
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_err(e, || format!("Task {} not found", task_id)))?
        .to_domain()
    }

    async fn create_comment(
        &self,
        task_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> PortResult<CommentWithAuthor> {
        let sql = format!(
            "WITH c AS (INSERT INTO comments (id, content, task_id, author_id) \
             VALUES ($1, $2, $3, $4) RETURNING *) {COMMENT_FROM_C}"
        );
        let record = sqlx::query_as::<_, CommentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(content)
            .bind(task_id)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, String::new))?;
        Ok(record.to_domain())
    }

    async fn list_comments(&self, task_id: Uuid) -> PortResult<Vec<CommentWithAuthor>> {
        let sql = format!(
            "WITH c AS (SELECT * FROM comments WHERE task_id = $1) {COMMENT_FROM_C} \
             ORDER BY c.created_at ASC"
        );
        let records = sqlx::query_as::<_, CommentRecord>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_activity(&self, activity: NewActivity) -> PortResult<ActivityWithRefs> {
        let sql = format!(
            "WITH a AS (INSERT INTO activities (id, activity_type, message, project_id, task_id, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *) {ACTIVITY_FROM_A}"
        );
        sqlx::query_as::<_, ActivityRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(activity.activity_type.as_str())
            .bind(&activity.message)
            .bind(activity.project_id)
            .bind(activity.task_id)
            .bind(activity.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, String::new))?
            .to_domain()
    }

    async fn list_activities(&self, project_id: Uuid) -> PortResult<Vec<ActivityWithRefs>> {
        let sql = format!(
            "WITH a AS (SELECT * FROM activities WHERE project_id = $1) {ACTIVITY_FROM_A} \
             ORDER BY a.created_at DESC"
        );
        let records = sqlx::query_as::<_, ActivityRecord>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> PortResult<Notification> {
        let sql = format!(
            "INSERT INTO notifications (id, user_id, message, link) VALUES ($1, $2, $3, $4) \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(notification.user_id)
            .bind(&notification.message)
            .bind(notification.link.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_err(e, String::new))?;
        Ok(record.to_domain())
    }

    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn mark_notifications_read(&self, user_id: Uuid, ids: &[Uuid]) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = true WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(ids.to_vec())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn analytics_for_owner(&self, owner_id: Uuid) -> PortResult<Analytics> {
        let (total_tasks, completed) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE lower(t.status) = 'done') \
             FROM tasks t JOIN projects p ON p.id = t.project_id WHERE p.owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let tasks_by_project = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT t.project_id, COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id \
             WHERE p.owner_id = $1 GROUP BY t.project_id ORDER BY COUNT(*) DESC, t.project_id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let tasks_by_user = sqlx::query_as::<_, (Option<Uuid>, i64)>(
            "SELECT t.assigned_to_id, COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id \
             WHERE p.owner_id = $1 GROUP BY t.assigned_to_id ORDER BY COUNT(*) DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(Analytics {
            total_tasks,
            completed,
            pending: total_tasks - completed,
            tasks_by_project,
            tasks_by_user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use workflow_core::domain::TaskStatus;

    /// Connects to the database named by `TEST_DATABASE_URL` and migrates it.
    async fn adapter() -> DbAdapter {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("connect to test database");
        let adapter = DbAdapter::new(pool);
        adapter.run_migrations().await.expect("migrations");
        adapter
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database in TEST_DATABASE_URL"]
    async fn concurrent_patches_on_different_fields_both_land() {
        let db = adapter().await;
        let email = format!("{}@example.com", Uuid::new_v4());
        let owner = db.create_user(None, &email, "h").await.unwrap();
        let project = db.create_project(owner.id, "Launch", None).await.unwrap();

        for _ in 0..20 {
            let task = db
                .create_task(NewTask {
                    title: "Draft".to_string(),
                    description: None,
                    project_id: project.id,
                    assigned_to_id: None,
                    due_date: None,
                })
                .await
                .unwrap();
            let id = task.task.id;
            let retitle = TaskPatch {
                title: Some("Final".to_string()),
                ..Default::default()
            };
            let finish = TaskPatch {
                status: Some(TaskStatus::Done),
                ..Default::default()
            };
            let (a, b) = tokio::join!(db.update_task(id, &retitle), db.update_task(id, &finish));
            a.unwrap();
            b.unwrap();

            let stored = db.get_task(id).await.unwrap().task;
            assert_eq!(stored.title, "Final");
            assert_eq!(stored.status, TaskStatus::Done);
        }
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database in TEST_DATABASE_URL"]
    async fn new_sessions_sweep_expired_ones() {
        let db = adapter().await;
        let email = format!("{}@example.com", Uuid::new_v4());
        let user = db.create_user(None, &email, "h").await.unwrap();
        let stale = Uuid::new_v4().to_string();
        db.create_auth_session(&stale, user.id, Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        db.create_auth_session(&Uuid::new_v4().to_string(), user.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_sessions WHERE id = $1")
            .bind(&stale)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }
}
