//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `DatabaseService` port. Selected with
//! `DATABASE_URL=memory` for local development and used by the test suite.
//! Rows are kept in insertion order, which doubles as creation order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use workflow_core::domain::{
    Activity, ActivityWithRefs, Analytics, Comment, CommentWithAuthor, MemberRole,
    MemberWithUser, NewActivity, NewNotification, NewTask, Notification, Project, ProjectMember,
    ProjectUpdate, Task, TaskFilter, TaskPatch, TaskRef, TaskSort, TaskStatus, TaskWithAssignee,
    User, UserCredentials, UserSummary, DEFAULT_PROJECT_STATUS,
};
use workflow_core::ports::{DatabaseService, PortError, PortResult};

struct UserRow {
    user: User,
    password_hash: Option<String>,
    reset: Option<(String, DateTime<Utc>)>,
}

#[derive(Default)]
struct Store {
    users: Vec<UserRow>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    projects: Vec<Project>,
    members: Vec<ProjectMember>,
    tasks: Vec<Task>,
    comments: Vec<Comment>,
    activities: Vec<Activity>,
    notifications: Vec<Notification>,
}

impl Store {
    fn user(&self, user_id: Uuid) -> Option<&User> {
        self.users.iter().map(|r| &r.user).find(|u| u.id == user_id)
    }

    fn summary(&self, user_id: Uuid) -> Option<UserSummary> {
        self.user(user_id).map(User::summary)
    }

    fn require_user(&self, user_id: Uuid) -> PortResult<()> {
        match self.user(user_id) {
            Some(_) => Ok(()),
            None => Err(PortError::Invalid(format!("User {} does not exist", user_id))),
        }
    }

    fn require_project(&self, project_id: Uuid) -> PortResult<()> {
        if self.projects.iter().any(|p| p.id == project_id) {
            Ok(())
        } else {
            Err(PortError::Invalid(format!("Project {} does not exist", project_id)))
        }
    }

    fn with_assignee(&self, task: &Task) -> TaskWithAssignee {
        TaskWithAssignee {
            task: task.clone(),
            assigned_to: task.assigned_to_id.and_then(|id| self.summary(id)),
        }
    }

    fn with_refs(&self, activity: &Activity) -> ActivityWithRefs {
        ActivityWithRefs {
            activity: activity.clone(),
            user: activity.user_id.and_then(|id| self.summary(id)),
            task: activity.task_id.and_then(|id| {
                self.tasks.iter().find(|t| t.id == id).map(|t| TaskRef {
                    id: t.id,
                    title: t.title.clone(),
                })
            }),
        }
    }

    fn with_author(&self, comment: &Comment) -> PortResult<CommentWithAuthor> {
        let author = self
            .summary(comment.author_id)
            .ok_or_else(|| PortError::Unexpected("comment author vanished".to_string()))?;
        Ok(CommentWithAuthor {
            comment: comment.clone(),
            author,
        })
    }

    fn task_mut(&mut self, task_id: Uuid) -> PortResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))
    }

    /// Drops a task and the rows that depend on it.
    fn remove_task(&mut self, task_id: Uuid) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == task_id)?;
        let task = self.tasks.remove(index);
        self.comments.retain(|c| c.task_id != task_id);
        for activity in self.activities.iter_mut().filter(|a| a.task_id == Some(task_id)) {
            activity.task_id = None;
        }
        Some(task)
    }
}

/// A `DatabaseService` backed by process memory.
#[derive(Default)]
pub struct MemoryAdapter {
    store: RwLock<Store>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for MemoryAdapter {
    async fn create_user(
        &self,
        name: Option<&str>,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|r| r.user.email == email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.map(str::to_string),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        store.users.push(UserRow {
            user: user.clone(),
            password_hash: Some(hashed_password.to_string()),
            reset: None,
        });
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let store = self.store.read().await;
        store
            .user(user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let store = self.store.read().await;
        store
            .users
            .iter()
            .find(|r| r.user.email == email)
            .map(|r| r.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let store = self.store.read().await;
        store
            .users
            .iter()
            .find(|r| r.user.email == email)
            .map(|r| UserCredentials {
                user_id: r.user.id,
                email: r.user.email.clone(),
                name: r.user.name.clone(),
                hashed_password: r.password_hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut store = self.store.write().await;
        let row = store
            .users
            .iter_mut()
            .find(|r| r.user.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        row.reset = Some((token.to_string(), expires_at));
        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<Uuid> {
        let mut store = self.store.write().await;
        let row = store
            .users
            .iter_mut()
            .find(|r| matches!(&r.reset, Some((t, expiry)) if t == token && *expiry > now))
            .ok_or_else(|| PortError::NotFound("Invalid or expired token".to_string()))?;
        row.password_hash = Some(hashed_password.to_string());
        row.reset = None;
        Ok(row.user.id)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        store.sessions.retain(|_, (_, expiry)| *expiry > now);
        store
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let mut store = self.store.write().await;
        match store.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            Some(_) => {
                store.sessions.remove(session_id);
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.store.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Project> {
        let mut store = self.store.write().await;
        store.require_user(owner_id)?;
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            status: DEFAULT_PROJECT_STATUS.to_string(),
            owner_id,
            created_at: now,
            updated_at: now,
        };
        store.projects.push(project.clone());
        store.members.push(ProjectMember {
            id: Uuid::new_v4(),
            project_id: project.id,
            user_id: owner_id,
            role: MemberRole::Owner,
            created_at: now,
        });
        Ok(project)
    }

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project> {
        let store = self.store.read().await;
        store
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project_id)))
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        let store = self.store.read().await;
        Ok(store
            .projects
            .iter()
            .rev()
            .filter(|p| {
                p.owner_id == user_id
                    || store
                        .members
                        .iter()
                        .any(|m| m.project_id == p.id && m.user_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn update_project(
        &self,
        project_id: Uuid,
        update: &ProjectUpdate,
    ) -> PortResult<Project> {
        let mut store = self.store.write().await;
        let project = store
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project_id)))?;
        if let Some(name) = &update.name {
            project.name = name.clone();
        }
        if let Some(description) = &update.description {
            project.description = Some(description.clone());
        }
        if let Some(status) = &update.status {
            project.status = status.clone();
        }
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        let before = store.projects.len();
        store.projects.retain(|p| p.id != project_id);
        if store.projects.len() == before {
            return Err(PortError::NotFound(format!("Project {} not found", project_id)));
        }
        let task_ids: Vec<Uuid> = store
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.id)
            .collect();
        for task_id in task_ids {
            store.remove_task(task_id);
        }
        store.members.retain(|m| m.project_id != project_id);
        store.activities.retain(|a| a.project_id != project_id);
        Ok(())
    }

    async fn get_membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<ProjectMember>> {
        let store = self.store.read().await;
        Ok(store
            .members
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_members(&self, project_id: Uuid) -> PortResult<Vec<MemberWithUser>> {
        let store = self.store.read().await;
        Ok(store
            .members
            .iter()
            .filter(|m| m.project_id == project_id)
            .filter_map(|m| {
                store.summary(m.user_id).map(|user| MemberWithUser {
                    member: m.clone(),
                    user,
                })
            })
            .collect())
    }

    async fn add_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> PortResult<ProjectMember> {
        let mut store = self.store.write().await;
        store.require_project(project_id)?;
        store.require_user(user_id)?;
        if store
            .members
            .iter()
            .any(|m| m.project_id == project_id && m.user_id == user_id)
        {
            return Err(PortError::Conflict(
                "User is already a member of this project".to_string(),
            ));
        }
        let member = ProjectMember {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            role,
            created_at: Utc::now(),
        };
        store.members.push(member.clone());
        Ok(member)
    }

    async fn get_member(&self, member_id: Uuid) -> PortResult<ProjectMember> {
        let store = self.store.read().await;
        store
            .members
            .iter()
            .find(|m| m.id == member_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Member not found".to_string()))
    }

    async fn remove_member(&self, member_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        let before = store.members.len();
        store.members.retain(|m| m.id != member_id);
        if store.members.len() == before {
            return Err(PortError::NotFound("Member not found".to_string()));
        }
        Ok(())
    }

    async fn create_task(&self, new: NewTask) -> PortResult<TaskWithAssignee> {
        let mut store = self.store.write().await;
        store.require_project(new.project_id)?;
        if let Some(assignee) = new.assigned_to_id {
            store.require_user(assignee)?;
        }
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            status: TaskStatus::default(),
            project_id: new.project_id,
            assigned_to_id: new.assigned_to_id,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        };
        store.tasks.push(task.clone());
        Ok(store.with_assignee(&task))
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<TaskWithAssignee> {
        let store = self.store.read().await;
        store
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| store.with_assignee(t))
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> PortResult<Vec<TaskWithAssignee>> {
        let store = self.store.read().await;
        let mut tasks: Vec<&Task> = store
            .tasks
            .iter()
            .filter(|t| t.project_id == filter.project_id)
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .collect();
        match filter.sort {
            TaskSort::Oldest => {}
            TaskSort::Newest => tasks.reverse(),
            TaskSort::Due => {
                tasks.reverse();
                // Stable sort keeps newest-first among equal due dates; undated tasks go last.
                tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date));
            }
        }
        Ok(tasks.into_iter().map(|t| store.with_assignee(t)).collect())
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> PortResult<TaskWithAssignee> {
        let mut store = self.store.write().await;
        if let Some(Some(assignee)) = patch.assigned_to_id {
            store.require_user(assignee)?;
        }
        let task = store.task_mut(task_id)?;
        patch.apply(task);
        task.updated_at = Utc::now();
        let task = task.clone();
        Ok(store.with_assignee(&task))
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<Task> {
        let mut store = self.store.write().await;
        store
            .remove_task(task_id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))
    }

    async fn create_comment(
        &self,
        task_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> PortResult<CommentWithAuthor> {
        let mut store = self.store.write().await;
        store.require_user(author_id)?;
        if !store.tasks.iter().any(|t| t.id == task_id) {
            return Err(PortError::Invalid(format!("Task {} does not exist", task_id)));
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            content: content.to_string(),
            task_id,
            author_id,
            created_at: Utc::now(),
        };
        store.comments.push(comment.clone());
        store.with_author(&comment)
    }

    async fn list_comments(&self, task_id: Uuid) -> PortResult<Vec<CommentWithAuthor>> {
        let store = self.store.read().await;
        store
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .map(|c| store.with_author(c))
            .collect()
    }

    async fn create_activity(&self, new: NewActivity) -> PortResult<ActivityWithRefs> {
        let mut store = self.store.write().await;
        store.require_project(new.project_id)?;
        let activity = Activity {
            id: Uuid::new_v4(),
            activity_type: new.activity_type,
            message: new.message,
            project_id: new.project_id,
            task_id: new.task_id,
            user_id: new.user_id,
            created_at: Utc::now(),
        };
        store.activities.push(activity.clone());
        Ok(store.with_refs(&activity))
    }

    async fn list_activities(&self, project_id: Uuid) -> PortResult<Vec<ActivityWithRefs>> {
        let store = self.store.read().await;
        Ok(store
            .activities
            .iter()
            .rev()
            .filter(|a| a.project_id == project_id)
            .map(|a| store.with_refs(a))
            .collect())
    }

    async fn create_notification(
        &self,
        new: NewNotification,
    ) -> PortResult<Notification> {
        let mut store = self.store.write().await;
        store.require_user(new.user_id)?;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            message: new.message,
            link: new.link,
            read: false,
            created_at: Utc::now(),
        };
        store.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<Notification>> {
        let store = self.store.read().await;
        Ok(store
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notifications_read(&self, user_id: Uuid, ids: &[Uuid]) -> PortResult<u64> {
        let mut store = self.store.write().await;
        let mut updated = 0;
        for notification in store
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && ids.contains(&n.id))
        {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn analytics_for_owner(&self, owner_id: Uuid) -> PortResult<Analytics> {
        let store = self.store.read().await;
        let owned: Vec<Uuid> = store
            .projects
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .map(|p| p.id)
            .collect();

        let mut analytics = Analytics::default();
        let mut by_project: Vec<(Uuid, i64)> = Vec::new();
        let mut by_user: Vec<(Option<Uuid>, i64)> = Vec::new();

        for task in store.tasks.iter().filter(|t| owned.contains(&t.project_id)) {
            analytics.total_tasks += 1;
            if task.status == TaskStatus::Done {
                analytics.completed += 1;
            }
            match by_project.iter_mut().find(|(id, _)| *id == task.project_id) {
                Some((_, count)) => *count += 1,
                None => by_project.push((task.project_id, 1)),
            }
            match by_user.iter_mut().find(|(id, _)| *id == task.assigned_to_id) {
                Some((_, count)) => *count += 1,
                None => by_user.push((task.assigned_to_id, 1)),
            }
        }

        by_project.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        by_user.sort_by(|a, b| b.1.cmp(&a.1));
        analytics.pending = analytics.total_tasks - analytics.completed;
        analytics.tasks_by_project = by_project;
        analytics.tasks_by_user = by_user;
        Ok(analytics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn seeded() -> (MemoryAdapter, User, Project) {
        let db = MemoryAdapter::new();
        let owner = db
            .create_user(Some("Ana"), "ana@example.com", "hash")
            .await
            .unwrap();
        let project = db.create_project(owner.id, "Launch", None).await.unwrap();
        (db, owner, project)
    }

    fn new_task(project_id: Uuid, title: &str, due: Option<DateTime<Utc>>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            project_id,
            assigned_to_id: None,
            due_date: due,
        }
    }

    #[tokio::test]
    async fn creating_a_project_makes_the_creator_owner() {
        let (db, owner, project) = seeded().await;
        let membership = db.get_membership(project.id, owner.id).await.unwrap();
        assert_eq!(membership.map(|m| m.role), Some(MemberRole::Owner));
        assert_eq!(project.status, "active");
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let (db, _, _) = seeded().await;
        let err = db
            .create_user(None, "ana@example.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn due_sort_puts_undated_tasks_last() {
        let (db, _, project) = seeded().await;
        let soon = Utc::now() + Duration::days(1);
        let later = Utc::now() + Duration::days(5);
        db.create_task(new_task(project.id, "undated", None)).await.unwrap();
        db.create_task(new_task(project.id, "later", Some(later))).await.unwrap();
        db.create_task(new_task(project.id, "soon", Some(soon))).await.unwrap();

        let filter = TaskFilter::parse(project.id, None, Some("due")).unwrap();
        let titles: Vec<String> = db
            .list_tasks(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.task.title)
            .collect();
        assert_eq!(titles, ["soon", "later", "undated"]);

        let filter = TaskFilter::parse(project.id, None, Some("oldest")).unwrap();
        let first = db.list_tasks(&filter).await.unwrap().remove(0);
        assert_eq!(first.task.title, "undated");
    }

    #[tokio::test]
    async fn deleting_a_task_drops_comments_and_unlinks_activities() {
        let (db, owner, project) = seeded().await;
        let task = db
            .create_task(new_task(project.id, "doomed", None))
            .await
            .unwrap()
            .task;
        db.create_comment(task.id, owner.id, "bye").await.unwrap();
        db.create_activity(NewActivity {
            activity_type: workflow_core::domain::ActivityType::TaskCreated,
            message: "created".to_string(),
            project_id: project.id,
            task_id: Some(task.id),
            user_id: Some(owner.id),
        })
        .await
        .unwrap();

        db.delete_task(task.id).await.unwrap();
        assert!(db.list_comments(task.id).await.unwrap().is_empty());
        let feed = db.list_activities(project.id).await.unwrap();
        assert_eq!(feed[0].activity.task_id, None);
        assert!(feed[0].task.is_none());
    }

    #[tokio::test]
    async fn expired_reset_tokens_are_rejected() {
        let (db, owner, _) = seeded().await;
        let now = Utc::now();
        db.set_reset_token(owner.id, "tok", now - Duration::minutes(1))
            .await
            .unwrap();
        let err = db.reset_password("tok", "new-hash", now).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        db.set_reset_token(owner.id, "tok", now + Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(db.reset_password("tok", "new-hash", now).await.unwrap(), owner.id);
        // Tokens are single use.
        assert!(db.reset_password("tok", "again", now).await.is_err());
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned() {
        let (db, owner, _) = seeded().await;
        let now = Utc::now();
        db.create_auth_session("stale", owner.id, now - Duration::minutes(1))
            .await
            .unwrap();
        db.create_auth_session("lapsed", owner.id, now - Duration::minutes(1))
            .await
            .unwrap();
        // Creating a session sweeps out the first stale one.
        let store = db.store.read().await;
        assert!(!store.sessions.contains_key("stale"));
        assert_eq!(store.sessions.len(), 1);
        drop(store);

        assert!(matches!(
            db.validate_auth_session("lapsed").await,
            Err(PortError::Unauthorized)
        ));
        assert!(db.store.read().await.sessions.is_empty());

        db.create_auth_session("live", owner.id, now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(db.validate_auth_session("live").await.unwrap(), owner.id);
        assert_eq!(db.store.read().await.sessions.len(), 1);
    }

    #[tokio::test]
    async fn marking_read_ignores_foreign_notifications() {
        let (db, owner, _) = seeded().await;
        let other = db.create_user(None, "bo@example.com", "hash").await.unwrap();
        let mine = db
            .create_notification(NewNotification {
                user_id: owner.id,
                message: "mine".to_string(),
                link: None,
            })
            .await
            .unwrap();
        let theirs = db
            .create_notification(NewNotification {
                user_id: other.id,
                message: "theirs".to_string(),
                link: None,
            })
            .await
            .unwrap();

        let updated = db
            .mark_notifications_read(owner.id, &[mine.id, theirs.id])
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert!(!db.list_notifications(other.id).await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn analytics_only_counts_owned_projects() {
        let (db, owner, project) = seeded().await;
        let other = db.create_user(None, "bo@example.com", "hash").await.unwrap();
        let foreign = db.create_project(other.id, "Elsewhere", None).await.unwrap();

        let done = db
            .create_task(new_task(project.id, "a", None))
            .await
            .unwrap()
            .task;
        db.create_task(new_task(project.id, "b", None)).await.unwrap();
        db.create_task(new_task(foreign.id, "c", None)).await.unwrap();
        db.update_task(
            done.id,
            &TaskPatch {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let analytics = db.analytics_for_owner(owner.id).await.unwrap();
        assert_eq!(analytics.total_tasks, 2);
        assert_eq!(analytics.completed, 1);
        assert_eq!(analytics.pending, 1);
        assert_eq!(analytics.tasks_by_project, vec![(project.id, 2)]);
        assert_eq!(analytics.tasks_by_user, vec![(None, 2)]);
    }
}
