//! crates/workflow_core/src/realtime.rs
//!
//! Channel naming and the event dispatch table for realtime updates.
//!
//! Every event the server pushes to connected clients is described by a
//! `RealtimeEvent`. `RealtimeEvent::route` is the single place that decides
//! which channel an event goes to and under which event name.

use crate::domain::{ActivityWithRefs, CommentWithAuthor, Notification, Task, TaskWithAssignee};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const PROJECT_PREFIX: &str = "project-";
const USER_PREFIX: &str = "user-";

/// A named pub/sub topic clients can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Task, comment and activity traffic for one project.
    Project(Uuid),
    /// Private notifications for one user.
    User(Uuid),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Project(id) => write!(f, "{PROJECT_PREFIX}{id}"),
            Channel::User(id) => write!(f, "{USER_PREFIX}{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid channel name: '{0}'")]
pub struct InvalidChannel(pub String);

impl FromStr for Channel {
    type Err = InvalidChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidChannel(s.to_string());
        if let Some(id) = s.strip_prefix(PROJECT_PREFIX) {
            Uuid::parse_str(id).map(Channel::Project).map_err(|_| invalid())
        } else if let Some(id) = s.strip_prefix(USER_PREFIX) {
            Uuid::parse_str(id).map(Channel::User).map_err(|_| invalid())
        } else {
            Err(invalid())
        }
    }
}

/// An event published after the matching database row has been written.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    TaskCreated(TaskWithAssignee),
    TaskUpdated(TaskWithAssignee),
    TaskDeleted(Task),
    CommentCreated {
        project_id: Uuid,
        comment: CommentWithAuthor,
    },
    ActivityCreated(ActivityWithRefs),
    NotificationCreated(Notification),
}

impl RealtimeEvent {
    /// The channel and event name this event is delivered under.
    pub fn route(&self) -> (Channel, &'static str) {
        match self {
            RealtimeEvent::TaskCreated(t) => (Channel::Project(t.task.project_id), "task-created"),
            RealtimeEvent::TaskUpdated(t) => (Channel::Project(t.task.project_id), "task-updated"),
            RealtimeEvent::TaskDeleted(t) => (Channel::Project(t.project_id), "task-deleted"),
            RealtimeEvent::CommentCreated { project_id, .. } => {
                (Channel::Project(*project_id), "comment-created")
            }
            RealtimeEvent::ActivityCreated(a) => {
                (Channel::Project(a.activity.project_id), "activity-created")
            }
            RealtimeEvent::NotificationCreated(n) => (Channel::User(n.user_id), "notification"),
        }
    }

    pub fn channel(&self) -> Channel {
        self.route().0
    }

    pub fn event_name(&self) -> &'static str {
        self.route().1
    }
}
