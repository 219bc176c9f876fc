pub mod domain;
pub mod ports;
pub mod realtime;

pub use domain::{
    Activity, ActivityType, ActivityWithRefs, Analytics, AuthSession, Comment, CommentWithAuthor,
    MemberRole, MemberWithUser, NewActivity, NewNotification, NewTask, Notification, Project,
    ProjectMember, ProjectUpdate, Task, TaskFilter, TaskPatch, TaskRef, TaskSort, TaskStatus,
    TaskWithAssignee, User, UserCredentials, UserSummary,
};
pub use ports::{
    DatabaseService, MailService, OutgoingMail, PortError, PortResult, RealtimePublisher,
};
pub use realtime::{Channel, RealtimeEvent};
