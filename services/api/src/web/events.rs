//! services/api/src/web/events.rs
//!
//! The write-then-publish helpers behind every realtime update.
//!
//! Rows are persisted first and the matching event is published afterwards.
//! A failed publish is logged and forgotten; the stored row is the only record.

use crate::web::state::AppState;
use tracing::warn;
use workflow_core::domain::{ActivityWithRefs, NewActivity, NewNotification, Notification};
use workflow_core::ports::PortResult;
use workflow_core::realtime::RealtimeEvent;

/// Publishes `event`, dropping it if the transport refuses.
pub async fn broadcast(state: &AppState, event: RealtimeEvent) {
    let (channel, name) = event.route();
    if let Err(e) = state.realtime.publish(event).await {
        warn!("Dropped realtime event {} on {}: {}", name, channel, e);
    }
}

/// Stores an activity row and announces it on the project channel.
pub async fn log_activity(state: &AppState, activity: NewActivity) -> PortResult<ActivityWithRefs> {
    let activity = state.db.create_activity(activity).await?;
    broadcast(state, RealtimeEvent::ActivityCreated(activity.clone())).await;
    Ok(activity)
}

/// Stores a notification and pushes it to the recipient's channel.
pub async fn send_notification(
    state: &AppState,
    notification: NewNotification,
) -> PortResult<Notification> {
    let notification = state.db.create_notification(notification).await?;
    broadcast(
        state,
        RealtimeEvent::NotificationCreated(notification.clone()),
    )
    .await;
    Ok(notification)
}
