//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a realtime WebSocket connection.
//!
//! One writer task owns the socket's sink and drains an outbound queue. Every
//! subscribed channel gets a forwarder task that relays hub events into that
//! queue until it is unsubscribed or the connection closes.

use crate::web::{
    access::can_access_project,
    dto::event_payload,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use workflow_core::realtime::Channel;

const OUTBOUND_QUEUE: usize = 64;

/// The handler for upgrading HTTP requests to WebSocket connections.
#[utoipa::path(
    get,
    path = "/ws",
    responses(
        (status = 101, description = "Switching to the realtime WebSocket protocol"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New WebSocket connection established for user: {}", user_id);

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);
    let connection = CancellationToken::new();

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {:?}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("Client went away, stopping writer.");
                break;
            }
        }
    });

    let mut subscriptions: HashMap<Channel, CancellationToken> = HashMap::new();

    // --- Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let reply = handle_text_message(
                    text.as_str(),
                    &app_state,
                    user_id,
                    &out_tx,
                    &connection,
                    &mut subscriptions,
                )
                .await;
                if out_tx.send(reply).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- Cleanup ---
    connection.cancel();
    drop(out_tx);
    writer.abort();
    info!("WebSocket connection closed for user: {}", user_id);
}

/// Applies one client message and returns the frame to answer it with.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    user_id: Uuid,
    out_tx: &mpsc::Sender<ServerMessage>,
    connection: &CancellationToken,
    subscriptions: &mut HashMap<Channel, CancellationToken>,
) -> ServerMessage {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            return ServerMessage::Error {
                message: "Unrecognized message".to_string(),
            };
        }
    };

    match client_msg {
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Subscribe { channel: name } => {
            let channel = match name.parse::<Channel>() {
                Ok(channel) => channel,
                Err(e) => return ServerMessage::Error { message: e.to_string() },
            };
            if !may_subscribe(app_state, user_id, channel).await {
                warn!("User {} denied subscription to {}", user_id, channel);
                return ServerMessage::Error {
                    message: format!("Not allowed to subscribe to {}", channel),
                };
            }
            // A forwarder that shut itself down after losing access leaves a cancelled token.
            if !subscriptions.get(&channel).is_some_and(|t| !t.is_cancelled()) {
                let token = connection.child_token();
                spawn_forwarder(app_state, user_id, channel, out_tx.clone(), token.clone()).await;
                subscriptions.insert(channel, token);
                debug!("User {} subscribed to {}", user_id, channel);
            }
            ServerMessage::Subscribed { channel: name }
        }
        ClientMessage::Unsubscribe { channel: name } => {
            if let Ok(channel) = name.parse::<Channel>() {
                if let Some(token) = subscriptions.remove(&channel) {
                    token.cancel();
                    debug!("User {} unsubscribed from {}", user_id, channel);
                }
            }
            ServerMessage::Unsubscribed { channel: name }
        }
    }
}

/// A user channel is private to its owner; a project channel needs project access.
async fn may_subscribe(app_state: &AppState, user_id: Uuid, channel: Channel) -> bool {
    match channel {
        Channel::User(id) => id == user_id,
        Channel::Project(project_id) => can_access_project(app_state, project_id, user_id).await,
    }
}

/// Relays hub events for `channel` into the connection's outbound queue.
///
/// Project access is checked again before every event. Once the user has lost
/// access the forwarder sends `unsubscribed` for the channel and stops.
async fn spawn_forwarder(
    app_state: &Arc<AppState>,
    user_id: Uuid,
    channel: Channel,
    out_tx: mpsc::Sender<ServerMessage>,
    token: CancellationToken,
) {
    // Subscribe before returning so the `subscribed` ack never precedes a missed event.
    let mut events = app_state.hub.subscribe(channel).await;
    let app_state = app_state.clone();

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = token.cancelled() => break,
                received = events.recv() => received,
            };
            let event = match event {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber on {} lagged, skipped {} events", channel, skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !may_subscribe(&app_state, user_id, channel).await {
                info!("User {} lost access to {}, ending subscription", user_id, channel);
                token.cancel();
                let _ = out_tx
                    .send(ServerMessage::Unsubscribed {
                        channel: channel.to_string(),
                    })
                    .await;
                break;
            }
            let data = match event_payload(&event) {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to encode {} event: {:?}", event.event_name(), e);
                    continue;
                }
            };
            let frame = ServerMessage::Event {
                channel: channel.to_string(),
                event: event.event_name().to_string(),
                data,
            };
            if out_tx.send(frame).await.is_err() {
                break;
            }
        }
        drop(events);
        app_state.hub.release(channel).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{LogMailer, MemoryAdapter};
    use crate::config::Config;
    use crate::web::events::{broadcast, send_notification};
    use workflow_core::domain::{MemberRole, NewNotification, NewTask};
    use workflow_core::realtime::RealtimeEvent;

    struct Conn {
        state: Arc<AppState>,
        out_tx: mpsc::Sender<ServerMessage>,
        out_rx: mpsc::Receiver<ServerMessage>,
        token: CancellationToken,
        subscriptions: HashMap<Channel, CancellationToken>,
    }

    impl Conn {
        fn new() -> Self {
            let config =
                Config::from_lookup(|key| (key == "DATABASE_URL").then(|| "memory".to_string()))
                    .unwrap();
            let state = Arc::new(AppState::new(
                Arc::new(MemoryAdapter::new()),
                Arc::new(config),
                Arc::new(LogMailer::new("test@workflow.local")),
            ));
            let (out_tx, out_rx) = mpsc::channel(8);
            Self {
                state,
                out_tx,
                out_rx,
                token: CancellationToken::new(),
                subscriptions: HashMap::new(),
            }
        }

        async fn handle(&mut self, user_id: Uuid, text: &str) -> ServerMessage {
            handle_text_message(
                text,
                &self.state,
                user_id,
                &self.out_tx,
                &self.token,
                &mut self.subscriptions,
            )
            .await
        }
    }

    #[tokio::test]
    async fn ping_and_garbage() {
        let mut conn = Conn::new();
        let user = Uuid::new_v4();
        assert!(matches!(conn.handle(user, r#"{"type":"ping"}"#).await, ServerMessage::Pong));
        assert!(matches!(conn.handle(user, "not json").await, ServerMessage::Error { .. }));
        let reply = conn
            .handle(user, r#"{"type":"subscribe","channel":"team-1"}"#)
            .await;
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn user_channels_are_private() {
        let mut conn = Conn::new();
        let me = Uuid::new_v4();
        let someone_else = Uuid::new_v4();
        let text = format!(r#"{{"type":"subscribe","channel":"user-{someone_else}"}}"#);
        assert!(matches!(conn.handle(me, &text).await, ServerMessage::Error { .. }));
        assert!(conn.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn project_channels_need_access() {
        let mut conn = Conn::new();
        let owner = conn.state.db.create_user(None, "o@example.com", "h").await.unwrap();
        let stranger = conn.state.db.create_user(None, "s@example.com", "h").await.unwrap();
        let project = conn.state.db.create_project(owner.id, "Launch", None).await.unwrap();
        let text = format!(r#"{{"type":"subscribe","channel":"project-{}"}}"#, project.id);

        assert!(matches!(conn.handle(stranger.id, &text).await, ServerMessage::Error { .. }));
        assert!(matches!(conn.handle(owner.id, &text).await, ServerMessage::Subscribed { .. }));
    }

    #[tokio::test]
    async fn removed_members_stop_receiving_project_events() {
        let mut conn = Conn::new();
        let db = conn.state.db.clone();
        let owner = db.create_user(None, "o@example.com", "h").await.unwrap();
        let bo = db.create_user(None, "b@example.com", "h").await.unwrap();
        let project = db.create_project(owner.id, "Launch", None).await.unwrap();
        let member = db.add_member(project.id, bo.id, MemberRole::Member).await.unwrap();
        let channel = Channel::Project(project.id);
        let text = format!(r#"{{"type":"subscribe","channel":"{channel}"}}"#);
        assert!(matches!(conn.handle(bo.id, &text).await, ServerMessage::Subscribed { .. }));

        db.remove_member(member.id).await.unwrap();
        let task = db
            .create_task(NewTask {
                title: "Secret plans".to_string(),
                description: None,
                project_id: project.id,
                assigned_to_id: None,
                due_date: None,
            })
            .await
            .unwrap();
        broadcast(&conn.state, RealtimeEvent::TaskCreated(task.clone())).await;

        match conn.out_rx.recv().await.unwrap() {
            ServerMessage::Unsubscribed { channel: got } => assert_eq!(got, channel.to_string()),
            other => panic!("unexpected frame {other:?}"),
        }
        assert!(conn.subscriptions[&channel].is_cancelled());

        broadcast(&conn.state, RealtimeEvent::TaskCreated(task)).await;
        tokio::task::yield_now().await;
        assert!(conn.out_rx.try_recv().is_err());

        // Subscribing again is refused rather than silently ignored.
        assert!(matches!(conn.handle(bo.id, &text).await, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn subscribed_events_are_forwarded_until_unsubscribed() {
        let mut conn = Conn::new();
        let user = conn.state.db.create_user(None, "u@example.com", "h").await.unwrap();
        let channel = format!("user-{}", user.id);
        let subscribe = format!(r#"{{"type":"subscribe","channel":"{channel}"}}"#);
        assert!(matches!(conn.handle(user.id, &subscribe).await, ServerMessage::Subscribed { .. }));

        let new_notification = || NewNotification {
            user_id: user.id,
            message: "hello".to_string(),
            link: None,
        };
        send_notification(&conn.state, new_notification()).await.unwrap();
        match conn.out_rx.recv().await.unwrap() {
            ServerMessage::Event {
                channel: got,
                event,
                data,
            } => {
                assert_eq!(got, channel);
                assert_eq!(event, "notification");
                assert_eq!(data["message"], "hello");
            }
            other => panic!("unexpected frame {other:?}"),
        }

        let unsubscribe = format!(r#"{{"type":"unsubscribe","channel":"{channel}"}}"#);
        let reply = conn.handle(user.id, &unsubscribe).await;
        assert!(matches!(reply, ServerMessage::Unsubscribed { .. }));
        assert!(conn.subscriptions.is_empty());
    }
}
