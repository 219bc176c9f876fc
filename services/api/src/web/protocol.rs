//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for realtime channel subscriptions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving events for a channel such as `project-<id>` or `user-<id>`.
    Subscribe { channel: String },

    /// Stop receiving events for a channel.
    Unsubscribe { channel: String },

    /// Keep-alive. Answered with `pong`.
    Ping,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed { channel: String },

    Unsubscribed { channel: String },

    Pong,

    /// A rejected or unreadable client message. The connection stays open.
    Error { message: String },

    /// A realtime event published on a subscribed channel.
    Event {
        channel: String,
        event: String,
        data: Value,
    },
}
