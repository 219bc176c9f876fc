//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::RealtimeHub;
use crate::config::Config;
use std::sync::Arc;
use workflow_core::ports::{DatabaseService, MailService, RealtimePublisher};

//=========================================================================================
// AppState (Shared Across All Requests and Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    /// Where handlers publish realtime events. Normally the same hub as `hub`.
    pub realtime: Arc<dyn RealtimePublisher>,
    /// The hub WebSocket connections subscribe to.
    pub hub: Arc<RealtimeHub>,
    pub mailer: Arc<dyn MailService>,
}

impl AppState {
    /// Wires a state whose publisher is the hub itself.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        config: Arc<Config>,
        mailer: Arc<dyn MailService>,
    ) -> Self {
        let hub = Arc::new(RealtimeHub::new(config.realtime_capacity));
        Self {
            db,
            config,
            realtime: hub.clone(),
            hub,
            mailer,
        }
    }
}
