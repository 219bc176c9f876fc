//! services/api/src/adapters/hub.rs
//!
//! An in-process realtime hub implementing the `RealtimePublisher` port.
//!
//! Each channel gets a bounded `tokio::sync::broadcast` channel, created the
//! first time somebody subscribes. Publishing is fire-and-forget: events for
//! channels without listeners are discarded, and slow listeners that fall
//! more than `capacity` events behind skip what they missed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use workflow_core::ports::{PortResult, RealtimePublisher};
use workflow_core::realtime::{Channel, RealtimeEvent};

pub type EventReceiver = broadcast::Receiver<Arc<RealtimeEvent>>;

pub struct RealtimeHub {
    capacity: usize,
    channels: RwLock<HashMap<Channel, broadcast::Sender<Arc<RealtimeEvent>>>>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Starts listening on `channel`.
    pub async fn subscribe(&self, channel: Channel) -> EventReceiver {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live receivers on `channel`.
    pub async fn subscriber_count(&self, channel: Channel) -> usize {
        self.channels
            .read()
            .await
            .get(&channel)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Drops the sender for `channel` once its last receiver is gone.
    pub async fn release(&self, channel: Channel) {
        let mut channels = self.channels.write().await;
        if channels.get(&channel).is_some_and(|tx| tx.receiver_count() == 0) {
            channels.remove(&channel);
            debug!("Released {}", channel);
        }
    }

    #[cfg(test)]
    async fn open_channels(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[async_trait]
impl RealtimePublisher for RealtimeHub {
    async fn publish(&self, event: RealtimeEvent) -> PortResult<()> {
        let (channel, name) = event.route();
        let sender = self.channels.read().await.get(&channel).cloned();
        let Some(sender) = sender else {
            debug!("No listeners on {}, dropping {}", channel, name);
            return Ok(());
        };

        match sender.send(Arc::new(event)) {
            Ok(receivers) => debug!("Delivered {} on {} to {} receivers", name, channel, receivers),
            Err(_) => {
                // Every receiver is gone; forget the channel until someone subscribes again.
                let mut channels = self.channels.write().await;
                if channels.get(&channel).is_some_and(|tx| tx.receiver_count() == 0) {
                    channels.remove(&channel);
                }
                debug!("Listeners on {} left, dropping {}", channel, name);
            }
        }
        Ok(())
    }
}
