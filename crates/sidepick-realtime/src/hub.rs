//! In-process broadcast hub: one `tokio::sync::broadcast` channel per room.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

use sidepick_protocol::RoomEvent;

use crate::{PublishError, Publisher};

/// Per-subscriber buffer depth. A subscriber that lags beyond this many
/// events starts losing the oldest ones, which the at-most-once contract
/// permits; clients re-fetch the snapshot.
const DEFAULT_CAPACITY: usize = 64;

/// Multi-subscriber fan-out keyed by channel name.
///
/// Subscription churn is rare next to publishes, hence the reader-writer
/// lock: publishes take the read side, attach/detach take the write side.
pub struct BroadcastHub {
    channels: RwLock<HashMap<String, broadcast::Sender<RoomEvent>>>,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Attaches to a channel. Events published after this call (and only
    /// those) arrive on the returned receiver; detaching is dropping it.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<RoomEvent> {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of channels with at least one live subscriber entry.
    pub fn channel_count(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops the channel entry once its last receiver is gone.
    fn prune(&self, channel: &str) {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = channels.get(channel) {
            if sender.receiver_count() == 0 {
                channels.remove(channel);
            }
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for BroadcastHub {
    async fn publish(&self, channel: &str, event: &RoomEvent) -> Result<(), PublishError> {
        let delivery = {
            let channels = self
                .channels
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            channels.get(channel).map(|sender| sender.send(event.clone()))
        };

        match delivery {
            Some(Ok(receivers)) => {
                tracing::debug!(%channel, event = event.name(), receivers, "published");
            }
            Some(Err(_)) => {
                // Every receiver detached since the channel was created.
                tracing::debug!(%channel, event = event.name(), "no subscribers left");
                self.prune(channel);
            }
            None => {
                tracing::trace!(%channel, event = event.name(), "no such channel");
            }
        }
        Ok(())
    }
}
