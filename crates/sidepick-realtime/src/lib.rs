//! Named-channel event fan-out.
//!
//! The room service publishes [`RoomEvent`]s onto per-room channels through
//! the [`Publisher`] trait; subscribers attach by channel name and receive
//! whatever is published while they are attached. Delivery is best-effort
//! and at-most-once: a publish failure is the publisher's problem to log,
//! never the room service's problem to handle, and late subscribers see
//! nothing retroactively.
//!
//! [`BroadcastHub`] is the in-process implementation. A deployment fronting
//! an external pub/sub service implements [`Publisher`] over its client
//! instead.

mod hub;

pub use hub::BroadcastHub;

use std::future::Future;

use sidepick_protocol::RoomEvent;

/// A failed delivery attempt.
///
/// Callers on the room-service path log these and move on; state has
/// already been committed by the time anything is published.
#[derive(Debug, thiserror::Error)]
#[error("publish to {channel} failed: {reason}")]
pub struct PublishError {
    pub channel: String,
    pub reason: String,
}

/// Fan-out seam between the room service and whatever delivers events.
///
/// `publish` returns an explicitly `Send` future so service operations
/// awaiting it can be spawned onto the runtime; implementations just write
/// `async fn`.
pub trait Publisher: Send + Sync + 'static {
    /// Delivers `event` to the current subscribers of `channel`.
    fn publish(
        &self,
        channel: &str,
        event: &RoomEvent,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Shared publishers publish like their inner value.
impl<P: Publisher> Publisher for std::sync::Arc<P> {
    async fn publish(&self, channel: &str, event: &RoomEvent) -> Result<(), PublishError> {
        self.as_ref().publish(channel, event).await
    }
}

/// A publisher that drops everything. For tests that don't observe events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl Publisher for NullPublisher {
    async fn publish(&self, _channel: &str, _event: &RoomEvent) -> Result<(), PublishError> {
        Ok(())
    }
}
