//! The room lifecycle state machine for Sidepick.
//!
//! [`RoomService`] validates invariants, mutates room state through the
//! injected [`RoomStore`](sidepick_store::RoomStore), drives the partition
//! solver for divides, and announces every committed transition through the
//! injected [`Publisher`](sidepick_realtime::Publisher).

mod error;
mod locks;
mod service;

pub use error::ServiceError;
pub use service::RoomService;
