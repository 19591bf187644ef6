//! Error types for the persistence layer.

use sidepick_protocol::{RoomCode, RoomId, UserId};

/// Errors raised by [`RoomStore`](crate::RoomStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The room code is already taken by a live room.
    #[error("room code {0} is already in use")]
    RoomCodeConflict(RoomCode),

    /// The user already has a membership in this room.
    #[error("user {user} is already a member of room {room}")]
    AlreadyMember { room: RoomId, user: UserId },

    /// The targeted room row does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The targeted membership row does not exist.
    #[error("user {user} is not a member of room {room}")]
    MemberNotFound { room: RoomId, user: UserId },

    /// A stored value failed to parse back into its typed form.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Any other database failure.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
