//! The unified error taxonomy of the room service.

use sidepick_store::StoreError;

/// Everything a room-service operation can fail with.
///
/// Validation failures carry a message fit for showing to a user; storage
/// failures stay opaque (the API layer surfaces them as internal errors).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Room or membership absent.
    #[error("room not found")]
    NotFound,

    /// Owner-only operation attempted by a non-owner.
    #[error("only the room owner may do this")]
    NotOwner,

    /// Join attempted on a room that is not in `waiting`.
    #[error("this room is not accepting members")]
    RoomNotJoinable,

    /// Join attempted on a room at capacity.
    #[error("this room is full")]
    RoomFull,

    /// Create attempted while the caller already owns a waiting room.
    #[error("you already have an active room")]
    HasActiveRoom,

    /// Divide attempted outside `waiting`.
    #[error("teams can only be divided while the room is waiting")]
    WrongStatus,

    /// Divide attempted with fewer than two members.
    #[error("at least two members are needed to divide teams")]
    TooFewMembers,

    /// A label outside the vocabulary.
    #[error("unknown label: {0:?}")]
    InvalidLabel(String),

    /// A rule outside the vocabulary.
    #[error("unknown label rule: {0:?}")]
    InvalidRule(String),

    /// More than one label set to `same_team`.
    #[error("only one label may be bound to the same-team rule")]
    ConflictingRules,

    /// The owner tried to remove themself.
    #[error("the owner cannot be removed from the room")]
    CannotRemoveOwner,

    /// The targeted member is not in the room.
    #[error("that user is not a member of this room")]
    MemberNotFound,

    /// An argument failed range validation.
    #[error("{0}")]
    Validation(String),

    /// Ten generated codes in a row collided with live rooms.
    #[error("could not allocate a room code, try again")]
    CodeExhausted,

    /// Any other storage failure.
    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(_) => ServiceError::NotFound,
            StoreError::MemberNotFound { .. } => ServiceError::MemberNotFound,
            other => ServiceError::Store(other),
        }
    }
}
