//! Error types for the protocol layer.

/// Errors raised while parsing wire-level values into their typed forms.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The string is not one of the closed label vocabulary.
    #[error("invalid label: {0:?}")]
    InvalidLabel(String),

    /// The string is not a recognized label rule.
    #[error("invalid label rule: {0:?}")]
    InvalidRule(String),

    /// The string is not a recognized team assignment.
    #[error("invalid team: {0:?}")]
    InvalidTeam(String),

    /// The string is not a recognized room status.
    #[error("invalid room status: {0:?}")]
    InvalidStatus(String),

    /// The string is not a well-formed 6-digit room code.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),
}
