//! Core data model and wire types for Sidepick.
//!
//! Everything that crosses a boundary lives here: identifiers, the label
//! vocabulary and its partition rules, room lifecycle states, the aggregated
//! room snapshot returned by the API, and the realtime event taxonomy.
//! The crate is pure data: serde in, serde out, no I/O.

mod error;
mod event;
mod snapshot;
mod types;

pub use error::ProtocolError;
pub use event::{room_channel, RoomEvent};
pub use snapshot::{
    format_timestamp, DivisionResult, MemberSnapshot, RoomSnapshot, TeamMember,
    UserProfile,
};
pub use types::{
    Label, LabelRule, LabelRules, RoomCode, RoomId, RoomStatus, Team, UserId,
};
