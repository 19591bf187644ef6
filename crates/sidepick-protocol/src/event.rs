//! The realtime event taxonomy: what the Room Service announces on each
//! room's channel after a state transition.

use serde::{Deserialize, Serialize};

use crate::{DivisionResult, RoomCode, RoomSnapshot};

/// Returns the channel name a room's events are published on.
pub fn room_channel(code: &RoomCode) -> String {
    format!("room-{code}")
}

/// A state-change notification for one room.
///
/// Payloads carry the current snapshot so subscribers can render without a
/// re-fetch; the delivery contract stays at-most-once, so clients must be
/// able to re-read the room on demand regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum RoomEvent {
    MemberJoined(RoomSnapshot),
    MemberLeft(RoomSnapshot),
    RoomUpdated(RoomSnapshot),
    RoomClosed,
    TeamsDivided {
        room: RoomSnapshot,
        division: DivisionResult,
    },
}

impl RoomEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::MemberJoined(_) => "member-joined",
            RoomEvent::MemberLeft(_) => "member-left",
            RoomEvent::RoomUpdated(_) => "room-updated",
            RoomEvent::RoomClosed => "room-closed",
            RoomEvent::TeamsDivided { .. } => "teams-divided",
        }
    }

    /// The payload as loose JSON (`{}` for `room-closed`).
    pub fn payload(&self) -> serde_json::Value {
        match self {
            RoomEvent::MemberJoined(room)
            | RoomEvent::MemberLeft(room)
            | RoomEvent::RoomUpdated(room) => {
                serde_json::to_value(room).unwrap_or_default()
            }
            RoomEvent::RoomClosed => serde_json::json!({}),
            RoomEvent::TeamsDivided { room, division } => serde_json::json!({
                "room": room,
                "division": division,
            }),
        }
    }
}
