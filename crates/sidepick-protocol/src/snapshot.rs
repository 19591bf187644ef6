//! The aggregated read models returned by the API and carried in events.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{Label, LabelRules, RoomCode, RoomId, RoomStatus, Team, UserId};

/// A user as projected into room payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub nickname: String,
    pub avatar_url: String,
}

/// One membership inside a room snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSnapshot {
    /// The member's user id (memberships are addressed by user, not by row).
    pub id: UserId,
    pub nickname: String,
    pub avatar_url: String,
    pub team: Team,
    pub labels: Vec<Label>,
    /// RFC 3339.
    pub joined_at: String,
}

/// The full aggregated read model of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub room_code: RoomCode,
    pub game_name: String,
    pub status: RoomStatus,
    pub max_members: u32,
    pub owner_id: UserId,
    pub label_rules: LabelRules,
    pub owner: Option<UserProfile>,
    pub members: Vec<MemberSnapshot>,
    pub member_count: usize,
    /// RFC 3339.
    pub created_at: String,
}

/// A member as projected into a division result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: UserId,
    pub nickname: String,
    pub avatar_url: String,
    pub labels: Vec<Label>,
}

/// The outcome of a divide: two disjoint ordered teams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionResult {
    #[serde(rename = "teamA")]
    pub team_a: Vec<TeamMember>,
    #[serde(rename = "teamB")]
    pub team_b: Vec<TeamMember>,
}

impl DivisionResult {
    pub fn member_count(&self) -> usize {
        self.team_a.len() + self.team_b.len()
    }
}

/// Renders a unix-seconds timestamp as RFC 3339.
///
/// Out-of-range values (never produced by this system's own clock) fall back
/// to the epoch rather than failing a read path.
pub fn format_timestamp(unix_seconds: i64) -> String {
    let ts = OffsetDateTime::from_unix_timestamp(unix_seconds)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabelRule;

    fn sample_snapshot() -> RoomSnapshot {
        RoomSnapshot {
            id: RoomId(7),
            room_code: RoomCode::parse("123456").unwrap(),
            game_name: "werewolf".into(),
            status: RoomStatus::Waiting,
            max_members: 10,
            owner_id: UserId::from("u-1"),
            label_rules: [(Label::God, LabelRule::Even)].into_iter().collect(),
            owner: Some(UserProfile {
                id: UserId::from("u-1"),
                nickname: "alice".into(),
                avatar_url: "https://cdn/a.png".into(),
            }),
            members: vec![MemberSnapshot {
                id: UserId::from("u-1"),
                nickname: "alice".into(),
                avatar_url: "https://cdn/a.png".into(),
                team: Team::None,
                labels: vec![Label::God],
                joined_at: format_timestamp(1_700_000_000),
            }],
            member_count: 1,
            created_at: format_timestamp(1_700_000_000),
        }
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let json: serde_json::Value =
            serde_json::to_value(sample_snapshot()).unwrap();
        assert_eq!(json["roomCode"], "123456");
        assert_eq!(json["gameName"], "werewolf");
        assert_eq!(json["maxMembers"], 10);
        assert_eq!(json["ownerId"], "u-1");
        assert_eq!(json["memberCount"], 1);
        assert_eq!(json["labelRules"]["god"], "even");
        assert_eq!(json["members"][0]["avatarUrl"], "https://cdn/a.png");
        assert_eq!(json["members"][0]["team"], "none");
    }

    #[test]
    fn snapshot_round_trips() {
        let snapshot = sample_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: RoomSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn division_result_uses_team_a_team_b_keys() {
        let result = DivisionResult {
            team_a: vec![TeamMember {
                id: UserId::from("u-1"),
                nickname: "alice".into(),
                avatar_url: String::new(),
                labels: vec![],
            }],
            team_b: vec![],
        };
        let json: serde_json::Value = serde_json::to_value(&result).unwrap();
        assert!(json.get("teamA").is_some());
        assert!(json.get("teamB").is_some());
        assert_eq!(result.member_count(), 1);
    }

    #[test]
    fn timestamp_renders_rfc3339() {
        let rendered = format_timestamp(0);
        assert_eq!(rendered, "1970-01-01T00:00:00Z");
    }
}
