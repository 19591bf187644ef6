//! Typed rows and the aggregated read model the repository hands out.

use sidepick_protocol::{
    format_timestamp, DivisionResult, Label, LabelRules, MemberSnapshot,
    RoomCode, RoomId, RoomSnapshot, RoomStatus, Team, TeamMember, UserId,
    UserProfile,
};

/// Input for room creation. The owner's user row must already exist; the
/// owner membership is inserted in the same transaction as the room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub code: RoomCode,
    pub game_name: String,
    pub owner_id: UserId,
    pub max_members: u32,
}

/// One persisted room.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub id: RoomId,
    pub code: RoomCode,
    pub game_name: String,
    pub owner_id: UserId,
    pub status: RoomStatus,
    pub max_members: u32,
    pub label_rules: LabelRules,
    pub division: Option<DivisionResult>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One persisted membership, already joined with its user projection.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub user_id: UserId,
    pub nickname: String,
    pub avatar_url: String,
    pub team: Team,
    pub labels: Vec<Label>,
    pub joined_at: i64,
}

/// The full aggregate: room + ordered members + owner projection.
#[derive(Debug, Clone)]
pub struct RoomAggregate {
    pub room: RoomRecord,
    pub members: Vec<MemberRecord>,
    pub owner: Option<UserProfile>,
}

impl RoomAggregate {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, user: &UserId) -> Option<&MemberRecord> {
        self.members.iter().find(|m| &m.user_id == user)
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.member(user).is_some()
    }

    pub fn is_owner(&self, user: &UserId) -> bool {
        &self.room.owner_id == user
    }

    /// Projects the aggregate into the API read model.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.room.id,
            room_code: self.room.code.clone(),
            game_name: self.room.game_name.clone(),
            status: self.room.status,
            max_members: self.room.max_members,
            owner_id: self.room.owner_id.clone(),
            label_rules: self.room.label_rules.clone(),
            owner: self.owner.clone(),
            members: self.members.iter().map(MemberRecord::snapshot).collect(),
            member_count: self.members.len(),
            created_at: format_timestamp(self.room.created_at),
        }
    }

    /// Rebuilds a division result from the persisted team columns, for
    /// rooms whose cached result is absent.
    pub fn division_from_teams(&self) -> DivisionResult {
        let mut result = DivisionResult::default();
        for member in &self.members {
            match member.team {
                Team::TeamA => result.team_a.push(member.team_member()),
                Team::TeamB => result.team_b.push(member.team_member()),
                Team::None => {}
            }
        }
        result
    }
}

impl MemberRecord {
    pub fn snapshot(&self) -> MemberSnapshot {
        MemberSnapshot {
            id: self.user_id.clone(),
            nickname: self.nickname.clone(),
            avatar_url: self.avatar_url.clone(),
            team: self.team,
            labels: self.labels.clone(),
            joined_at: format_timestamp(self.joined_at),
        }
    }

    pub fn team_member(&self) -> TeamMember {
        TeamMember {
            id: self.user_id.clone(),
            nickname: self.nickname.clone(),
            avatar_url: self.avatar_url.clone(),
            labels: self.labels.clone(),
        }
    }
}
