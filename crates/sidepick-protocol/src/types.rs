//! Identifiers and the closed vocabularies of the room domain.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A user's stable identifier, as issued by the external auth provider.
///
/// Opaque to this system: we never parse it, only compare and store it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A room's database identity. Internal only; clients address rooms by
/// [`RoomCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// The human-facing room handle: exactly 6 decimal digits, first digit 1-9.
///
/// Unique among live rooms. Client-supplied codes are validated for shape
/// and then compared literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Validates and wraps a candidate code.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        let mut chars = s.chars();
        let well_formed = s.len() == 6
            && chars.next().is_some_and(|c| ('1'..='9').contains(&c))
            && chars.all(|c| c.is_ascii_digit());
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(ProtocolError::InvalidRoomCode(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Deserialization goes through [`RoomCode::parse`] so malformed codes are
/// rejected at the boundary rather than deep inside a lookup.
impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Label vocabulary
// ---------------------------------------------------------------------------

/// A categorical label attached to a room membership.
///
/// The vocabulary is closed; anything else is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    God,
    Sister,
    Male,
    Boss,
}

impl Label {
    /// Every label, in canonical order.
    pub const ALL: [Label; 4] = [Label::God, Label::Sister, Label::Male, Label::Boss];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::God => "god",
            Label::Sister => "sister",
            Label::Male => "male",
            Label::Boss => "boss",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "god" => Ok(Label::God),
            "sister" => Ok(Label::Sister),
            "male" => Ok(Label::Male),
            "boss" => Ok(Label::Boss),
            other => Err(ProtocolError::InvalidLabel(other.to_string())),
        }
    }
}

/// The partition policy attached to a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelRule {
    /// No constraint, the default for absent entries.
    #[default]
    None,
    /// Bearers should be split evenly across the two teams.
    Even,
    /// All bearers must land in the same team (hard constraint).
    SameTeam,
}

impl FromStr for LabelRule {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(LabelRule::None),
            "even" => Ok(LabelRule::Even),
            "same_team" => Ok(LabelRule::SameTeam),
            other => Err(ProtocolError::InvalidRule(other.to_string())),
        }
    }
}

/// The rules map of a room: label → rule, with absent entries meaning
/// [`LabelRule::None`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelRules(BTreeMap<Label, LabelRule>);

impl LabelRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective rule for a label (absent ⇒ `None`).
    pub fn rule_for(&self, label: Label) -> LabelRule {
        self.0.get(&label).copied().unwrap_or_default()
    }

    pub fn set(&mut self, label: Label, rule: LabelRule) {
        self.0.insert(label, rule);
    }

    /// The unique label carrying the `same_team` hard constraint, if any.
    ///
    /// Rooms never persist more than one (invariant enforced on write), so
    /// the first hit is the only hit.
    pub fn same_team_label(&self) -> Option<Label> {
        self.0
            .iter()
            .find(|(_, rule)| **rule == LabelRule::SameTeam)
            .map(|(label, _)| *label)
    }

    /// How many labels carry `same_team`. Used to reject conflicting maps
    /// before they are persisted.
    pub fn same_team_count(&self) -> usize {
        self.0
            .values()
            .filter(|rule| **rule == LabelRule::SameTeam)
            .count()
    }

    /// Labels whose bearers should be balanced across teams.
    pub fn even_labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.0
            .iter()
            .filter(|(_, rule)| **rule == LabelRule::Even)
            .map(|(label, _)| *label)
    }
}

impl FromIterator<(Label, LabelRule)> for LabelRules {
    fn from_iter<I: IntoIterator<Item = (Label, LabelRule)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Team and room status
// ---------------------------------------------------------------------------

/// Which side of the split a membership is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Not yet divided.
    #[default]
    None,
    TeamA,
    TeamB,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::None => "none",
            Team::TeamA => "team_a",
            Team::TeamB => "team_b",
        }
    }
}

impl FromStr for Team {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Team::None),
            "team_a" => Ok(Team::TeamA),
            "team_b" => Ok(Team::TeamB),
            other => Err(ProtocolError::InvalidTeam(other.to_string())),
        }
    }
}

/// The lifecycle state of a room.
///
/// ```text
///          create              divide
///     ∅  ───────►  waiting  ──────────►  divided
///                    │  ▲                   │
///             close  │  │  redivide         │  close
///                    ▼  └───────────────────┘
///                  closed  (terminal; the row is deleted)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Divided,
    Closed,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Divided => "divided",
            RoomStatus::Closed => "closed",
        }
    }

    /// Whether new members may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, RoomStatus::Waiting)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RoomStatus::Waiting),
            "divided" => Ok(RoomStatus::Divided),
            "closed" => Ok(RoomStatus::Closed),
            other => Err(ProtocolError::InvalidStatus(other.to_string())),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::from("u-123")).unwrap();
        assert_eq!(json, "\"u-123\"");
    }

    #[test]
    fn room_code_accepts_well_formed() {
        let code = RoomCode::parse("123456").unwrap();
        assert_eq!(code.as_str(), "123456");
    }

    #[test]
    fn room_code_rejects_leading_zero() {
        assert!(RoomCode::parse("012345").is_err());
    }

    #[test]
    fn room_code_rejects_wrong_length_and_non_digits() {
        assert!(RoomCode::parse("12345").is_err());
        assert!(RoomCode::parse("1234567").is_err());
        assert!(RoomCode::parse("12a456").is_err());
        assert!(RoomCode::parse("").is_err());
    }

    #[test]
    fn room_code_deserialize_validates() {
        let ok: Result<RoomCode, _> = serde_json::from_str("\"987654\"");
        assert!(ok.is_ok());
        let bad: Result<RoomCode, _> = serde_json::from_str("\"abc\"");
        assert!(bad.is_err());
    }

    #[test]
    fn label_wire_spelling_is_snake_case() {
        assert_eq!(serde_json::to_string(&Label::God).unwrap(), "\"god\"");
        assert_eq!(serde_json::to_string(&Label::Boss).unwrap(), "\"boss\"");
        assert_eq!("sister".parse::<Label>().unwrap(), Label::Sister);
        assert!("wizard".parse::<Label>().is_err());
    }

    #[test]
    fn label_rule_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&LabelRule::SameTeam).unwrap(),
            "\"same_team\""
        );
        assert_eq!("even".parse::<LabelRule>().unwrap(), LabelRule::Even);
        assert!("odd".parse::<LabelRule>().is_err());
    }

    #[test]
    fn team_wire_spelling() {
        assert_eq!(serde_json::to_string(&Team::TeamA).unwrap(), "\"team_a\"");
        assert_eq!("team_b".parse::<Team>().unwrap(), Team::TeamB);
        assert_eq!(Team::default(), Team::None);
    }

    #[test]
    fn status_default_is_waiting() {
        assert_eq!(RoomStatus::default(), RoomStatus::Waiting);
        assert!(RoomStatus::Waiting.is_joinable());
        assert!(!RoomStatus::Divided.is_joinable());
    }

    #[test]
    fn label_rules_defaults_to_none_for_absent() {
        let rules = LabelRules::new();
        assert_eq!(rules.rule_for(Label::God), LabelRule::None);
        assert_eq!(rules.same_team_label(), None);
    }

    #[test]
    fn label_rules_finds_same_team_label() {
        let mut rules = LabelRules::new();
        rules.set(Label::God, LabelRule::Even);
        rules.set(Label::Boss, LabelRule::SameTeam);
        assert_eq!(rules.same_team_label(), Some(Label::Boss));
        assert_eq!(rules.same_team_count(), 1);
        assert_eq!(rules.even_labels().collect::<Vec<_>>(), vec![Label::God]);
    }

    #[test]
    fn label_rules_serializes_as_flat_map() {
        let rules: LabelRules =
            [(Label::God, LabelRule::Even), (Label::Male, LabelRule::None)]
                .into_iter()
                .collect();
        let json: serde_json::Value = serde_json::to_value(&rules).unwrap();
        assert_eq!(json, serde_json::json!({"god": "even", "male": "none"}));
    }
}
