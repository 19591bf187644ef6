//! The room lifecycle state machine.
//!
//! Every operation follows the same shape: acquire the room's lock stripe,
//! load the aggregate, validate preconditions, mutate through the store,
//! drop the stripe, publish. Publication is best-effort and happens after
//! the state transition has committed, so a dropped event can never leave
//! the room inconsistent; subscribers re-read the snapshot on demand.
//!
//! The one ordering exception is [`close_room`](RoomService::close_room),
//! which announces `room-closed` before deleting so subscribers hear about
//! the room while it still exists.

use std::collections::BTreeMap;
use std::sync::{Mutex as StdMutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sidepick_protocol::{
    room_channel, DivisionResult, Label, LabelRule, LabelRules, RoomCode,
    RoomEvent, RoomSnapshot, RoomStatus, Team, UserId, UserProfile,
};
use sidepick_realtime::Publisher;
use sidepick_solver::{split, Candidate, SplitOptions};
use sidepick_store::{NewRoom, RoomAggregate, RoomStore, StoreError};

use crate::locks::LockStripes;
use crate::ServiceError;

/// Default room capacity when the creator does not pick one.
const DEFAULT_MAX_MEMBERS: u32 = 10;

/// Capacity bounds.
const MEMBER_LIMITS: std::ops::RangeInclusive<u32> = 2..=100;

/// Game-name length bounds, in characters.
const NAME_LIMITS: std::ops::RangeInclusive<usize> = 1..=128;

/// How many room codes to sample before giving up on creation.
const CODE_ATTEMPTS: usize = 10;

/// The state machine over rooms, memberships, and divisions.
///
/// Mutations on one room serialize on a per-room lock stripe; rooms are
/// independent. The store and publisher are injected, as is the RNG so the
/// solver and code generation are reproducible under test.
pub struct RoomService<S, P> {
    store: S,
    publisher: P,
    locks: LockStripes,
    rng: StdMutex<StdRng>,
    solver_debug: bool,
}

impl<S: RoomStore, P: Publisher> RoomService<S, P> {
    pub fn new(store: S, publisher: P) -> Self {
        Self::with_rng(store, publisher, StdRng::from_os_rng())
    }

    /// Builds a service over a caller-seeded RNG. Tests pin the seed to make
    /// code generation and team splits deterministic.
    pub fn with_rng(store: S, publisher: P, rng: StdRng) -> Self {
        Self {
            store,
            publisher,
            locks: LockStripes::new(),
            rng: StdMutex::new(rng),
            solver_debug: false,
        }
    }

    /// Enables the solver's trace log (emitted at debug level).
    pub fn with_solver_debug(mut self) -> Self {
        self.solver_debug = true;
        self
    }

    /// Creates or refreshes the caller's user row. The API layer calls this
    /// once per authenticated request so profile changes propagate.
    pub async fn sync_profile(&self, profile: &UserProfile) -> Result<(), ServiceError> {
        self.store.upsert_user(profile).await?;
        Ok(())
    }

    /// Creates a room in `waiting` with the caller as owner and first
    /// member. No event is emitted: the channel has no subscribers yet.
    pub async fn create_room(
        &self,
        owner: &UserId,
        game_name: &str,
        max_members: Option<u32>,
    ) -> Result<RoomSnapshot, ServiceError> {
        if !NAME_LIMITS.contains(&game_name.chars().count()) {
            return Err(ServiceError::Validation(
                "game name must be between 1 and 128 characters".into(),
            ));
        }
        let max_members = max_members.unwrap_or(DEFAULT_MAX_MEMBERS);
        if !MEMBER_LIMITS.contains(&max_members) {
            return Err(ServiceError::Validation(
                "max members must be between 2 and 100".into(),
            ));
        }

        // Serialize on the owner so two concurrent creates cannot both pass
        // the active-room check.
        let _guard = self.locks.acquire(&owner_key(owner)).await;

        if self.store.owned_waiting_room(owner).await?.is_some() {
            return Err(ServiceError::HasActiveRoom);
        }

        for _ in 0..CODE_ATTEMPTS {
            let code = self.generate_code();
            let created = self
                .store
                .create_room(NewRoom {
                    code: code.clone(),
                    game_name: game_name.to_string(),
                    owner_id: owner.clone(),
                    max_members,
                })
                .await;
            match created {
                Ok(aggregate) => {
                    tracing::info!(room = %code, %owner, "room created");
                    return Ok(aggregate.snapshot());
                }
                Err(StoreError::RoomCodeConflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::CodeExhausted)
    }

    /// The full snapshot for a code.
    pub async fn get_room(&self, code: &RoomCode) -> Result<RoomSnapshot, ServiceError> {
        Ok(self.load(code).await?.snapshot())
    }

    /// Adds the caller to a waiting, non-full room and announces it.
    /// Re-joining a room the caller is already in returns the snapshot
    /// without emitting anything.
    pub async fn join_room(
        &self,
        user: &UserId,
        code: &RoomCode,
    ) -> Result<RoomSnapshot, ServiceError> {
        let guard = self.locks.acquire(&room_key(code)).await;

        let aggregate = self.load(code).await?;
        if aggregate.is_member(user) {
            return Ok(aggregate.snapshot());
        }
        if !aggregate.room.status.is_joinable() {
            return Err(ServiceError::RoomNotJoinable);
        }
        if aggregate.member_count() >= aggregate.room.max_members as usize {
            return Err(ServiceError::RoomFull);
        }

        match self.store.add_member(aggregate.room.id, user).await {
            Ok(()) => {}
            // Unreachable under the stripe, but harmless to honor.
            Err(StoreError::AlreadyMember { .. }) => {
                return Ok(self.load(code).await?.snapshot());
            }
            Err(err) => return Err(err.into()),
        }

        let snapshot = self.load(code).await?.snapshot();
        drop(guard);

        tracing::info!(room = %code, %user, "member joined");
        self.publish(code, RoomEvent::MemberJoined(snapshot.clone())).await;
        Ok(snapshot)
    }

    /// Removes the caller from the room. An owner leaving closes the room
    /// instead. Leaving a room the caller is not in is a no-op.
    pub async fn leave_room(&self, user: &UserId, code: &RoomCode) -> Result<(), ServiceError> {
        let aggregate = self.load(code).await?;
        if aggregate.is_owner(user) {
            return self.close_room(user, code).await;
        }

        let guard = self.locks.acquire(&room_key(code)).await;
        let aggregate = self.load(code).await?;
        let removed = self.store.remove_member(aggregate.room.id, user).await?;
        let snapshot = self.load(code).await?.snapshot();
        drop(guard);

        if removed {
            tracing::info!(room = %code, %user, "member left");
            self.publish(code, RoomEvent::MemberLeft(snapshot)).await;
        }
        Ok(())
    }

    /// Owner-only: removes another member from the room.
    pub async fn remove_member(
        &self,
        owner: &UserId,
        code: &RoomCode,
        member: &UserId,
    ) -> Result<(), ServiceError> {
        let guard = self.locks.acquire(&room_key(code)).await;

        let aggregate = self.load(code).await?;
        if !aggregate.is_owner(owner) {
            return Err(ServiceError::NotOwner);
        }
        if member == owner {
            return Err(ServiceError::CannotRemoveOwner);
        }
        if !aggregate.is_member(member) {
            return Err(ServiceError::MemberNotFound);
        }

        self.store.remove_member(aggregate.room.id, member).await?;
        let snapshot = self.load(code).await?.snapshot();
        drop(guard);

        tracing::info!(room = %code, %member, "member removed by owner");
        self.publish(code, RoomEvent::MemberLeft(snapshot)).await;
        Ok(())
    }

    /// Owner-only: announces `room-closed`, then deletes the room and its
    /// memberships. The announcement goes first so subscribers hear it on a
    /// channel whose room still exists.
    pub async fn close_room(&self, owner: &UserId, code: &RoomCode) -> Result<(), ServiceError> {
        let key = room_key(code);
        let guard = self.locks.acquire(&key).await;

        let aggregate = self.load(code).await?;
        if !aggregate.is_owner(owner) {
            return Err(ServiceError::NotOwner);
        }

        self.publish(code, RoomEvent::RoomClosed).await;
        self.store.delete_room(aggregate.room.id).await?;
        drop(guard);
        self.locks.discard(&key);

        tracing::info!(room = %code, %owner, "room closed");
        Ok(())
    }

    /// Owner-only: replaces a member's labels and announces `room-updated`.
    /// Duplicates collapse to the first occurrence.
    pub async fn set_member_labels(
        &self,
        owner: &UserId,
        code: &RoomCode,
        member: &UserId,
        labels: &[String],
    ) -> Result<(), ServiceError> {
        let mut parsed: Vec<Label> = Vec::with_capacity(labels.len());
        for raw in labels {
            let label: Label = raw
                .parse()
                .map_err(|_| ServiceError::InvalidLabel(raw.clone()))?;
            if !parsed.contains(&label) {
                parsed.push(label);
            }
        }

        let guard = self.locks.acquire(&room_key(code)).await;

        let aggregate = self.load(code).await?;
        if !aggregate.is_owner(owner) {
            return Err(ServiceError::NotOwner);
        }
        if !aggregate.is_member(member) {
            return Err(ServiceError::MemberNotFound);
        }

        self.store
            .update_member_labels(aggregate.room.id, member, &parsed)
            .await?;
        let snapshot = self.load(code).await?.snapshot();
        drop(guard);

        tracing::debug!(room = %code, %member, ?parsed, "labels updated");
        self.publish(code, RoomEvent::RoomUpdated(snapshot)).await;
        Ok(())
    }

    /// Owner-only: replaces the room's rules map and announces
    /// `room-updated`. At most one label may carry `same_team`.
    pub async fn set_label_rules(
        &self,
        owner: &UserId,
        code: &RoomCode,
        rules: &BTreeMap<String, String>,
    ) -> Result<(), ServiceError> {
        let mut parsed = LabelRules::new();
        for (raw_label, raw_rule) in rules {
            let label: Label = raw_label
                .parse()
                .map_err(|_| ServiceError::InvalidLabel(raw_label.clone()))?;
            let rule: LabelRule = raw_rule
                .parse()
                .map_err(|_| ServiceError::InvalidRule(raw_rule.clone()))?;
            parsed.set(label, rule);
        }
        if parsed.same_team_count() > 1 {
            return Err(ServiceError::ConflictingRules);
        }

        let guard = self.locks.acquire(&room_key(code)).await;

        let aggregate = self.load(code).await?;
        if !aggregate.is_owner(owner) {
            return Err(ServiceError::NotOwner);
        }

        self.store
            .update_label_rules(aggregate.room.id, &parsed)
            .await?;
        let snapshot = self.load(code).await?.snapshot();
        drop(guard);

        tracing::debug!(room = %code, "label rules updated");
        self.publish(code, RoomEvent::RoomUpdated(snapshot)).await;
        Ok(())
    }

    /// Owner-only: runs the solver over the current members, persists the
    /// split, and announces `teams-divided`.
    pub async fn divide_teams(
        &self,
        owner: &UserId,
        code: &RoomCode,
    ) -> Result<DivisionResult, ServiceError> {
        let guard = self.locks.acquire(&room_key(code)).await;
        let (snapshot, division) = self.divide_locked(owner, code).await?;
        drop(guard);

        self.publish(
            code,
            RoomEvent::TeamsDivided {
                room: snapshot,
                division: division.clone(),
            },
        )
        .await;
        Ok(division)
    }

    /// Owner-only: resets a divided room to `waiting` and divides again.
    pub async fn redivide_teams(
        &self,
        owner: &UserId,
        code: &RoomCode,
    ) -> Result<DivisionResult, ServiceError> {
        let guard = self.locks.acquire(&room_key(code)).await;

        let aggregate = self.load(code).await?;
        if !aggregate.is_owner(owner) {
            return Err(ServiceError::NotOwner);
        }
        if aggregate.room.status == RoomStatus::Divided {
            self.store.clear_division(aggregate.room.id).await?;
        }

        let (snapshot, division) = self.divide_locked(owner, code).await?;
        drop(guard);

        self.publish(
            code,
            RoomEvent::TeamsDivided {
                room: snapshot,
                division: division.clone(),
            },
        )
        .await;
        Ok(division)
    }

    /// The cached division result, or one reconstructed from the members'
    /// team columns when no cache exists.
    pub async fn get_division_result(
        &self,
        code: &RoomCode,
    ) -> Result<DivisionResult, ServiceError> {
        let aggregate = self.load(code).await?;
        Ok(match &aggregate.room.division {
            Some(cached) => cached.clone(),
            None => aggregate.division_from_teams(),
        })
    }

    /// The caller's live owned room, if any.
    pub async fn my_owned_room(
        &self,
        user: &UserId,
    ) -> Result<Option<RoomSnapshot>, ServiceError> {
        Ok(self
            .store
            .owned_room(user)
            .await?
            .map(|aggregate| aggregate.snapshot()))
    }

    /// The first live room the caller joined without owning, if any.
    pub async fn my_joined_room(
        &self,
        user: &UserId,
    ) -> Result<Option<RoomSnapshot>, ServiceError> {
        Ok(self
            .store
            .joined_room(user)
            .await?
            .map(|aggregate| aggregate.snapshot()))
    }

    // -- internals --

    async fn load(&self, code: &RoomCode) -> Result<RoomAggregate, ServiceError> {
        self.store
            .room_by_code(code)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// The divide transition proper. Caller holds the room stripe.
    async fn divide_locked(
        &self,
        owner: &UserId,
        code: &RoomCode,
    ) -> Result<(RoomSnapshot, DivisionResult), ServiceError> {
        let aggregate = self.load(code).await?;
        if !aggregate.is_owner(owner) {
            return Err(ServiceError::NotOwner);
        }
        if aggregate.room.status != RoomStatus::Waiting {
            return Err(ServiceError::WrongStatus);
        }
        if aggregate.member_count() < 2 {
            return Err(ServiceError::TooFewMembers);
        }

        let candidates: Vec<Candidate> = aggregate
            .members
            .iter()
            .map(|member| Candidate {
                name: member.nickname.clone(),
                labels: member.labels.clone(),
            })
            .collect();

        let outcome = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            split(
                &candidates,
                &aggregate.room.label_rules,
                SplitOptions {
                    debug: self.solver_debug,
                },
                &mut *rng,
            )
        };
        for line in &outcome.trace {
            tracing::debug!(room = %code, "solver: {line}");
        }

        let mut assignments: Vec<(UserId, Team)> =
            Vec::with_capacity(aggregate.member_count());
        let mut division = DivisionResult::default();
        for &index in &outcome.team_a {
            let member = &aggregate.members[index];
            assignments.push((member.user_id.clone(), Team::TeamA));
            division.team_a.push(member.team_member());
        }
        for &index in &outcome.team_b {
            let member = &aggregate.members[index];
            assignments.push((member.user_id.clone(), Team::TeamB));
            division.team_b.push(member.team_member());
        }

        self.store
            .apply_division(aggregate.room.id, &assignments, &division)
            .await?;

        tracing::info!(
            room = %code,
            team_a = division.team_a.len(),
            team_b = division.team_b.len(),
            "teams divided"
        );
        let snapshot = self.load(code).await?.snapshot();
        Ok((snapshot, division))
    }

    fn generate_code(&self) -> RoomCode {
        loop {
            let number: u32 = {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                rng.random_range(100_000..1_000_000)
            };
            if let Ok(code) = RoomCode::parse(&number.to_string()) {
                return code;
            }
        }
    }

    async fn publish(&self, code: &RoomCode, event: RoomEvent) {
        let channel = room_channel(code);
        if let Err(err) = self.publisher.publish(&channel, &event).await {
            tracing::warn!(%channel, error = %err, "event dropped");
        }
    }
}

fn room_key(code: &RoomCode) -> String {
    format!("room:{code}")
}

fn owner_key(user: &UserId) -> String {
    format!("owner:{user}")
}
