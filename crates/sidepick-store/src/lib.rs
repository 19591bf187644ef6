//! Persistence for Sidepick rooms, memberships, and user projections.
//!
//! The [`RoomStore`] trait is the repository contract the room service
//! mutates through; [`SqliteStore`] is the bundled implementation. Every
//! mutation is a single transaction: it commits atomically or fails, and
//! partial updates are never visible. Serialization of whole
//! load-validate-mutate sequences is the caller's job (the room service
//! holds a per-room lock across them).

mod error;
mod records;
mod sqlite;

pub use error::StoreError;
pub use records::{MemberRecord, NewRoom, RoomAggregate, RoomRecord};
pub use sqlite::SqliteStore;

use std::future::Future;

use sidepick_protocol::{
    DivisionResult, Label, LabelRules, RoomCode, RoomId, Team, UserId,
    UserProfile,
};

/// Typed CRUD over rooms, memberships, and users.
///
/// Methods return explicitly `Send` futures so callers can be spawned onto
/// the runtime; implementations just write `async fn`.
pub trait RoomStore: Send + Sync + 'static {
    /// Creates the user on first sight, refreshes nickname/avatar after.
    fn upsert_user(
        &self,
        profile: &UserProfile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persists a new room together with its owner membership.
    ///
    /// Fails with [`StoreError::RoomCodeConflict`] if the code is taken.
    fn create_room(
        &self,
        new_room: NewRoom,
    ) -> impl Future<Output = Result<RoomAggregate, StoreError>> + Send;

    /// The full aggregate for a code, or `None`.
    fn room_by_code(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<RoomAggregate>, StoreError>> + Send;

    /// A `waiting` room owned by the user, or `None`.
    fn owned_waiting_room(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<RoomAggregate>, StoreError>> + Send;

    /// The newest live room the user owns in any status, or `None`.
    fn owned_room(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<RoomAggregate>, StoreError>> + Send;

    /// The first live room the user belongs to without owning, or `None`.
    fn joined_room(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<RoomAggregate>, StoreError>> + Send;

    /// Inserts a membership with team `none`.
    ///
    /// Fails with [`StoreError::AlreadyMember`] on a duplicate.
    fn add_member(
        &self,
        room: RoomId,
        user: &UserId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes a membership. Idempotent; returns whether a row was removed.
    fn remove_member(
        &self,
        room: RoomId,
        user: &UserId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Replaces a member's label set.
    fn update_member_labels(
        &self,
        room: RoomId,
        user: &UserId,
        labels: &[Label],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replaces the room's rules map.
    fn update_label_rules(
        &self,
        room: RoomId,
        rules: &LabelRules,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Applies a divide in one transaction: every member's team, the room
    /// status (`divided`) and the cached result.
    fn apply_division(
        &self,
        room: RoomId,
        assignments: &[(UserId, Team)],
        result: &DivisionResult,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Undoes a divide in one transaction: all teams back to `none`, status
    /// back to `waiting`, cached result cleared.
    fn clear_division(
        &self,
        room: RoomId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes the room; memberships go with it.
    fn delete_room(&self, room: RoomId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
