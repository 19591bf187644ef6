//! SQLite-backed [`RoomStore`] via sqlx.
//!
//! Rooms, members, and users live in three tables; label sets, rules maps,
//! and cached division results are stored as JSON text columns. The schema
//! is created idempotently on connect. Closed rooms are physically deleted,
//! so a plain unique index on `rooms.code` is exactly the "unique among
//! live rooms" rule.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use sidepick_protocol::{
    DivisionResult, Label, LabelRules, RoomCode, RoomId, Team, UserId,
    UserProfile,
};

use crate::records::{MemberRecord, NewRoom, RoomAggregate, RoomRecord};
use crate::{RoomStore, StoreError};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id          TEXT PRIMARY KEY,
        nickname    TEXT NOT NULL,
        avatar_url  TEXT NOT NULL DEFAULT '',
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS rooms (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        code        TEXT NOT NULL,
        game_name   TEXT NOT NULL,
        owner_id    TEXT NOT NULL REFERENCES users(id),
        status      TEXT NOT NULL DEFAULT 'waiting',
        max_members INTEGER NOT NULL,
        label_rules TEXT NOT NULL DEFAULT '{}',
        division    TEXT,
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS rooms_code ON rooms(code)",
    "CREATE TABLE IF NOT EXISTS members (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id    INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
        user_id    TEXT NOT NULL REFERENCES users(id),
        team       TEXT NOT NULL DEFAULT 'none',
        labels     TEXT NOT NULL DEFAULT '[]',
        joined_at  INTEGER NOT NULL,
        UNIQUE(room_id, user_id)
    )",
    "CREATE INDEX IF NOT EXISTS members_user ON members(user_id)",
];

/// SQLite implementation of the repository contract.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database at `url` and runs the schema pass.
    ///
    /// `url` is a sqlx SQLite URL, e.g. `sqlite://sidepick.db`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(%url, "store connected");
        Ok(store)
    }

    /// An in-memory database for tests. Single connection, because an in-memory
    /// SQLite database exists per connection, so the pool must never open
    /// a second one or recycle the first.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn load_aggregate(
        &self,
        room: RoomRecord,
    ) -> Result<RoomAggregate, StoreError> {
        let member_rows: Vec<MemberRow> = sqlx::query_as(
            "SELECT m.user_id, u.nickname, u.avatar_url, m.team, m.labels, m.joined_at
             FROM members m JOIN users u ON u.id = m.user_id
             WHERE m.room_id = ? ORDER BY m.joined_at, m.id",
        )
        .bind(room.id.0)
        .fetch_all(&self.pool)
        .await?;

        let members = member_rows
            .into_iter()
            .map(MemberRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        let owner: Option<UserRow> =
            sqlx::query_as("SELECT id, nickname, avatar_url FROM users WHERE id = ?")
                .bind(room.owner_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(RoomAggregate {
            room,
            members,
            owner: owner.map(UserRow::into_profile),
        })
    }

    async fn room_row_to_aggregate(
        &self,
        row: Option<RoomRow>,
    ) -> Result<Option<RoomAggregate>, StoreError> {
        match row {
            Some(row) => {
                let record = row.into_record()?;
                Ok(Some(self.load_aggregate(record).await?))
            }
            None => Ok(None),
        }
    }
}

impl RoomStore for SqliteStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let now = now_unix();
        sqlx::query(
            "INSERT INTO users (id, nickname, avatar_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                nickname = excluded.nickname,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at",
        )
        .bind(profile.id.as_str())
        .bind(&profile.nickname)
        .bind(&profile.avatar_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomAggregate, StoreError> {
        let now = now_unix();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO rooms (code, game_name, owner_id, status, max_members,
                                label_rules, created_at, updated_at)
             VALUES (?, ?, ?, 'waiting', ?, '{}', ?, ?)",
        )
        .bind(new_room.code.as_str())
        .bind(&new_room.game_name)
        .bind(new_room.owner_id.as_str())
        .bind(new_room.max_members as i64)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::RoomCodeConflict(new_room.code.clone())
            } else {
                StoreError::Database(err)
            }
        })?;
        let room_id = RoomId(inserted.last_insert_rowid());

        sqlx::query(
            "INSERT INTO members (room_id, user_id, team, labels, joined_at)
             VALUES (?, ?, 'none', '[]', ?)",
        )
        .bind(room_id.0)
        .bind(new_room.owner_id.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(room = %new_room.code, owner = %new_room.owner_id, "room created");

        self.room_by_code(&new_room.code)
            .await?
            .ok_or(StoreError::RoomNotFound(room_id))
    }

    async fn room_by_code(&self, code: &RoomCode) -> Result<Option<RoomAggregate>, StoreError> {
        let row: Option<RoomRow> = sqlx::query_as("SELECT * FROM rooms WHERE code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        self.room_row_to_aggregate(row).await
    }

    async fn owned_waiting_room(&self, user: &UserId) -> Result<Option<RoomAggregate>, StoreError> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT * FROM rooms WHERE owner_id = ? AND status = 'waiting' LIMIT 1",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;
        self.room_row_to_aggregate(row).await
    }

    async fn owned_room(&self, user: &UserId) -> Result<Option<RoomAggregate>, StoreError> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT * FROM rooms WHERE owner_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;
        self.room_row_to_aggregate(row).await
    }

    async fn joined_room(&self, user: &UserId) -> Result<Option<RoomAggregate>, StoreError> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT r.* FROM rooms r JOIN members m ON m.room_id = r.id
             WHERE m.user_id = ? AND r.owner_id <> ?
             ORDER BY m.joined_at, m.id LIMIT 1",
        )
        .bind(user.as_str())
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;
        self.room_row_to_aggregate(row).await
    }

    async fn add_member(&self, room: RoomId, user: &UserId) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO members (room_id, user_id, team, labels, joined_at)
             VALUES (?, ?, 'none', '[]', ?)",
        )
        .bind(room.0)
        .bind(user.as_str())
        .bind(now_unix())
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::AlreadyMember {
                    room,
                    user: user.clone(),
                }
            } else {
                StoreError::Database(err)
            }
        })?;
        Ok(())
    }

    async fn remove_member(&self, room: RoomId, user: &UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM members WHERE room_id = ? AND user_id = ?")
            .bind(room.0)
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_member_labels(
        &self,
        room: RoomId,
        user: &UserId,
        labels: &[Label],
    ) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(labels)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let result = sqlx::query("UPDATE members SET labels = ? WHERE room_id = ? AND user_id = ?")
            .bind(encoded)
            .bind(room.0)
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MemberNotFound {
                room,
                user: user.clone(),
            });
        }
        Ok(())
    }

    async fn update_label_rules(&self, room: RoomId, rules: &LabelRules) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(rules)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let result = sqlx::query("UPDATE rooms SET label_rules = ?, updated_at = ? WHERE id = ?")
            .bind(encoded)
            .bind(now_unix())
            .bind(room.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RoomNotFound(room));
        }
        Ok(())
    }

    async fn apply_division(
        &self,
        room: RoomId,
        assignments: &[(UserId, Team)],
        result: &DivisionResult,
    ) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(result)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut tx = self.pool.begin().await?;

        for (user, team) in assignments {
            let updated = sqlx::query("UPDATE members SET team = ? WHERE room_id = ? AND user_id = ?")
                .bind(team.as_str())
                .bind(room.0)
                .bind(user.as_str())
                .execute(&mut *tx)
                .await?;
            if updated.rows_affected() == 0 {
                return Err(StoreError::MemberNotFound {
                    room,
                    user: user.clone(),
                });
            }
        }

        let updated = sqlx::query(
            "UPDATE rooms SET status = 'divided', division = ?, updated_at = ? WHERE id = ?",
        )
        .bind(encoded)
        .bind(now_unix())
        .bind(room.0)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::RoomNotFound(room));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear_division(&self, room: RoomId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE members SET team = 'none' WHERE room_id = ?")
            .bind(room.0)
            .execute(&mut *tx)
            .await?;
        let updated = sqlx::query(
            "UPDATE rooms SET status = 'waiting', division = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(now_unix())
        .bind(room.0)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::RoomNotFound(room));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_room(&self, room: RoomId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(room.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: i64,
    code: String,
    game_name: String,
    owner_id: String,
    status: String,
    max_members: i64,
    label_rules: String,
    division: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl RoomRow {
    fn into_record(self) -> Result<RoomRecord, StoreError> {
        let corrupt = |what: &str| StoreError::Corrupt(format!("room {}: {what}", self.id));
        Ok(RoomRecord {
            id: RoomId(self.id),
            code: RoomCode::parse(&self.code).map_err(|_| corrupt("code"))?,
            game_name: self.game_name.clone(),
            owner_id: UserId(self.owner_id.clone()),
            status: self.status.parse().map_err(|_| corrupt("status"))?,
            max_members: self.max_members as u32,
            label_rules: serde_json::from_str(&self.label_rules)
                .map_err(|_| corrupt("label_rules"))?,
            division: match &self.division {
                Some(json) => {
                    Some(serde_json::from_str(json).map_err(|_| corrupt("division"))?)
                }
                None => None,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    user_id: String,
    nickname: String,
    avatar_url: String,
    team: String,
    labels: String,
    joined_at: i64,
}

impl MemberRow {
    fn into_record(self) -> Result<MemberRecord, StoreError> {
        let corrupt =
            |what: &str| StoreError::Corrupt(format!("member {}: {what}", self.user_id));
        Ok(MemberRecord {
            user_id: UserId(self.user_id.clone()),
            nickname: self.nickname.clone(),
            avatar_url: self.avatar_url.clone(),
            team: self.team.parse().map_err(|_| corrupt("team"))?,
            labels: serde_json::from_str(&self.labels).map_err(|_| corrupt("labels"))?,
            joined_at: self.joined_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    nickname: String,
    avatar_url: String,
}

impl UserRow {
    fn into_profile(self) -> UserProfile {
        UserProfile {
            id: UserId(self.id),
            nickname: self.nickname,
            avatar_url: self.avatar_url,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
