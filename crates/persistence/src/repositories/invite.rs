//! Invite repository: the durable store of role invites.
//!
//! Every write is a single statement on a single row, so SQLite's writer
//! lock makes each one atomic. Counter updates are expressed in SQL
//! (`uses = uses + 1`) rather than read-modify-write in the caller, so
//! concurrent attributions cannot lose updates.

use domain::models::InviteRecord;
use sqlx::SqlitePool;

use crate::entities::InviteEntity;
use crate::metrics::QueryTimer;

const INVITE_COLUMNS: &str = "id, invite_id, community_id, role_id, creator_id, uses, max_uses, duration_seconds, channel_id";

/// Repository for invite-related database operations.
#[derive(Clone)]
pub struct InviteRepository {
    pool: SqlitePool,
}

impl InviteRepository {
    /// Creates a new InviteRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Loads all invites of a community in store order.
    ///
    /// Returns an empty list when the community has none.
    pub async fn load(&self, community_id: &str) -> Result<Vec<InviteRecord>, sqlx::Error> {
        let timer = QueryTimer::new("load_invites");
        let result = sqlx::query_as::<_, InviteEntity>(&format!(
            "SELECT {} FROM invites WHERE community_id = ?1 ORDER BY id",
            INVITE_COLUMNS
        ))
        .bind(community_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Find an invite by its id.
    pub async fn find(&self, invite_id: &str) -> Result<Option<InviteRecord>, sqlx::Error> {
        let timer = QueryTimer::new("find_invite");
        let result = sqlx::query_as::<_, InviteEntity>(&format!(
            "SELECT {} FROM invites WHERE invite_id = ?1",
            INVITE_COLUMNS
        ))
        .bind(invite_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Inserts a record or fully replaces the existing one with the same id.
    ///
    /// The row keeps its position in store order when replaced.
    pub async fn upsert(&self, record: &InviteRecord) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("upsert_invite");
        let result = sqlx::query(
            r#"
            INSERT INTO invites (invite_id, community_id, role_id, creator_id, uses, max_uses, duration_seconds, channel_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (invite_id) DO UPDATE SET
                community_id = excluded.community_id,
                role_id = excluded.role_id,
                creator_id = excluded.creator_id,
                uses = excluded.uses,
                max_uses = excluded.max_uses,
                duration_seconds = excluded.duration_seconds,
                channel_id = excluded.channel_id
            "#,
        )
        .bind(&record.invite_id)
        .bind(&record.community_id)
        .bind(record.role_id)
        .bind(record.creator_id)
        .bind(record.uses)
        .bind(record.max_uses)
        .bind(record.duration_seconds)
        .bind(record.channel_id)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Inserts a record unless one with the same id exists.
    ///
    /// Returns true if a row was inserted. Existing records, including their
    /// role mapping, are never overwritten.
    pub async fn insert_if_missing(&self, record: &InviteRecord) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("insert_invite_if_missing");
        let result = sqlx::query(
            r#"
            INSERT INTO invites (invite_id, community_id, role_id, creator_id, uses, max_uses, duration_seconds, channel_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (invite_id) DO NOTHING
            "#,
        )
        .bind(&record.invite_id)
        .bind(&record.community_id)
        .bind(record.role_id)
        .bind(record.creator_id)
        .bind(record.uses)
        .bind(record.max_uses)
        .bind(record.duration_seconds)
        .bind(record.channel_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() == 1)
    }

    /// Removes an invite. Removing an absent id is not an error.
    ///
    /// Returns the number of rows removed.
    pub async fn remove(&self, invite_id: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("remove_invite");
        let result = sqlx::query("DELETE FROM invites WHERE invite_id = ?1")
            .bind(invite_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Overwrites the stored use counter.
    ///
    /// Returns the number of rows updated: 0 when the invite is unknown.
    pub async fn set_uses(&self, invite_id: &str, uses: i64) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("set_invite_uses");
        let result = sqlx::query("UPDATE invites SET uses = ?2 WHERE invite_id = ?1")
            .bind(invite_id)
            .bind(uses)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Claims one use of an invite, never moving the counter past `ceiling`.
    ///
    /// `ceiling` is the live counter observed by the caller. Returns the new
    /// counter, or `None` when the invite is unknown.
    pub async fn increment_uses(
        &self,
        invite_id: &str,
        ceiling: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        let timer = QueryTimer::new("increment_invite_uses");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE invites
            SET uses = MIN(uses + 1, ?2)
            WHERE invite_id = ?1
            RETURNING uses
            "#,
        )
        .bind(invite_id)
        .bind(ceiling)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
