//! Default role repository.

use domain::models::DefaultRole;
use sqlx::SqlitePool;

use crate::entities::DefaultRoleEntity;
use crate::metrics::QueryTimer;

/// Repository for the per-community default role.
#[derive(Clone)]
pub struct DefaultRoleRepository {
    pool: SqlitePool,
}

impl DefaultRoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Default role of a community, if one is configured.
    pub async fn get(&self, community_id: &str) -> Result<Option<i64>, sqlx::Error> {
        let timer = QueryTimer::new("get_default_role");
        let result = sqlx::query_as::<_, DefaultRoleEntity>(
            "SELECT community_id, role_id FROM default_roles WHERE community_id = ?1",
        )
        .bind(community_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(|entity| DefaultRole::from(entity).role_id))
    }

    /// Sets or replaces the default role of a community.
    pub async fn set(&self, community_id: &str, role_id: i64) -> Result<DefaultRole, sqlx::Error> {
        let timer = QueryTimer::new("set_default_role");
        let result = sqlx::query_as::<_, DefaultRoleEntity>(
            r#"
            INSERT INTO default_roles (community_id, role_id)
            VALUES (?1, ?2)
            ON CONFLICT (community_id) DO UPDATE SET role_id = excluded.role_id
            RETURNING community_id, role_id
            "#,
        )
        .bind(community_id)
        .bind(role_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }
}
