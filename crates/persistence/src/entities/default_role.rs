//! Default role entity (database row mapping).

use domain::models::DefaultRole;
use sqlx::FromRow;

/// Database row mapping for the default_roles table.
#[derive(Debug, Clone, FromRow)]
pub struct DefaultRoleEntity {
    pub community_id: String,
    pub role_id: i64,
}

impl From<DefaultRoleEntity> for DefaultRole {
    fn from(entity: DefaultRoleEntity) -> Self {
        Self {
            community_id: entity.community_id,
            role_id: entity.role_id,
        }
    }
}
