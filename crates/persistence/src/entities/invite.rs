//! Invite entity (database row mapping).

use domain::models::InviteRecord;
use sqlx::FromRow;

/// Database row mapping for the invites table.
#[derive(Debug, Clone, FromRow)]
pub struct InviteEntity {
    pub id: i64,
    pub invite_id: String,
    pub community_id: String,
    pub role_id: Option<i64>,
    pub creator_id: i64,
    pub uses: i64,
    pub max_uses: i64,
    pub duration_seconds: Option<i64>,
    pub channel_id: Option<i64>,
}

impl From<InviteEntity> for InviteRecord {
    fn from(entity: InviteEntity) -> Self {
        Self {
            invite_id: entity.invite_id,
            community_id: entity.community_id,
            role_id: entity.role_id,
            creator_id: entity.creator_id,
            uses: entity.uses,
            max_uses: entity.max_uses,
            duration_seconds: entity.duration_seconds,
            channel_id: entity.channel_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_into_record() {
        let entity = InviteEntity {
            id: 3,
            invite_id: "abc".to_string(),
            community_id: "guild".to_string(),
            role_id: None,
            creator_id: 4,
            uses: 2,
            max_uses: 0,
            duration_seconds: None,
            channel_id: Some(9),
        };
        let record: InviteRecord = entity.into();
        assert_eq!(record.invite_id, "abc");
        assert_eq!(record.role_id, None);
        assert_eq!(record.uses, 2);
        assert_eq!(record.channel_id, Some(9));
    }
}
