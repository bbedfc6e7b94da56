//! Join attribution policy.
//!
//! On each admitted join the live usage counters are compared with the
//! stored ones. The first stored invite (in store order) whose live counter
//! is ahead of the stored counter is taken as the invite that was used.
//! Matching stops there: one attribution per join, even when several
//! counters moved in the same interval. The remaining drift is picked up by
//! later joins.

use std::collections::HashMap;

use crate::models::{InviteRecord, LiveInvite};

/// The invite a join was attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionMatch {
    pub invite_id: String,
    pub role_id: Option<i64>,
    pub stored_uses: i64,
    pub live_uses: i64,
}

/// Finds the invite consumed by a join, if any.
///
/// `stored` must be in store order; `live` may be in any order. Stored
/// invites missing from the live listing are skipped.
pub fn find_consumed_invite(
    stored: &[InviteRecord],
    live: &[LiveInvite],
) -> Option<AttributionMatch> {
    let live_uses: HashMap<&str, i64> = live.iter().map(|i| (i.id.as_str(), i.uses)).collect();

    stored.iter().find_map(|record| {
        let current = *live_uses.get(record.invite_id.as_str())?;
        (current > record.uses).then(|| AttributionMatch {
            invite_id: record.invite_id.clone(),
            role_id: record.role_id,
            stored_uses: record.uses,
            live_uses: current,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: &str, uses: i64, role_id: Option<i64>) -> InviteRecord {
        InviteRecord {
            invite_id: id.to_string(),
            community_id: "guild".to_string(),
            role_id,
            creator_id: 1,
            uses,
            max_uses: 0,
            duration_seconds: Some(0),
            channel_id: Some(2),
        }
    }

    fn live(id: &str, uses: i64) -> LiveInvite {
        LiveInvite {
            id: id.to_string(),
            uses,
            max_uses: 0,
            max_age: 0,
            creator_id: Some(1),
            channel_id: Some(2),
        }
    }

    #[test]
    fn test_single_increment_matches() {
        let records = vec![stored("a", 3, Some(10)), stored("b", 0, Some(20))];
        let current = vec![live("a", 4), live("b", 0)];

        let matched = find_consumed_invite(&records, &current).unwrap();
        assert_eq!(matched.invite_id, "a");
        assert_eq!(matched.role_id, Some(10));
        assert_eq!(matched.stored_uses, 3);
        assert_eq!(matched.live_uses, 4);
    }

    #[test]
    fn test_no_increment_no_match() {
        let records = vec![stored("a", 3, Some(10)), stored("b", 1, Some(20))];
        let current = vec![live("a", 3), live("b", 1)];
        assert!(find_consumed_invite(&records, &current).is_none());
    }

    #[test]
    fn test_first_match_in_store_order_wins() {
        let records = vec![stored("b", 0, Some(20)), stored("a", 0, Some(10))];
        let current = vec![live("a", 1), live("b", 1)];

        let matched = find_consumed_invite(&records, &current).unwrap();
        assert_eq!(matched.invite_id, "b");
    }

    #[test]
    fn test_stored_invite_missing_remotely_is_skipped() {
        let records = vec![stored("gone", 0, Some(10)), stored("a", 2, Some(20))];
        let current = vec![live("a", 3)];

        let matched = find_consumed_invite(&records, &current).unwrap();
        assert_eq!(matched.invite_id, "a");
    }

    #[test]
    fn test_live_counter_behind_store_is_not_a_match() {
        let records = vec![stored("a", 5, Some(10))];
        let current = vec![live("a", 2)];
        assert!(find_consumed_invite(&records, &current).is_none());
    }

    #[test]
    fn test_invite_without_role_still_matches() {
        let records = vec![stored("a", 0, None)];
        let current = vec![live("a", 1)];
        let matched = find_consumed_invite(&records, &current).unwrap();
        assert_eq!(matched.role_id, None);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(find_consumed_invite(&[], &[live("a", 1)]).is_none());
        assert!(find_consumed_invite(&[stored("a", 0, None)], &[]).is_none());
    }
}
