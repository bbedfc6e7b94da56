//! Channel messages and the closed set of bulk-deletion filters.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Messages older than this cannot be bulk deleted by the platform.
pub const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// A message as returned by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChannelMessage {
    pub id: i64,
    pub author_id: i64,
    pub author_is_bot: bool,
    pub content: String,
    pub pinned: bool,
    pub attachment_count: usize,
    pub embed_count: usize,
    /// User, role and channel mentions combined.
    pub mention_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Which messages a purge deletes. Pinned messages never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageFilter {
    All,
    Bots,
    Member { member_id: i64 },
    Contains { word: String },
    StartsWith { word: String },
    Attachments,
    Embeds,
    Mentions,
}

impl MessageFilter {
    pub fn matches(&self, message: &ChannelMessage) -> bool {
        if message.pinned {
            return false;
        }
        match self {
            MessageFilter::All => true,
            MessageFilter::Bots => message.author_is_bot,
            MessageFilter::Member { member_id } => message.author_id == *member_id,
            MessageFilter::Contains { word } => message
                .content
                .to_lowercase()
                .contains(&word.to_lowercase()),
            MessageFilter::StartsWith { word } => message
                .content
                .to_lowercase()
                .starts_with(&word.to_lowercase()),
            MessageFilter::Attachments => message.attachment_count > 0,
            MessageFilter::Embeds => message.embed_count > 0,
            MessageFilter::Mentions => message.mention_count > 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MessageFilter::All => "all",
            MessageFilter::Bots => "bots",
            MessageFilter::Member { .. } => "member",
            MessageFilter::Contains { .. } => "contains",
            MessageFilter::StartsWith { .. } => "starts_with",
            MessageFilter::Attachments => "attachments",
            MessageFilter::Embeds => "embeds",
            MessageFilter::Mentions => "mentions",
        }
    }
}

fn validate_filter(filter: &MessageFilter) -> Result<(), ValidationError> {
    match filter {
        MessageFilter::Contains { word } | MessageFilter::StartsWith { word } => {
            shared::validation::validate_filter_word(word)
        }
        MessageFilter::Member { member_id } => shared::validation::validate_snowflake(*member_id),
        _ => Ok(()),
    }
}

/// Request to bulk delete messages in a channel.
///
/// `amount` is how many of the most recent messages are scanned; only the
/// ones matching `filter` are deleted.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct PurgeRequest {
    #[validate(custom(function = "validate_filter"))]
    pub filter: MessageFilter,

    #[validate(range(min = 1, message = "amount must be at least 1"))]
    pub amount: usize,
}

/// Response after a purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PurgeResponse {
    pub deleted: usize,
}

/// Picks the ids to delete from the scanned messages.
pub fn select_purgeable(
    messages: &[ChannelMessage],
    filter: &MessageFilter,
    now: DateTime<Utc>,
) -> Vec<i64> {
    let cutoff = now - Duration::days(BULK_DELETE_MAX_AGE_DAYS);
    messages
        .iter()
        .filter(|m| m.created_at > cutoff)
        .filter(|m| filter.matches(m))
        .map(|m| m.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, content: &str) -> ChannelMessage {
        ChannelMessage {
            id,
            author_id: 100,
            author_is_bot: false,
            content: content.to_string(),
            pinned: false,
            attachment_count: 0,
            embed_count: 0,
            mention_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_pinned_never_matches() {
        let mut msg = message(1, "hello");
        msg.pinned = true;
        assert!(!MessageFilter::All.matches(&msg));
        assert!(!MessageFilter::Contains {
            word: "hello".to_string()
        }
        .matches(&msg));
    }

    #[test]
    fn test_bots_filter() {
        let mut msg = message(1, "beep");
        assert!(!MessageFilter::Bots.matches(&msg));
        msg.author_is_bot = true;
        assert!(MessageFilter::Bots.matches(&msg));
    }

    #[test]
    fn test_member_filter() {
        let msg = message(1, "hi");
        assert!(MessageFilter::Member { member_id: 100 }.matches(&msg));
        assert!(!MessageFilter::Member { member_id: 101 }.matches(&msg));
    }

    #[test]
    fn test_word_filters_ignore_case() {
        let msg = message(1, "Buy CHEAP stuff");
        assert!(MessageFilter::Contains {
            word: "cheap".to_string()
        }
        .matches(&msg));
        assert!(MessageFilter::StartsWith {
            word: "buy".to_string()
        }
        .matches(&msg));
        assert!(!MessageFilter::StartsWith {
            word: "cheap".to_string()
        }
        .matches(&msg));
    }

    #[test]
    fn test_content_shape_filters() {
        let mut msg = message(1, "");
        assert!(!MessageFilter::Attachments.matches(&msg));
        assert!(!MessageFilter::Embeds.matches(&msg));
        assert!(!MessageFilter::Mentions.matches(&msg));
        msg.attachment_count = 1;
        msg.embed_count = 2;
        msg.mention_count = 1;
        assert!(MessageFilter::Attachments.matches(&msg));
        assert!(MessageFilter::Embeds.matches(&msg));
        assert!(MessageFilter::Mentions.matches(&msg));
    }

    #[test]
    fn test_select_purgeable_skips_old_messages() {
        let now = Utc::now();
        let mut old = message(1, "old");
        old.created_at = now - Duration::days(15);
        let fresh = message(2, "fresh");
        let ids = select_purgeable(&[old, fresh], &MessageFilter::All, now);
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_filter_deserialize() {
        let filter: MessageFilter =
            serde_json::from_str(r#"{"kind":"starts_with","word":"!"}"#).unwrap();
        assert_eq!(
            filter,
            MessageFilter::StartsWith {
                word: "!".to_string()
            }
        );
        assert_eq!(filter.name(), "starts_with");
    }

    #[test]
    fn test_purge_request_validation() {
        let blank_word = PurgeRequest {
            filter: MessageFilter::Contains {
                word: " ".to_string(),
            },
            amount: 10,
        };
        assert!(blank_word.validate().is_err());

        let zero = PurgeRequest {
            filter: MessageFilter::All,
            amount: 0,
        };
        assert!(zero.validate().is_err());

        let ok = PurgeRequest {
            filter: MessageFilter::Bots,
            amount: 50,
        };
        assert!(ok.validate().is_ok());
    }
}
