//! Discord REST gateway.
//!
//! Implements [`InviteGateway`] over the Discord HTTP API. Snowflakes are
//! strings on the wire and `i64` in the domain. Status codes map onto
//! [`GatewayError`] so callers can tell permission refusals from outages.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{ChannelMessage, LiveInvite};
use domain::services::{GatewayError, InviteGateway, InviteParams};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DiscordConfig;

/// Page size limit of the guild and message listing endpoints.
const PAGE_LIMIT: usize = 100;
/// Channel type of a guild text channel.
const GUILD_TEXT: u8 = 0;

/// Failure to build the gateway client.
#[derive(Debug, thiserror::Error)]
pub enum DiscordSetupError {
    #[error("Discord token contains characters not allowed in a header")]
    InvalidToken,
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct DiscordGateway {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PartialGuild {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Guild {
    system_channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    position: i64,
}

#[derive(Debug, Deserialize)]
struct Role {
    id: String,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct Invite {
    code: String,
    #[serde(default)]
    uses: i64,
    #[serde(default)]
    max_uses: i64,
    #[serde(default)]
    max_age: i64,
    inviter: Option<User>,
    channel: Option<PartialChannel>,
}

#[derive(Debug, Deserialize)]
struct PartialChannel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    author: User,
    #[serde(default)]
    content: String,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    attachments: Vec<serde_json::Value>,
    #[serde(default)]
    embeds: Vec<serde_json::Value>,
    #[serde(default)]
    mentions: Vec<serde_json::Value>,
    #[serde(default)]
    mention_roles: Vec<String>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct CreateInviteBody {
    max_age: i64,
    max_uses: i64,
    unique: bool,
}

#[derive(Debug, Serialize)]
struct BulkDeleteBody<'a> {
    messages: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    retry_after: f64,
}

impl DiscordGateway {
    pub fn new(config: &DiscordConfig) -> Result<Self, DiscordSetupError> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bot {}", config.token))
            .map_err(|_| DiscordSetupError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("role-invite/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid response body: {}", e)))
    }
}

async fn error_from_response(response: Response) -> GatewayError {
    let status = response.status();
    let body = response.json::<ErrorBody>().await.ok();
    let message = body
        .as_ref()
        .map(|b| b.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    match status {
        StatusCode::FORBIDDEN => GatewayError::Forbidden(message),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited {
            retry_after_secs: body.map(|b| b.retry_after.ceil() as u64).unwrap_or(1),
        },
        _ => GatewayError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn snowflake(value: &str) -> Result<i64, GatewayError> {
    value
        .parse()
        .map_err(|_| GatewayError::Transport(format!("invalid snowflake: {}", value)))
}

fn live_invite(invite: Invite) -> LiveInvite {
    LiveInvite {
        creator_id: invite.inviter.and_then(|u| u.id.parse().ok()),
        channel_id: invite.channel.and_then(|c| c.id.parse().ok()),
        id: invite.code,
        uses: invite.uses,
        max_uses: invite.max_uses,
        max_age: invite.max_age,
    }
}

fn channel_message(message: Message) -> Result<ChannelMessage, GatewayError> {
    Ok(ChannelMessage {
        id: snowflake(&message.id)?,
        author_id: snowflake(&message.author.id)?,
        author_is_bot: message.author.bot,
        content: message.content,
        pinned: message.pinned,
        attachment_count: message.attachments.len(),
        embed_count: message.embeds.len(),
        mention_count: message.mentions.len() + message.mention_roles.len(),
        created_at: message.timestamp,
    })
}

#[async_trait]
impl InviteGateway for DiscordGateway {
    async fn communities(&self) -> Result<Vec<String>, GatewayError> {
        let mut ids = Vec::new();
        loop {
            let mut path = "/users/@me/guilds?limit=200".to_string();
            if let Some(last) = ids.last() {
                path.push_str(&format!("&after={}", last));
            }
            let page: Vec<PartialGuild> = self.get_json(&path).await?;
            let full = page.len() == 200;
            ids.extend(page.into_iter().map(|g| g.id));
            if !full {
                return Ok(ids);
            }
        }
    }

    async fn list_invites(&self, community_id: &str) -> Result<Vec<LiveInvite>, GatewayError> {
        let invites: Vec<Invite> = self
            .get_json(&format!("/guilds/{}/invites", community_id))
            .await?;
        Ok(invites.into_iter().map(live_invite).collect())
    }

    async fn create_invite(
        &self,
        channel_id: i64,
        params: &InviteParams,
    ) -> Result<LiveInvite, GatewayError> {
        let mut request = self
            .request(Method::POST, &format!("/channels/{}/invites", channel_id))
            .json(&CreateInviteBody {
                max_age: params.max_age_secs,
                max_uses: params.max_uses,
                unique: true,
            });
        if let Some(reason) = &params.reason {
            request = request.header("X-Audit-Log-Reason", audit_log_reason(reason));
        }
        let invite: Invite = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid response body: {}", e)))?;
        Ok(live_invite(invite))
    }

    async fn delete_invite(&self, invite_id: &str) -> Result<(), GatewayError> {
        self.send(self.request(Method::DELETE, &format!("/invites/{}", invite_id)))
            .await?;
        Ok(())
    }

    async fn role_exists(&self, community_id: &str, role_id: i64) -> Result<bool, GatewayError> {
        let roles: Vec<Role> = self
            .get_json(&format!("/guilds/{}/roles", community_id))
            .await?;
        let wanted = role_id.to_string();
        Ok(roles.iter().any(|r| r.id == wanted))
    }

    async fn add_role(
        &self,
        community_id: &str,
        member_id: i64,
        role_id: i64,
    ) -> Result<(), GatewayError> {
        self.send(self.request(
            Method::PUT,
            &format!(
                "/guilds/{}/members/{}/roles/{}",
                community_id, member_id, role_id
            ),
        ))
        .await?;
        Ok(())
    }

    async fn default_channel(&self, community_id: &str) -> Result<Option<i64>, GatewayError> {
        let guild: Guild = self.get_json(&format!("/guilds/{}", community_id)).await?;
        if let Some(id) = guild.system_channel_id {
            return snowflake(&id).map(Some);
        }

        let channels: Vec<Channel> = self
            .get_json(&format!("/guilds/{}/channels", community_id))
            .await?;
        channels
            .into_iter()
            .filter(|c| c.kind == GUILD_TEXT)
            .min_by_key(|c| c.position)
            .map(|c| snowflake(&c.id))
            .transpose()
    }

    async fn recent_messages(
        &self,
        channel_id: i64,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, GatewayError> {
        let mut messages: Vec<ChannelMessage> = Vec::with_capacity(limit);
        while messages.len() < limit {
            let page_size = (limit - messages.len()).min(PAGE_LIMIT);
            let mut path = format!("/channels/{}/messages?limit={}", channel_id, page_size);
            if let Some(oldest) = messages.last() {
                path.push_str(&format!("&before={}", oldest.id));
            }
            let page: Vec<Message> = self.get_json(&path).await?;
            let exhausted = page.len() < page_size;
            for message in page {
                messages.push(channel_message(message)?);
            }
            if exhausted {
                break;
            }
        }
        Ok(messages)
    }

    async fn delete_messages(
        &self,
        channel_id: i64,
        message_ids: &[i64],
    ) -> Result<usize, GatewayError> {
        let mut deleted = 0;
        for chunk in message_ids.chunks(PAGE_LIMIT) {
            if let [single] = chunk {
                self.send(self.request(
                    Method::DELETE,
                    &format!("/channels/{}/messages/{}", channel_id, single),
                ))
                .await?;
            } else {
                let ids: Vec<String> = chunk.iter().map(i64::to_string).collect();
                self.send(
                    self.request(
                        Method::POST,
                        &format!("/channels/{}/messages/bulk-delete", channel_id),
                    )
                    .json(&BulkDeleteBody { messages: &ids }),
                )
                .await?;
            }
            deleted += chunk.len();
            debug!(channel_id, deleted, "Deleted messages");
        }
        Ok(deleted)
    }
}

/// The audit log reason header carries URL-encoded UTF-8.
fn audit_log_reason(reason: &str) -> String {
    utf8_percent_encode(reason, NON_ALPHANUMERIC).to_string()
}
