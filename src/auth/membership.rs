//! Discord guild-membership lookup
//!
//! `GET {api}/guilds/{guild_id}/members/{user_id}` authenticated with a bot
//! token. Any failure means "not a member" to the gate.

use reqwest::header::HeaderValue;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Errors from the membership lookup
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Bot token not configured")]
    MissingCredential,

    #[error("Bot token is not a valid header value")]
    MalformedCredential,

    #[error("Discord unreachable: {0}")]
    Network(String),

    #[error("Discord returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid member payload: {0}")]
    InvalidResponse(String),
}

/// Subset of the Discord guild member object
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<GuildUser>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Membership predicate (allows fakes in tests)
#[async_trait::async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn check(&self, user_id: &str) -> Result<GuildMember, MembershipError>;
}

/// Membership lookup against the Discord REST API
pub struct DiscordMembershipClient {
    api_base: String,
    guild_id: String,
    bot_token: Option<String>,
    http_client: reqwest::Client,
}

impl DiscordMembershipClient {
    pub fn new(
        api_base: &str,
        guild_id: &str,
        bot_token: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("anchor/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            guild_id: guild_id.to_string(),
            bot_token,
            http_client,
        }
    }

    fn authorization(&self) -> Result<HeaderValue, MembershipError> {
        let token = self
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(MembershipError::MissingCredential)?;

        HeaderValue::from_str(&format!("Bot {}", token))
            .map_err(|_| MembershipError::MalformedCredential)
    }
}

#[async_trait::async_trait]
impl MembershipChecker for DiscordMembershipClient {
    async fn check(&self, user_id: &str) -> Result<GuildMember, MembershipError> {
        let authorization = self.authorization()?;
        let url = format!(
            "{}/guilds/{}/members/{}",
            self.api_base,
            self.guild_id,
            urlencoding::encode(user_id)
        );

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| MembershipError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MembershipError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let member = response
            .json::<GuildMember>()
            .await
            .map_err(|e| MembershipError::InvalidResponse(e.to_string()))?;

        debug!(user_id = %user_id, roles = member.roles.len(), "Guild member confirmed");
        Ok(member)
    }
}
