//! Identity resolution
//!
//! Turns a session access token into the signed-in user by asking the
//! hosted auth provider (`GET /auth/v1/user`).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Errors from identity resolution
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity provider unreachable: {0}")]
    Network(String),

    #[error("Identity provider returned HTTP {0}")]
    Status(u16),

    #[error("Invalid identity response: {0}")]
    InvalidResponse(String),
}

/// Signed-in user as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-specific profile data (Discord fields live here)
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl Identity {
    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Discord user id (`sub`, falling back to `provider_id`)
    pub fn discord_id(&self) -> Option<&str> {
        self.metadata_str("sub")
            .or_else(|| self.metadata_str("provider_id"))
    }

    /// Avatar URL from metadata, or built from the Discord avatar hash
    pub fn avatar_url(&self) -> Option<String> {
        if let Some(url) = self.metadata_str("avatar_url") {
            return Some(url.to_string());
        }
        match (self.discord_id(), self.metadata_str("avatar")) {
            (Some(id), Some(avatar)) => Some(format!(
                "https://cdn.discordapp.com/avatars/{}/{}.png",
                id, avatar
            )),
            _ => None,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.metadata_str("full_name")
            .or_else(|| self.metadata_str("name"))
    }
}

/// Resolves session tokens to identities (allows fakes in tests)
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` when the token is not (or no longer) valid
    async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, IdentityError>;
}

/// Resolver backed by the hosted auth provider
pub struct SupabaseIdentityResolver {
    base_url: String,
    anon_key: String,
    http_client: reqwest::Client,
}

impl SupabaseIdentityResolver {
    pub fn new(base_url: &str, anon_key: &str, request_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("anchor/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http_client,
        }
    }
}

#[async_trait::async_trait]
impl IdentityResolver for SupabaseIdentityResolver {
    async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            debug!(%status, "Session token rejected");
            return Ok(None);
        }
        if !status.is_success() {
            warn!(%status, "Identity provider error");
            return Err(IdentityError::Status(status.as_u16()));
        }

        let identity = response
            .json::<Identity>()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        Ok(Some(identity))
    }
}
