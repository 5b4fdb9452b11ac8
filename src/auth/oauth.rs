//! Discord sign-in through the hosted auth provider (PKCE flow)
//!
//! `authorize_url` sends the browser to the provider with a challenge; the
//! matching verifier lives in a cookie until the callback hands the code
//! back and [`OAuthClient::exchange_code`] trades both for session tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{AnchorError, Result};

/// OAuth provider name at the auth service
pub const PROVIDER: &str = "discord";

/// Discord scopes requested at sign-in
pub const SCOPES: &str = "identify email";

/// Callback path the provider redirects back to
pub const CALLBACK_PATH: &str = "/api/auth/discord";

/// PKCE verifier and its S256 challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Fresh verifier from 32 random bytes
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// base64url(SHA-256(verifier)), unpadded
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Tokens issued by a successful code exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

/// Client for the provider's authorize and token endpoints
pub struct OAuthClient {
    auth_base: String,
    anon_key: String,
    public_base: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(auth_base: &str, anon_key: &str, public_base: &str, request_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("anchor/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            auth_base: auth_base.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    /// Where the provider sends the browser after sign-in
    pub fn redirect_to(&self) -> String {
        format!("{}{}", self.public_base, CALLBACK_PATH)
    }

    /// Provider sign-in URL for a PKCE challenge
    pub fn authorize_url(&self, pkce: &PkcePair) -> String {
        format!(
            "{}/auth/v1/authorize?provider={}&redirect_to={}&scopes={}&code_challenge={}&code_challenge_method=s256",
            self.auth_base,
            PROVIDER,
            urlencoding::encode(&self.redirect_to()),
            urlencoding::encode(SCOPES),
            pkce.challenge
        )
    }

    /// Trade an authorization code and its verifier for session tokens
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<SessionTokens> {
        let url = format!("{}/auth/v1/token?grant_type=pkce", self.auth_base);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&TokenRequest {
                auth_code: code,
                code_verifier: verifier,
            })
            .send()
            .await
            .map_err(|e| AnchorError::Upstream(format!("Token exchange failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Code exchange rejected");
            return Err(AnchorError::Unauthorized(format!(
                "Code exchange rejected (HTTP {})",
                status.as_u16()
            )));
        }

        let tokens = response
            .json::<SessionTokens>()
            .await
            .map_err(|e| AnchorError::Upstream(format!("Invalid token response: {}", e)))?;

        debug!(expires_in = tokens.expires_in, "Session established");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_stub, unreachable_url};
    use hyper::StatusCode;

    fn client(base: &str) -> OAuthClient {
        OAuthClient::new(base, "anon", "https://anchor.example/", Duration::from_secs(2))
    }

    #[test]
    fn test_challenge_matches_rfc7636_vector() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mJ92K1Qd-kBWCykn_nGW1ZJMRIcYrk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1PXlRuGkw5hZ-a1-o"
        );
    }

    #[test]
    fn test_generated_pairs_are_unique_and_url_safe() {
        let a = PkcePair::generate();
        let b = PkcePair::generate();
        assert_ne!(a.verifier, b.verifier);
        assert_eq!(a.verifier.len(), 43);
        assert!(a
            .verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(a.challenge, challenge_for(&a.verifier));
    }

    #[test]
    fn test_authorize_url() {
        let pkce = PkcePair::from_verifier("v".into());
        let url = client("https://xyz.supabase.co/").authorize_url(&pkce);

        assert!(url.starts_with("https://xyz.supabase.co/auth/v1/authorize?provider=discord&"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fanchor.example%2Fapi%2Fauth%2Fdiscord"));
        assert!(url.contains("scopes=identify%20email"));
        assert!(url.contains(&format!("code_challenge={}", pkce.challenge)));
        assert!(url.ends_with("code_challenge_method=s256"));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let stub = spawn_stub(|_| {
            (
                StatusCode::OK,
                r#"{"access_token":"at","refresh_token":"rt","expires_in":120,"token_type":"bearer"}"#
                    .to_string(),
            )
        })
        .await;

        let tokens = client(&stub.base_url).exchange_code("c0de", "verif").await.unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.expires_in, 120);

        let request = &stub.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path_and_query, "/auth/v1/token?grant_type=pkce");
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["auth_code"], "c0de");
        assert_eq!(body["code_verifier"], "verif");
    }

    #[tokio::test]
    async fn test_exchange_failures() {
        let stub = spawn_stub(|_| (StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#.to_string())).await;
        let err = client(&stub.base_url).exchange_code("c", "v").await.unwrap_err();
        assert!(matches!(err, AnchorError::Unauthorized(_)));

        let err = client(&unreachable_url().await).exchange_code("c", "v").await.unwrap_err();
        assert!(matches!(err, AnchorError::Upstream(_)));
    }
}
