//! Configuration for Anchor
//!
//! CLI arguments and environment variable handling using clap.
//! Credentials are read once at startup and handed to the clients that
//! need them; nothing reads the process environment while serving.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder substituted with the embed identifier in viewer URLs
pub const EMBED_ID_PLACEHOLDER: &str = "{id}";

/// Anchor - lecture catalog service
#[derive(Parser, Debug, Clone)]
#[command(name = "anchor")]
#[command(about = "Lecture catalog with Discord-gated lecture access")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Public base URL of this service (used for OAuth redirects)
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:3000")]
    pub public_url: String,

    /// Hosted datastore/auth base URL (e.g. https://xyz.supabase.co)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Anonymous API key for the datastore and auth endpoints
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: Option<String>,

    /// Discord REST API base
    #[arg(long, env = "DISCORD_API_URL", default_value = "https://discord.com/api/v10")]
    pub discord_api_url: String,

    /// Guild whose members may open lectures
    #[arg(long, env = "DISCORD_GUILD_ID", default_value = "989146199556780052")]
    pub discord_guild_id: String,

    /// Bot token used for the membership lookup.
    /// When absent every gated request is denied.
    #[arg(long, env = "DISCORD_BOT_TOKEN")]
    pub discord_bot_token: Option<String>,

    /// Viewer URL template; `{id}` is replaced by the embed identifier
    #[arg(
        long,
        env = "EMBED_URL_TEMPLATE",
        default_value = "https://drive.google.com/file/d/{id}/preview"
    )]
    pub embed_url_template: String,

    /// Comma-separated path patterns that require the access gate
    #[arg(long, env = "GATED_PATHS", default_value = "/lecture,/lecture/:path*")]
    pub gated_paths: String,

    /// Outbound request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "5000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable development mode (in-memory catalog, no datastore)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JSON seed file for the in-memory catalog in dev mode
    #[arg(long, env = "DEV_SEED")]
    pub dev_seed: Option<PathBuf>,
}

impl Args {
    /// Outbound request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Gated path patterns, trimmed, empties dropped
    pub fn gated_path_list(&self) -> Vec<String> {
        self.gated_paths
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Public URL without a trailing slash
    pub fn public_base(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    /// Base URL of the hosted datastore/auth service, without trailing slash
    pub fn supabase_base(&self) -> Option<&str> {
        self.supabase_url.as_deref().map(|u| u.trim_end_matches('/'))
    }

    /// Anonymous key, empty when unset (dev mode)
    pub fn anon_key(&self) -> &str {
        self.supabase_anon_key.as_deref().unwrap_or("")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.supabase_url.is_none() {
                return Err("SUPABASE_URL is required in production mode".to_string());
            }
            if self.supabase_anon_key.is_none() {
                return Err("SUPABASE_ANON_KEY is required in production mode".to_string());
            }
        }

        if !self.embed_url_template.contains(EMBED_ID_PLACEHOLDER) {
            return Err(format!(
                "EMBED_URL_TEMPLATE must contain the {} placeholder",
                EMBED_ID_PLACEHOLDER
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        for pattern in self.gated_path_list() {
            if !pattern.starts_with('/') {
                return Err(format!("Gated path pattern must start with '/': {}", pattern));
            }
        }

        Ok(())
    }
}
