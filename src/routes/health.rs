//! Health check endpoints
//!
//! - /health, /healthz - liveness probe, 200 whenever the process serves
//! - /version - build information captured by build.rs

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::config::Args;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub timestamp: String,
    /// "development" (in-memory catalog) or "production"
    pub mode: &'static str,
    /// Whether gated routes can succeed at all
    pub membership_configured: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_timestamp: &'static str,
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(args: &Args) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode {
            "development"
        } else {
            "production"
        },
        membership_configured: args
            .discord_bot_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty()),
    };

    json_response(StatusCode::OK, &response)
}

/// Handle /version
pub fn version_info() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            build_timestamp: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        },
    )
}
