//! Sign-in routes
//!
//! - `GET /auth/discord` - start Discord sign-in (PKCE)
//! - `GET /api/auth/discord?code=` - provider callback, sets session cookies
//! - `POST /auth/signout` - clear the session
//! - `GET /auth/me` - current user, or 401

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{error_response, json_response, redirect};
use crate::auth::gate::LANDING_PATH;
use crate::auth::oauth::PkcePair;
use crate::auth::session::{
    clear_cookie, session_cookie, RequestContext, ACCESS_TOKEN_COOKIE, CODE_VERIFIER_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
use crate::server::AppState;
use crate::types::AnchorError;

/// Landing path after a failed sign-in
pub const AUTH_ERROR_PATH: &str = "/?error=auth";

/// Lifetime of the PKCE verifier cookie
const VERIFIER_MAX_AGE_SECS: u64 = 600;

/// Refresh token cookie lifetime
const REFRESH_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;

#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub email: Option<String>,
    pub discord_id: Option<String>,
    pub avatar_url: Option<String>,
    pub name: Option<String>,
}

fn secure_cookies(state: &AppState) -> bool {
    state.args.public_base().starts_with("https://")
}

/// GET /auth/discord
pub fn handle_sign_in(state: &AppState) -> Response<Full<Bytes>> {
    let pkce = PkcePair::generate();
    let location = state.oauth.authorize_url(&pkce);

    redirect(
        StatusCode::FOUND,
        &location,
        &[session_cookie(
            CODE_VERIFIER_COOKIE,
            &pkce.verifier,
            VERIFIER_MAX_AGE_SECS,
            secure_cookies(state),
        )],
    )
}

/// GET /api/auth/discord
pub async fn handle_callback(
    state: &AppState,
    ctx: &RequestContext,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let params: CallbackQuery = query
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default();

    if let Some(error) = &params.error {
        warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Provider returned sign-in error"
        );
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return redirect(StatusCode::FOUND, LANDING_PATH, &[]);
    };

    let Some(verifier) = ctx.cookie(CODE_VERIFIER_COOKIE) else {
        warn!("Sign-in callback without PKCE verifier cookie");
        return redirect(StatusCode::FOUND, AUTH_ERROR_PATH, &[]);
    };

    match state.oauth.exchange_code(&code, verifier).await {
        Ok(tokens) => {
            let secure = secure_cookies(state);
            let mut cookies = vec![
                session_cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token, tokens.expires_in, secure),
                clear_cookie(CODE_VERIFIER_COOKIE),
            ];
            if let Some(refresh) = &tokens.refresh_token {
                cookies.push(session_cookie(
                    REFRESH_TOKEN_COOKIE,
                    refresh,
                    REFRESH_MAX_AGE_SECS,
                    secure,
                ));
            }
            info!("User signed in");
            redirect(StatusCode::FOUND, LANDING_PATH, &cookies)
        }
        Err(e) => {
            warn!(error = %e, "Sign-in code exchange failed");
            redirect(
                StatusCode::FOUND,
                AUTH_ERROR_PATH,
                &[clear_cookie(CODE_VERIFIER_COOKIE)],
            )
        }
    }
}

/// POST /auth/signout
pub fn handle_sign_out() -> Response<Full<Bytes>> {
    redirect(
        StatusCode::SEE_OTHER,
        LANDING_PATH,
        &[
            clear_cookie(ACCESS_TOKEN_COOKIE),
            clear_cookie(REFRESH_TOKEN_COOKIE),
            clear_cookie(CODE_VERIFIER_COOKIE),
        ],
    )
}

/// GET /auth/me
pub async fn handle_me(state: &AppState, ctx: &RequestContext) -> Response<Full<Bytes>> {
    match state.gate.current_identity(ctx).await {
        Some(identity) => json_response(
            StatusCode::OK,
            &MeResponse {
                discord_id: identity.discord_id().map(str::to_string),
                avatar_url: identity.avatar_url(),
                name: identity.display_name().map(str::to_string),
                id: identity.id,
                email: identity.email,
            },
        ),
        None => error_response(&AnchorError::Unauthorized("Not signed in".into())),
    }
}
