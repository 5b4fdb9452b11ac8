//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Every request passes
//! the access gate before routing; denials become a redirect to `/`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::gate::{canonical_path, path_segments, LANDING_PATH};
use crate::auth::{
    AccessGate, DiscordMembershipClient, GateDecision, GatedRoutes, IdentityResolver,
    MembershipChecker, OAuthClient, RequestContext, SupabaseIdentityResolver,
};
use crate::catalog::{CatalogFetcher, CatalogStore, EmbedTemplate, InMemoryStore, PostgrestStore};
use crate::config::Args;
use crate::routes;
use crate::types::{AnchorError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Auth service used in dev mode when no SUPABASE_URL is set
/// (default of a locally started Supabase stack)
const LOCAL_AUTH_URL: &str = "http://127.0.0.1:54321";

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub fetcher: CatalogFetcher,
    pub gate: AccessGate,
    pub oauth: OAuthClient,
    pub embeds: EmbedTemplate,
}

impl AppState {
    /// Build state with the real clients described by `args`
    pub fn new(args: Args) -> Result<Self> {
        let timeout = args.request_timeout();
        let auth_base = args.supabase_base().unwrap_or(LOCAL_AUTH_URL).to_string();

        let store: Arc<dyn CatalogStore> = if args.dev_mode {
            match &args.dev_seed {
                Some(path) => {
                    info!("Loading dev catalog seed from {}", path.display());
                    Arc::new(InMemoryStore::from_seed_file(path)?)
                }
                None => Arc::new(InMemoryStore::default()),
            }
        } else {
            Arc::new(PostgrestStore::new(&auth_base, args.anon_key(), timeout)?)
        };

        let identity = Arc::new(SupabaseIdentityResolver::new(&auth_base, args.anon_key(), timeout));
        let membership = Arc::new(DiscordMembershipClient::new(
            &args.discord_api_url,
            &args.discord_guild_id,
            args.discord_bot_token.clone(),
            timeout,
        ));

        Ok(Self::with_services(args, store, identity, membership))
    }

    /// Build state around injected store and gate collaborators
    pub fn with_services(
        args: Args,
        store: Arc<dyn CatalogStore>,
        identity: Arc<dyn IdentityResolver>,
        membership: Arc<dyn MembershipChecker>,
    ) -> Self {
        let auth_base = args.supabase_base().unwrap_or(LOCAL_AUTH_URL).to_string();
        let oauth = OAuthClient::new(
            &auth_base,
            args.anon_key(),
            args.public_base(),
            args.request_timeout(),
        );
        let gate = AccessGate::new(
            GatedRoutes::new(&args.gated_path_list()),
            identity,
            membership,
        );
        let embeds = EmbedTemplate::new(args.embed_url_template.clone());

        Self {
            fetcher: CatalogFetcher::new(store),
            gate,
            oauth,
            embeds,
            args,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Anchor listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - serving in-memory catalog");
    }
    if state.args.discord_bot_token.is_none() {
        warn!("DISCORD_BOT_TOKEN not set - gated routes will redirect every request");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = canonical_path(req.uri().path());
    let query = req.uri().query().map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let ctx = RequestContext::from_headers(&path, req.headers());
    let response = dispatch(&state, &method, &path, query.as_deref(), &ctx).await;

    Ok(to_boxed(response))
}

/// Apply the gate, then route by method and path segments
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    path: &str,
    query: Option<&str>,
    ctx: &RequestContext,
) -> Response<Full<Bytes>> {
    // CORS preflight
    if *method == Method::OPTIONS {
        return preflight_response();
    }

    if let GateDecision::Deny(reason) = state.gate.evaluate(ctx).await {
        warn!(path = %path, reason = %reason, "Access denied");
        return routes::redirect(StatusCode::SEE_OTHER, LANDING_PATH, &[]);
    }

    let segments = path_segments(path);

    match (method, segments.as_slice()) {
        // Catalog
        (&Method::GET, []) | (&Method::GET, ["api", "classes"]) => {
            routes::handle_classes(state).await
        }
        (&Method::GET, ["class"]) => routes::handle_class_overview(state).await,
        (&Method::GET, ["class", category]) => routes::handle_class(state, category).await,
        (&Method::GET, ["class", category, lecture_id]) => {
            routes::handle_class_lecture(state, category, lecture_id).await
        }

        // Gated lectures
        (&Method::GET, ["lecture"]) => routes::handle_lecture_index(state).await,
        (&Method::GET, ["lecture", lecture_id]) => routes::handle_lecture(state, lecture_id).await,

        // Sign-in
        (&Method::GET, ["auth", "discord"]) => routes::handle_sign_in(state),
        (&Method::GET, ["api", "auth", "discord"]) => {
            routes::handle_callback(state, ctx, query).await
        }
        (&Method::POST, ["auth", "signout"]) => routes::handle_sign_out(),
        (&Method::GET, ["auth", "me"]) => routes::handle_me(state, ctx).await,

        // Health check endpoints
        (&Method::GET, ["health"]) | (&Method::GET, ["healthz"]) => {
            routes::health_check(&state.args)
        }
        (&Method::GET, ["version"]) => routes::version_info(),

        _ => not_found_response(path),
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::error_response(&AnchorError::NotFound(format!("route {}", path)))
}
