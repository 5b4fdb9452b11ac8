//! Test helpers: a throwaway HTTP server standing in for external APIs

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A request captured by the stub server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serve every request with the status/body chosen by `respond`
pub async fn spawn_stub<F>(respond: F) -> StubServer
where
    F: Fn(&RecordedRequest) -> (StatusCode, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorded = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let recorded = Arc::clone(&recorded);
            let respond = Arc::clone(&respond);
            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                    let recorded = Arc::clone(&recorded);
                    let respond = Arc::clone(&respond);
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = body
                            .collect()
                            .await
                            .map(|c| c.to_bytes())
                            .unwrap_or_default();
                        let request = RecordedRequest {
                            method: parts.method.to_string(),
                            path_and_query: parts
                                .uri
                                .path_and_query()
                                .map(|pq| pq.to_string())
                                .unwrap_or_default(),
                            headers: parts.headers,
                            body,
                        };
                        let (status, body) = respond(&request);
                        recorded.lock().unwrap().push(request);

                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .header("Content-Type", "application/json")
                                .body(Full::new(Bytes::from(body)))
                                .unwrap(),
                        )
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    StubServer {
        base_url: format!("http://{}", addr),
        requests,
    }
}

/// Base URL of a server that accepts connections and never answers
pub async fn spawn_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{}", addr)
}

/// Base URL of a port nobody is listening on
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// =============================================================================
// Application fixtures
// =============================================================================

use crate::auth::identity::{Identity, IdentityError, IdentityResolver};
use crate::auth::membership::{GuildMember, MembershipChecker, MembershipError};
use crate::catalog::{CategoryKey, Class, EmbedIds, InMemoryStore, Lecture};
use crate::config::Args;
use crate::server::AppState;
use chrono::{TimeZone, Utc};
use clap::Parser;

/// Session token accepted by [`FixedIdentity`]
pub const MEMBER_TOKEN: &str = "member-token";

/// Resolves [`MEMBER_TOKEN`] to a user with Discord id `555`
pub struct FixedIdentity;

#[async_trait::async_trait]
impl IdentityResolver for FixedIdentity {
    async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        Ok((access_token == MEMBER_TOKEN).then(|| Identity {
            id: "user-1".into(),
            email: Some("ren@example.com".into()),
            user_metadata: serde_json::json!({ "sub": "555", "avatar": "abc" }),
        }))
    }
}

/// Membership answer fixed at construction
pub struct FixedMembership(pub bool);

#[async_trait::async_trait]
impl MembershipChecker for FixedMembership {
    async fn check(&self, _user_id: &str) -> Result<GuildMember, MembershipError> {
        if self.0 {
            Ok(GuildMember {
                user: None,
                nick: None,
                roles: Vec::new(),
                joined_at: None,
            })
        } else {
            Err(MembershipError::Status {
                status: 404,
                body: "Unknown Member".into(),
            })
        }
    }
}

pub fn test_args(extra: &[&str]) -> Args {
    let mut argv = vec!["anchor", "--dev-mode", "--public-url", "https://anchor.example"];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).unwrap()
}

fn key(s: &str) -> CategoryKey {
    CategoryKey::parse(s).unwrap()
}

pub fn sample_lecture(id: i64, category: &str, lecture_id: i64, day: u32) -> Lecture {
    Lecture {
        id,
        category: key(category),
        lecture_id,
        created_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        chapter: Some(format!("Chapter {}", lecture_id)),
        embed_ids: EmbedIds {
            movie: Some(format!("vid-{}", id)),
            text: None,
            audio: Some(String::new()),
        },
    }
}

/// Two classes ("history" has no lectures) and three lectures
pub fn sample_store() -> InMemoryStore {
    InMemoryStore::new(
        vec![
            Class {
                id: 1,
                category: key("math"),
                name: "Mathematics".into(),
                tags: Some(vec!["core".into()]),
            },
            Class {
                id: 2,
                category: key("history"),
                name: "History".into(),
                tags: None,
            },
        ],
        vec![
            sample_lecture(10, "math", 2, 5),
            sample_lecture(11, "math", 1, 9),
            sample_lecture(12, "physics", 1, 1),
        ],
    )
}

/// App state over [`sample_store`] with fixed identity and membership
pub fn test_state(member: bool) -> AppState {
    AppState::with_services(
        test_args(&[]),
        Arc::new(sample_store()),
        Arc::new(FixedIdentity),
        Arc::new(FixedMembership(member)),
    )
}

/// Test state whose auth provider lives at `auth_base`
pub fn test_state_with_auth(auth_base: &str) -> AppState {
    AppState::with_services(
        test_args(&["--supabase-url", auth_base]),
        Arc::new(sample_store()),
        Arc::new(FixedIdentity),
        Arc::new(FixedMembership(true)),
    )
}

/// Decode a handler response body as JSON
pub async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
