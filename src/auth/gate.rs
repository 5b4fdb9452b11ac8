//! Access gate for protected routes
//!
//! Two checks, in order, stopping at the first failure:
//!
//! 1. identity: the session token resolves to a signed-in user
//! 2. membership: that user's Discord id is a member of the configured guild
//!
//! Every failure sends the user back to the landing page. Nothing is
//! cached; each gated request repeats both checks.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::identity::{Identity, IdentityResolver};
use super::membership::MembershipChecker;
use super::session::RequestContext;

/// Where denied requests are redirected
pub const LANDING_PATH: &str = "/";

/// Path patterns subject to the gate.
///
/// `/lecture` matches exactly; `/lecture/:path*` matches `/lecture` followed
/// by at least one more segment. Paths are compared segment by segment
/// after [`path_segments`], the same reading the router uses, so `//lecture`
/// and `/lecture//1` are gated like `/lecture` and `/lecture/1`.
#[derive(Debug, Clone)]
pub struct GatedRoutes {
    patterns: Vec<RoutePattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RoutePattern {
    Exact(Vec<String>),
    Prefix(Vec<String>),
}

impl GatedRoutes {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let owned = |path: &str| -> Vec<String> {
            path_segments(path).into_iter().map(str::to_string).collect()
        };
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref().trim();
                match p.strip_suffix("/:path*") {
                    Some(base) => RoutePattern::Prefix(owned(base)),
                    None => RoutePattern::Exact(owned(p)),
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_gated(&self, path: &str) -> bool {
        let segments = path_segments(path);
        self.patterns.iter().any(|pattern| match pattern {
            RoutePattern::Exact(p) => segments == *p,
            RoutePattern::Prefix(prefix) => {
                segments.len() > prefix.len()
                    && segments.iter().zip(prefix).all(|(s, p)| s == p)
            }
        })
    }
}

impl Default for GatedRoutes {
    fn default() -> Self {
        Self::new(&["/lecture", "/lecture/:path*"])
    }
}

/// Non-empty segments of a request path, query stripped.
///
/// Both the gate and the router read paths through this function.
pub fn path_segments(path: &str) -> Vec<&str> {
    let path = path.split('?').next().unwrap_or(path);
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Request path with repeated and trailing slashes collapsed (root is `/`)
pub fn canonical_path(path: &str) -> String {
    format!("/{}", path_segments(path).join("/"))
}

/// Why a gated request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No session token, or the token resolves to no user
    NoIdentity,
    /// Signed in, but no Discord id in the user metadata
    NoExternalId,
    /// Membership lookup failed for any reason
    NotMember,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NoIdentity => write!(f, "no identity"),
            DenyReason::NoExternalId => write!(f, "no discord id"),
            DenyReason::NotMember => write!(f, "not a guild member"),
        }
    }
}

/// Outcome of [`AccessGate::evaluate`]
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Path is not gated
    Bypass,
    /// Both checks passed
    Allow(Identity),
    /// Redirect to [`LANDING_PATH`]
    Deny(DenyReason),
}

/// Identity + guild-membership gate
pub struct AccessGate {
    routes: GatedRoutes,
    identity: Arc<dyn IdentityResolver>,
    membership: Arc<dyn MembershipChecker>,
}

impl AccessGate {
    pub fn new(
        routes: GatedRoutes,
        identity: Arc<dyn IdentityResolver>,
        membership: Arc<dyn MembershipChecker>,
    ) -> Self {
        Self {
            routes,
            identity,
            membership,
        }
    }

    /// Resolve the session of a request to an identity, if any
    pub async fn current_identity(&self, ctx: &RequestContext) -> Option<Identity> {
        let token = ctx.access_token()?;
        match self.identity.resolve(token).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(path = %ctx.path, error = %e, "Identity resolution failed");
                None
            }
        }
    }

    /// Run the gate for one request
    pub async fn evaluate(&self, ctx: &RequestContext) -> GateDecision {
        if !self.routes.is_gated(&ctx.path) {
            return GateDecision::Bypass;
        }

        let Some(identity) = self.current_identity(ctx).await else {
            debug!(path = %ctx.path, "Gate: no identity");
            return GateDecision::Deny(DenyReason::NoIdentity);
        };

        let Some(discord_id) = identity.discord_id() else {
            warn!(path = %ctx.path, user = %identity.id, "Gate: no Discord id in user metadata");
            return GateDecision::Deny(DenyReason::NoExternalId);
        };

        match self.membership.check(discord_id).await {
            Ok(_) => {
                debug!(path = %ctx.path, user = %identity.id, "Gate: allowed");
                GateDecision::Allow(identity)
            }
            Err(e) => {
                warn!(
                    path = %ctx.path,
                    user = %identity.id,
                    discord_id = %discord_id,
                    error = %e,
                    "Gate: membership check failed"
                );
                GateDecision::Deny(DenyReason::NotMember)
            }
        }
    }
}
