//! Authentication and access control for Anchor
//!
//! Provides:
//! - Session cookie handling and request-scoped context
//! - Identity resolution against the hosted auth provider
//! - Discord guild-membership lookup
//! - The access gate applied to protected routes
//! - Discord sign-in through the auth provider (PKCE)

pub mod gate;
pub mod identity;
pub mod membership;
pub mod oauth;
pub mod session;

pub use gate::{AccessGate, DenyReason, GateDecision, GatedRoutes};
pub use identity::{Identity, IdentityError, IdentityResolver, SupabaseIdentityResolver};
pub use membership::{DiscordMembershipClient, GuildMember, MembershipChecker, MembershipError};
pub use oauth::{OAuthClient, PkcePair, SessionTokens};
pub use session::{RequestContext, ACCESS_TOKEN_COOKIE, CODE_VERIFIER_COOKIE, REFRESH_TOKEN_COOKIE};
