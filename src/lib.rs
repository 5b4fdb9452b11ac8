//! Anchor - lecture catalog service
//!
//! Serves the class catalog, per-class lecture statistics and lecture
//! detail (with embedded Drive viewers) as JSON. Lecture routes are gated
//! behind a hosted OAuth login and a Discord guild-membership check.
//!
//! ## Services
//!
//! - **Catalog**: PostgREST-backed reads of classes and lectures
//! - **Stats**: per-class lecture count, latest lecture and last update
//! - **Gate**: identity + guild membership check for protected routes
//! - **OAuth**: Discord sign-in via the hosted auth provider (PKCE)

pub mod auth;
pub mod catalog;
pub mod config;
pub mod routes;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{AnchorError, Result};
