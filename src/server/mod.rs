//! HTTP server for Anchor

pub mod http;

pub use http::{dispatch, run, AppState};
