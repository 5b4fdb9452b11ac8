//! Shared types

pub mod error;

pub use error::{AnchorError, Result};
