//! HTTP routes for Anchor

pub mod auth_routes;
pub mod catalog;
pub mod health;
pub mod lectures;

pub use auth_routes::{handle_callback, handle_me, handle_sign_in, handle_sign_out};
pub use catalog::{handle_class, handle_class_lecture, handle_class_overview, handle_classes};
pub use health::{health_check, version_info};
pub use lectures::{handle_lecture, handle_lecture_index};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{LOCATION, SET_COOKIE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::{debug, error};

use crate::types::AnchorError;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Map an error to its status and a JSON body safe for clients
pub fn error_response(err: &AnchorError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    if status.is_server_error() {
        error!(code = err.code(), "Request failed: {}", err);
    } else {
        debug!(code = err.code(), "Request rejected: {}", err);
    }

    json_response(
        status,
        &ErrorBody {
            error: err.public_message(),
            code: err.code(),
        },
    )
}

/// Redirect with optional `Set-Cookie` headers
pub fn redirect(status: StatusCode, location: &str, cookies: &[String]) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status).header(LOCATION, location);
    for cookie in cookies {
        builder = builder.header(SET_COOKIE, cookie.as_str());
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        error!("Failed to build redirect to {}: {}", location, e);
        error_response(&AnchorError::Internal("invalid redirect".into()))
    })
}

/// Parse a lecture sequence number from a path segment
pub(crate) fn parse_lecture_id(raw: &str) -> Result<i64, AnchorError> {
    raw.parse::<i64>()
        .map_err(|_| AnchorError::BadRequest(format!("Invalid lecture id: {}", raw)))
}
