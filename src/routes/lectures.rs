//! Gated lecture routes
//!
//! Only reached after the access gate allowed the request.
//!
//! - `GET /lecture` - every lecture ordered by sequence number
//! - `GET /lecture/{lecture_id}` - one lecture with viewer URLs

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::catalog::LectureView;
use super::{error_response, json_response, parse_lecture_id};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct LectureIndexResponse {
    pub lectures: Vec<LectureView>,
}

/// GET /lecture
pub async fn handle_lecture_index(state: &AppState) -> Response<Full<Bytes>> {
    match state.fetcher.fetch_lecture_index().await {
        Ok(lectures) => {
            let lectures = lectures
                .into_iter()
                .map(|lecture| LectureView::new(state, lecture))
                .collect();
            json_response(StatusCode::OK, &LectureIndexResponse { lectures })
        }
        Err(e) => error_response(&e),
    }
}

/// GET /lecture/{lecture_id}
pub async fn handle_lecture(state: &AppState, raw_id: &str) -> Response<Full<Bytes>> {
    let lecture_id = match parse_lecture_id(raw_id) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.fetcher.fetch_lecture_by_number(lecture_id).await {
        Ok(lecture) => json_response(StatusCode::OK, &LectureView::new(state, lecture)),
        Err(e) => error_response(&e),
    }
}
