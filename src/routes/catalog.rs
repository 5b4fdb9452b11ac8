//! Public catalog routes
//!
//! - `GET /`, `/api/classes` - every class with its lecture stats
//! - `GET /class` - lectures grouped by class
//! - `GET /class/{category}` - one class, its lectures and stats
//! - `GET /class/{category}/{lecture_id}` - one lecture with viewer URLs

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{error_response, json_response, parse_lecture_id};
use crate::catalog::{aggregate, CategoryKey, Class, ClassLectures, ClassStats, EmbedLinks, Lecture};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    #[serde(flatten)]
    pub class: Class,
    pub stats: ClassStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassesResponse {
    pub classes: Vec<ClassSummary>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub classes: Vec<ClassLectures>,
}

#[derive(Debug, Serialize)]
pub struct ClassResponse {
    pub class: Class,
    pub lectures: Vec<Lecture>,
    pub stats: ClassStats,
}

/// A lecture together with its rendered viewer frames
#[derive(Debug, Serialize)]
pub struct LectureView {
    #[serde(flatten)]
    pub lecture: Lecture,
    pub embeds: EmbedLinks,
}

impl LectureView {
    pub fn new(state: &AppState, lecture: Lecture) -> Self {
        let embeds = state.embeds.links(&lecture.embed_ids);
        Self { lecture, embeds }
    }
}

async fn load_classes(state: &AppState) -> Result<ClassesResponse> {
    let catalog = state.fetcher.fetch_catalog().await?;
    let stats = aggregate(&catalog.lectures);

    let classes = catalog
        .classes
        .into_iter()
        .map(|class| {
            let stats = stats.get_or_default(&class.category);
            ClassSummary { class, stats }
        })
        .collect();

    Ok(ClassesResponse {
        classes,
        computed_at: stats.computed_at(),
    })
}

async fn load_class(state: &AppState, raw_category: &str) -> Result<ClassResponse> {
    let category = CategoryKey::parse(raw_category)?;
    let detail = state.fetcher.fetch_class(&category).await?;
    let stats = aggregate(&detail.lectures).get_or_default(&category);

    Ok(ClassResponse {
        class: detail.class,
        lectures: detail.lectures,
        stats,
    })
}

async fn load_class_lecture(state: &AppState, raw_category: &str, raw_id: &str) -> Result<LectureView> {
    let category = CategoryKey::parse(raw_category)?;
    let lecture_id = parse_lecture_id(raw_id)?;
    let lecture = state.fetcher.fetch_lecture(&category, lecture_id).await?;
    Ok(LectureView::new(state, lecture))
}

fn respond<T: Serialize>(result: Result<T>) -> Response<Full<Bytes>> {
    match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => error_response(&e),
    }
}

/// GET / and /api/classes
pub async fn handle_classes(state: &AppState) -> Response<Full<Bytes>> {
    respond(load_classes(state).await)
}

/// GET /class
pub async fn handle_class_overview(state: &AppState) -> Response<Full<Bytes>> {
    respond(
        state
            .fetcher
            .fetch_grouped()
            .await
            .map(|classes| OverviewResponse { classes }),
    )
}

/// GET /class/{category}
pub async fn handle_class(state: &AppState, category: &str) -> Response<Full<Bytes>> {
    respond(load_class(state, category).await)
}

/// GET /class/{category}/{lecture_id}
pub async fn handle_class_lecture(
    state: &AppState,
    category: &str,
    lecture_id: &str,
) -> Response<Full<Bytes>> {
    respond(load_class_lecture(state, category, lecture_id).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogStore, InMemoryStore};
    use crate::test_support::{body_json, test_args, test_state, FixedIdentity, FixedMembership};
    use crate::types::AnchorError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_classes_include_stats_for_every_class() {
        let response = handle_classes(&test_state(true)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        let classes = body["classes"].as_array().unwrap();
        assert_eq!(classes.len(), 2);

        // Ordered by category: history, math
        assert_eq!(classes[0]["category"], "history");
        assert_eq!(classes[0]["stats"]["lectureCount"], 0);
        assert_eq!(classes[0]["stats"]["latestLectureId"], 0);
        assert_eq!(classes[0]["stats"]["lastUpdated"], body["computedAt"]);

        assert_eq!(classes[1]["name"], "Mathematics");
        assert_eq!(classes[1]["stats"]["lectureCount"], 2);
        assert_eq!(classes[1]["stats"]["latestLectureId"], 2);
        assert_eq!(classes[1]["stats"]["lastUpdated"], "2024-03-09T12:00:00Z");
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl CatalogStore for BrokenStore {
        async fn list_classes(&self) -> Result<Vec<Class>> {
            Ok(Vec::new())
        }
        async fn list_lectures(&self) -> Result<Vec<Lecture>> {
            Err(AnchorError::Datastore("permission denied for table lectures".into()))
        }
        async fn lectures_ordered(&self) -> Result<Vec<Lecture>> {
            Err(AnchorError::Datastore("permission denied for table lectures".into()))
        }
        async fn find_class(&self, _category: &CategoryKey) -> Result<Option<Class>> {
            Ok(None)
        }
        async fn lectures_for(&self, _category: &CategoryKey) -> Result<Vec<Lecture>> {
            Ok(Vec::new())
        }
        async fn find_lecture(&self, _c: &CategoryKey, _id: i64) -> Result<Option<Lecture>> {
            Ok(None)
        }
        async fn find_lectures_by_number(&self, _id: i64) -> Result<Vec<Lecture>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_generic_503() {
        let state = AppState::with_services(
            test_args(&[]),
            Arc::new(BrokenStore),
            Arc::new(FixedIdentity),
            Arc::new(FixedMembership(true)),
        );

        let response = handle_classes(&state).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["code"], "DATASTORE_ERROR");
        assert_eq!(body["error"], "Failed to load catalog");

        let response = handle_class_overview(&state).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_overview_groups_by_category() {
        let body = body_json(handle_class_overview(&test_state(true)).await).await;
        let groups = body["classes"].as_array().unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["category"], "math");
        assert_eq!(groups[0]["lectures"][0]["lecture_id"], 1);
        assert_eq!(groups[0]["lectures"][1]["lecture_id"], 2);
        assert_eq!(groups[1]["category"], "physics");
    }

    #[tokio::test]
    async fn test_class_detail() {
        let response = handle_class(&test_state(true), "math").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["class"]["name"], "Mathematics");
        assert_eq!(body["lectures"].as_array().unwrap().len(), 2);
        assert_eq!(body["stats"]["lectureCount"], 2);
    }

    #[tokio::test]
    async fn test_class_detail_not_found_and_bad_slug() {
        let state = test_state(true);

        let response = handle_class(&state, "physics").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");

        let response = handle_class(&state, "Math%20101").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_class_without_lectures_has_zero_stats() {
        let body = body_json(handle_class(&test_state(true), "history").await).await;
        assert_eq!(body["lectures"].as_array().unwrap().len(), 0);
        assert_eq!(body["stats"]["lectureCount"], 0);
    }

    #[tokio::test]
    async fn test_class_lecture_renders_embeds() {
        let response = handle_class_lecture(&test_state(true), "math", "2").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["id"], 10);
        assert_eq!(
            body["embeds"]["video"],
            "https://drive.google.com/file/d/vid-10/preview"
        );
        // Blank identifiers render nothing
        assert!(body["embeds"].get("audio").is_none());
        assert!(body["embeds"].get("text").is_none());
    }

    #[tokio::test]
    async fn test_class_lecture_errors() {
        let state = test_state(true);
        assert_eq!(
            handle_class_lecture(&state, "math", "9").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            handle_class_lecture(&state, "math", "two").await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let state = AppState::with_services(
            test_args(&[]),
            Arc::new(InMemoryStore::default()),
            Arc::new(FixedIdentity),
            Arc::new(FixedMembership(true)),
        );
        let body = body_json(handle_classes(&state).await).await;
        assert!(body["classes"].as_array().unwrap().is_empty());
    }
}
