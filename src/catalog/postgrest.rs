//! PostgREST-backed catalog store
//!
//! Reads the hosted datastore through its REST facade:
//! `GET {base}/rest/v1/{table}?select=*&{column}=eq.{value}&order={column}.asc`

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use super::{CatalogStore, CategoryKey, Class, Lecture, CLASS_TABLE, LECTURE_TABLE};
use crate::types::{AnchorError, Result};

/// Catalog store talking to `/rest/v1`
pub struct PostgrestStore {
    base_url: String,
    anon_key: String,
    http_client: reqwest::Client,
}

impl PostgrestStore {
    pub fn new(base_url: &str, anon_key: &str, request_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("anchor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnchorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http_client,
        })
    }

    /// Run a select against a table and decode the row array
    async fn select<T: DeserializeOwned>(&self, table: &str, params: &[(&str, String)]) -> Result<Vec<T>> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(params.iter().cloned());

        debug!(table = %table, ?query, "Datastore select");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Accept", "application/json")
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                error!(table = %table, error = %e, "Datastore request failed");
                AnchorError::Datastore(format!("{} request failed: {}", table, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(table = %table, %status, body = %body, "Datastore returned error");
            return Err(AnchorError::Datastore(format!("{} returned HTTP {}", table, status)));
        }

        response.json::<Vec<T>>().await.map_err(|e| {
            error!(table = %table, error = %e, "Datastore returned malformed rows");
            AnchorError::Datastore(format!("{} rows malformed: {}", table, e))
        })
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

#[async_trait::async_trait]
impl CatalogStore for PostgrestStore {
    async fn list_classes(&self) -> Result<Vec<Class>> {
        self.select(CLASS_TABLE, &[("order", "category.asc".to_string())]).await
    }

    async fn list_lectures(&self) -> Result<Vec<Lecture>> {
        self.select(LECTURE_TABLE, &[]).await
    }

    async fn lectures_ordered(&self) -> Result<Vec<Lecture>> {
        self.select(LECTURE_TABLE, &[("order", "category.asc,lecture_id.asc".to_string())])
            .await
    }

    async fn find_class(&self, category: &CategoryKey) -> Result<Option<Class>> {
        let rows: Vec<Class> = self
            .select(CLASS_TABLE, &[("category", eq(category)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn lectures_for(&self, category: &CategoryKey) -> Result<Vec<Lecture>> {
        self.select(
            LECTURE_TABLE,
            &[("category", eq(category)), ("order", "lecture_id.asc".to_string())],
        )
        .await
    }

    async fn find_lecture(&self, category: &CategoryKey, lecture_id: i64) -> Result<Option<Lecture>> {
        let rows: Vec<Lecture> = self
            .select(
                LECTURE_TABLE,
                &[
                    ("category", eq(category)),
                    ("lecture_id", eq(lecture_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_lectures_by_number(&self, lecture_id: i64) -> Result<Vec<Lecture>> {
        self.select(
            LECTURE_TABLE,
            &[("lecture_id", eq(lecture_id)), ("order", "category.asc".to_string())],
        )
        .await
    }
}
