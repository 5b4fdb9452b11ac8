//! Class and lecture catalog
//!
//! Read-only view over the `class` and `lectures` collections of the hosted
//! datastore.
//!
//! ```text
//! CatalogStore (PostgREST | in-memory)
//!      ↓
//! CatalogFetcher  ── concurrent reads, fail fast, not-found detection
//!      ↓
//! stats::aggregate ── per-class summary
//! ```

pub mod embed;
pub mod fetcher;
pub mod memory;
pub mod postgrest;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AnchorError, Result};

pub use embed::{EmbedLinks, EmbedTemplate};
pub use fetcher::{Catalog, CatalogFetcher, ClassDetail, ClassLectures};
pub use memory::InMemoryStore;
pub use postgrest::PostgrestStore;
pub use stats::{aggregate, aggregate_at, ClassStats, ClassStatsMap};

/// Collection holding classes
pub const CLASS_TABLE: &str = "class";

/// Collection holding lectures
pub const LECTURE_TABLE: &str = "lectures";

/// Maximum length of a category slug
pub const MAX_CATEGORY_LEN: usize = 64;

// =============================================================================
// Category key
// =============================================================================

/// Unique class slug, used as the routing segment `/class/{category}`.
///
/// Values coming from the datastore are trusted as-is; values coming from a
/// request path go through [`CategoryKey::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey(String);

impl CategoryKey {
    /// Validate an untrusted slug.
    ///
    /// Accepts lowercase ASCII letters, digits, `-` and `_`, not leading or
    /// trailing with a separator, at most [`MAX_CATEGORY_LEN`] characters.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(AnchorError::BadRequest("Category must not be empty".into()));
        }
        if raw.len() > MAX_CATEGORY_LEN {
            return Err(AnchorError::BadRequest(format!(
                "Category longer than {} characters",
                MAX_CATEGORY_LEN
            )));
        }

        let valid_chars = raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        let is_separator = |b: u8| b == b'-' || b == b'_';
        let bytes = raw.as_bytes();
        if !valid_chars || is_separator(bytes[0]) || is_separator(bytes[bytes.len() - 1]) {
            return Err(AnchorError::BadRequest(format!("Invalid category: {}", raw)));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Rows
// =============================================================================

/// A class (course category)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub category: CategoryKey,
    pub name: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// External document identifiers attached to a lecture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedIds {
    /// Video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// A single lecture within a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: i64,
    pub category: CategoryKey,
    /// Sequence number within the class
    pub lecture_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default)]
    pub embed_ids: EmbedIds,
}

// =============================================================================
// Store trait
// =============================================================================

/// Read access to the catalog collections (allows fakes in tests)
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// All classes, ordered by category ascending
    async fn list_classes(&self) -> Result<Vec<Class>>;

    /// All lectures, unordered
    async fn list_lectures(&self) -> Result<Vec<Lecture>>;

    /// All lectures ordered by category, then lecture_id ascending
    async fn lectures_ordered(&self) -> Result<Vec<Lecture>>;

    /// Class rows matching the category (zero or one)
    async fn find_class(&self, category: &CategoryKey) -> Result<Option<Class>>;

    /// Lectures of one class, ordered by lecture_id ascending
    async fn lectures_for(&self, category: &CategoryKey) -> Result<Vec<Lecture>>;

    /// One lecture by class and sequence number
    async fn find_lecture(&self, category: &CategoryKey, lecture_id: i64) -> Result<Option<Lecture>>;

    /// Lectures with the given sequence number across all classes,
    /// ordered by category ascending
    async fn find_lectures_by_number(&self, lecture_id: i64) -> Result<Vec<Lecture>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_category_key_accepts_slugs() {
        for slug in ["math", "calc-2", "intro_cs", "a", "x1"] {
            let key = assert_ok!(CategoryKey::parse(slug), "{slug} should be valid");
            assert_eq!(key.as_str(), slug);
        }
    }

    #[test]
    fn test_category_key_rejects_bad_slugs() {
        let too_long = "a".repeat(MAX_CATEGORY_LEN + 1);
        for slug in ["", "Math", "-math", "math_", "ma th", "../etc", "数学", too_long.as_str()] {
            let err = assert_err!(CategoryKey::parse(slug));
            assert!(matches!(err, AnchorError::BadRequest(_)), "{slug} should be rejected");
        }
    }

    #[test]
    fn test_lecture_deserializes_datastore_row() {
        let row = serde_json::json!({
            "id": 7,
            "category": "math",
            "lecture_id": 3,
            "created_at": "2024-04-01T09:30:00.123456+00:00",
            "chapter": null,
            "embed_ids": { "movie": "vid123", "text": "doc456" }
        });

        let lecture: Lecture = serde_json::from_value(row).unwrap();
        assert_eq!(lecture.category.as_str(), "math");
        assert_eq!(lecture.lecture_id, 3);
        assert_eq!(lecture.embed_ids.movie.as_deref(), Some("vid123"));
        assert!(lecture.embed_ids.audio.is_none());
        assert!(lecture.chapter.is_none());
    }

    #[test]
    fn test_class_tags_may_be_null() {
        let row = serde_json::json!({ "id": 1, "category": "math", "name": "Math", "tags": null });
        let class: Class = serde_json::from_value(row).unwrap();
        assert!(class.tags.is_none());
    }
}
