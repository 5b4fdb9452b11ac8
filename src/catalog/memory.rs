//! In-memory catalog store
//!
//! Backs dev mode (optionally seeded from a JSON file) and the tests.

use serde::Deserialize;
use std::path::Path;

use super::{CatalogStore, CategoryKey, Class, Lecture};
use crate::types::{AnchorError, Result};

/// Seed file layout: `{ "classes": [...], "lectures": [...] }`
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
}

/// Catalog held in vectors
#[derive(Debug, Default)]
pub struct InMemoryStore {
    classes: Vec<Class>,
    lectures: Vec<Lecture>,
}

impl InMemoryStore {
    pub fn new(classes: Vec<Class>, lectures: Vec<Lecture>) -> Self {
        Self { classes, lectures }
    }

    /// Load a JSON seed file
    pub fn from_seed_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        let seed: Seed = serde_json::from_slice(&raw)
            .map_err(|e| AnchorError::Config(format!("Invalid seed {}: {}", path.display(), e)))?;
        Ok(Self::new(seed.classes, seed.lectures))
    }

    fn sorted_lectures(&self, filter: impl Fn(&Lecture) -> bool) -> Vec<Lecture> {
        let mut lectures: Vec<Lecture> = self.lectures.iter().filter(|l| filter(l)).cloned().collect();
        lectures.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then(a.lecture_id.cmp(&b.lecture_id))
        });
        lectures
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_classes(&self) -> Result<Vec<Class>> {
        let mut classes = self.classes.clone();
        classes.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(classes)
    }

    async fn list_lectures(&self) -> Result<Vec<Lecture>> {
        Ok(self.lectures.clone())
    }

    async fn lectures_ordered(&self) -> Result<Vec<Lecture>> {
        Ok(self.sorted_lectures(|_| true))
    }

    async fn find_class(&self, category: &CategoryKey) -> Result<Option<Class>> {
        Ok(self.classes.iter().find(|c| &c.category == category).cloned())
    }

    async fn lectures_for(&self, category: &CategoryKey) -> Result<Vec<Lecture>> {
        Ok(self.sorted_lectures(|l| &l.category == category))
    }

    async fn find_lecture(&self, category: &CategoryKey, lecture_id: i64) -> Result<Option<Lecture>> {
        Ok(self
            .lectures
            .iter()
            .find(|l| &l.category == category && l.lecture_id == lecture_id)
            .cloned())
    }

    async fn find_lectures_by_number(&self, lecture_id: i64) -> Result<Vec<Lecture>> {
        Ok(self.sorted_lectures(|l| l.lecture_id == lecture_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_seed_parses_and_orders() {
        let seed = serde_json::json!({
            "classes": [
                { "id": 2, "category": "physics", "name": "Physics", "tags": ["science"] },
                { "id": 1, "category": "math", "name": "Math", "tags": null }
            ],
            "lectures": [
                { "id": 10, "category": "math", "lecture_id": 2, "created_at": "2024-04-02T00:00:00Z" },
                { "id": 11, "category": "math", "lecture_id": 1, "created_at": "2024-04-01T00:00:00Z" }
            ]
        });
        let seed: Seed = serde_json::from_value(seed).unwrap();
        let store = InMemoryStore::new(seed.classes, seed.lectures);

        let classes = store.list_classes().await.unwrap();
        assert_eq!(classes[0].category.as_str(), "math");

        let math = CategoryKey::parse("math").unwrap();
        let lectures = store.lectures_for(&math).await.unwrap();
        let ids: Vec<i64> = lectures.iter().map(|l| l.lecture_id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert!(store.find_lecture(&math, 2).await.unwrap().is_some());
        assert!(store.find_lecture(&math, 9).await.unwrap().is_none());
    }

    #[test]
    fn test_seed_file() {
        let dir = std::env::temp_dir().join(format!("anchor-seed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("seed.json");
        std::fs::write(
            &good,
            r#"{"lectures":[{"id":1,"category":"math","lecture_id":4,"created_at":"2024-04-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        let store = assert_ok!(InMemoryStore::from_seed_file(&good));
        let lectures = assert_ok!(tokio_test::block_on(store.find_lectures_by_number(4)));
        assert_eq!(lectures.len(), 1);
        assert!(assert_ok!(tokio_test::block_on(store.list_classes())).is_empty());

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let err = assert_err!(InMemoryStore::from_seed_file(&bad));
        assert!(matches!(err, AnchorError::Config(_)));

        assert_err!(InMemoryStore::from_seed_file(&dir.join("missing.json")));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
