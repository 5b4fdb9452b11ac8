//! Catalog fetcher
//!
//! Combines store reads into the shapes the routes need. Independent reads
//! run concurrently; the first failure wins and nothing is retried.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CatalogStore, CategoryKey, Class, Lecture};
use crate::types::{AnchorError, Result};

/// Full catalog: every class and every lecture
#[derive(Debug, Clone)]
pub struct Catalog {
    pub classes: Vec<Class>,
    pub lectures: Vec<Lecture>,
}

/// One class and its lectures in sequence order
#[derive(Debug, Clone, Serialize)]
pub struct ClassDetail {
    pub class: Class,
    pub lectures: Vec<Lecture>,
}

/// Lectures of one category, used by the grouped overview
#[derive(Debug, Clone, Serialize)]
pub struct ClassLectures {
    pub category: CategoryKey,
    pub lectures: Vec<Lecture>,
}

/// Catalog fetcher over an injected store
#[derive(Clone)]
pub struct CatalogFetcher {
    store: Arc<dyn CatalogStore>,
}

impl CatalogFetcher {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Classes and lectures, read concurrently
    pub async fn fetch_catalog(&self) -> Result<Catalog> {
        let (classes, lectures) =
            tokio::try_join!(self.store.list_classes(), self.store.list_lectures())?;

        debug!(classes = classes.len(), lectures = lectures.len(), "Catalog fetched");
        Ok(Catalog { classes, lectures })
    }

    /// One class plus its lectures ascending by lecture_id.
    ///
    /// A category matching no class row is `NotFound`, even when lectures
    /// exist for it.
    pub async fn fetch_class(&self, category: &CategoryKey) -> Result<ClassDetail> {
        let (class, mut lectures) = tokio::try_join!(
            self.store.find_class(category),
            self.store.lectures_for(category)
        )?;

        let class = class.ok_or_else(|| {
            debug!(category = %category, "Class not found");
            AnchorError::NotFound(format!("class '{}'", category))
        })?;

        lectures.sort_by_key(|l| l.lecture_id);
        Ok(ClassDetail { class, lectures })
    }

    /// One lecture by class and sequence number
    pub async fn fetch_lecture(&self, category: &CategoryKey, lecture_id: i64) -> Result<Lecture> {
        self.store
            .find_lecture(category, lecture_id)
            .await?
            .ok_or_else(|| {
                AnchorError::NotFound(format!("lecture {} in class '{}'", lecture_id, category))
            })
    }

    /// Every lecture ordered by lecture_id (category breaks ties)
    pub async fn fetch_lecture_index(&self) -> Result<Vec<Lecture>> {
        let mut lectures = self.store.lectures_ordered().await?;
        lectures.sort_by(|a, b| {
            a.lecture_id
                .cmp(&b.lecture_id)
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(lectures)
    }

    /// Lectures grouped per category, categories ascending
    pub async fn fetch_grouped(&self) -> Result<Vec<ClassLectures>> {
        let lectures = self.store.lectures_ordered().await?;
        Ok(group_by_class(lectures))
    }

    /// The lecture with a given sequence number, regardless of class.
    ///
    /// Sequence numbers are only unique per class. A number shared by
    /// several classes is ambiguous and reads as `NotFound`.
    pub async fn fetch_lecture_by_number(&self, lecture_id: i64) -> Result<Lecture> {
        let mut matches = self.store.find_lectures_by_number(lecture_id).await?;
        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(AnchorError::NotFound(format!("lecture {}", lecture_id))),
            count => {
                warn!(lecture_id, count, "Lecture number shared by several classes");
                Err(AnchorError::NotFound(format!("lecture {}", lecture_id)))
            }
        }
    }
}

/// Group lectures by category, keeping category order and in-group order
pub fn group_by_class(mut lectures: Vec<Lecture>) -> Vec<ClassLectures> {
    lectures.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(a.lecture_id.cmp(&b.lecture_id))
    });

    let mut groups: Vec<ClassLectures> = Vec::new();
    for lecture in lectures {
        match groups.last_mut() {
            Some(group) if group.category == lecture.category => group.lectures.push(lecture),
            _ => groups.push(ClassLectures {
                category: lecture.category.clone(),
                lectures: vec![lecture],
            }),
        }
    }
    groups
}
