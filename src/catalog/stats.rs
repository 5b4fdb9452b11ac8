//! Per-class lecture statistics
//!
//! Folds the flat lecture list into one summary per class. Recomputed on
//! every request from the full lecture set and never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::{CategoryKey, Lecture};

/// Summary of one class's lectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub lecture_count: u32,
    /// Highest lecture sequence number seen
    pub latest_lecture_id: i64,
    /// Most recent lecture creation time
    pub last_updated: DateTime<Utc>,
}

impl ClassStats {
    /// Stats for a class without lectures
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            lecture_count: 0,
            latest_lecture_id: 0,
            last_updated: now,
        }
    }

    fn first(lecture: &Lecture) -> Self {
        Self {
            lecture_count: 1,
            latest_lecture_id: lecture.lecture_id.max(0),
            last_updated: lecture.created_at,
        }
    }

    fn absorb(&mut self, lecture: &Lecture) {
        self.lecture_count += 1;
        self.latest_lecture_id = self.latest_lecture_id.max(lecture.lecture_id);
        if lecture.created_at > self.last_updated {
            self.last_updated = lecture.created_at;
        }
    }
}

/// Stats keyed by category, with a total lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStatsMap {
    stats: HashMap<CategoryKey, ClassStats>,
    computed_at: DateTime<Utc>,
}

impl ClassStatsMap {
    /// Stats for a category; classes without lectures get
    /// `{0, 0, computed_at}`.
    pub fn get_or_default(&self, category: &CategoryKey) -> ClassStats {
        self.stats
            .get(category)
            .copied()
            .unwrap_or_else(|| ClassStats::empty(self.computed_at))
    }

    /// Stats only for categories that have at least one lecture
    pub fn get(&self, category: &CategoryKey) -> Option<&ClassStats> {
        self.stats.get(category)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }
}

/// Aggregate lectures using the current time as the default timestamp
pub fn aggregate(lectures: &[Lecture]) -> ClassStatsMap {
    aggregate_at(lectures, Utc::now())
}

/// Aggregate lectures in a single pass.
///
/// The result does not depend on input order.
pub fn aggregate_at(lectures: &[Lecture], now: DateTime<Utc>) -> ClassStatsMap {
    let mut stats: HashMap<CategoryKey, ClassStats> = HashMap::new();

    for lecture in lectures {
        stats
            .entry(lecture.category.clone())
            .and_modify(|s| s.absorb(lecture))
            .or_insert_with(|| ClassStats::first(lecture));
    }

    ClassStatsMap {
        stats,
        computed_at: now,
    }
}
