//! Per-user store document shared by the in-process stores.
//!
//! Holds the store-side rules: completion cascades to the successor listed
//! in the catalog, activation never downgrades, lives never go below zero,
//! and a new calendar day restores the lives maximum.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{LessonStatus, TopicCatalog};
use crate::error::{LessonGateError, Result};
use crate::store::traits::{LessonProgressItem, LivesRecord, UseLifeReceipt};

/// Everything the store keeps for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    /// Lesson statuses per topic.
    #[serde(default)]
    pub progress: BTreeMap<String, BTreeMap<u32, LessonStatus>>,
    /// Lives counters.
    pub lives: LivesRecord,
}

impl UserDocument {
    /// Create a document with no progress and full lives.
    pub fn new(max_lives: u32) -> Self {
        Self {
            progress: BTreeMap::new(),
            lives: LivesRecord::full(i64::from(max_lives)),
        }
    }

    /// Rows for a topic, in lesson order.
    pub fn items(&self, topic: &str) -> Vec<LessonProgressItem> {
        self.progress
            .get(topic)
            .map(|lessons| {
                lessons
                    .iter()
                    .map(|(n, s)| LessonProgressItem::new(i64::from(*n), s.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Overwrite a status without applying any rule.
    pub fn set_status(&mut self, topic: &str, lesson: u32, status: LessonStatus) {
        self.progress
            .entry(topic.to_string())
            .or_default()
            .insert(lesson, status);
    }

    /// Mark a lesson completed, cascading to its successor when `cascade`.
    pub fn complete(&mut self, catalog: &TopicCatalog, topic: &str, lesson: u32, cascade: bool) {
        self.set_status(topic, lesson, LessonStatus::Completed);
        if cascade && catalog.has_next_lesson(topic, lesson) {
            self.activate(topic, lesson + 1);
        }
    }

    /// Mark a lesson active unless it already is reachable.
    pub fn activate(&mut self, topic: &str, lesson: u32) {
        let lessons = self.progress.entry(topic.to_string()).or_default();
        let status = lessons.entry(lesson).or_default();
        if !status.is_reachable() {
            *status = LessonStatus::Active;
        }
    }

    /// Decrement lives by one.
    pub fn use_life(&mut self) -> Result<UseLifeReceipt> {
        if self.lives.current_lives <= 0 {
            return Err(LessonGateError::Exhausted {
                max: u32::try_from(self.lives.max_lives).unwrap_or(0),
            });
        }
        self.lives.current_lives -= 1;
        Ok(UseLifeReceipt {
            remaining_lives: self.lives.current_lives,
            max_lives: self.lives.max_lives,
        })
    }

    /// Restore the maximum.
    pub fn reset_lives(&mut self, now: DateTime<Utc>) {
        self.lives.current_lives = self.lives.max_lives;
        self.lives.last_reset_date = now;
    }

    /// Restore the maximum if the last reset happened on an earlier day.
    ///
    /// Returns whether a reset happened.
    pub fn reset_lives_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if now.date_naive() > self.lives.last_reset_date.date_naive() {
            self.reset_lives(now);
            return true;
        }
        false
    }
}
