//! Topic catalog: static mapping from topic slug to lesson count.
//!
//! Read-only configuration. Used to decide whether a lesson has a successor
//! and whether its content has been written yet.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::CatalogConfig;

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopicEntry {
    /// Total lessons in the topic.
    pub lessons: u32,
    /// Lessons `1..=authored` have content; later ones are in development.
    pub authored: u32,
}

/// Whether a lesson has content to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonContent {
    /// Content exists.
    Available,
    /// The lesson is listed but not written yet.
    InDevelopment,
}

/// Static topic catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicCatalog {
    topics: BTreeMap<String, TopicEntry>,
}

impl TopicCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the catalog from configuration.
    pub fn from_config(config: &CatalogConfig) -> Self {
        let mut catalog = Self::new();
        for (slug, lessons) in &config.topics {
            let authored = config.authored.get(slug).copied().unwrap_or(*lessons);
            catalog = catalog.with_entry(slug.clone(), *lessons, authored);
        }
        catalog
    }

    /// Add a topic whose lessons are all authored.
    pub fn with_topic(self, slug: impl Into<String>, lessons: u32) -> Self {
        self.with_entry(slug, lessons, lessons)
    }

    /// Add a topic with an explicit authored-lesson count.
    pub fn with_entry(mut self, slug: impl Into<String>, lessons: u32, authored: u32) -> Self {
        self.topics.insert(
            slug.into(),
            TopicEntry {
                lessons,
                authored: authored.min(lessons),
            },
        );
        self
    }

    /// Total lessons in a topic, if the topic is known.
    pub fn lesson_count(&self, topic: &str) -> Option<u32> {
        self.topics.get(topic).map(|e| e.lessons)
    }

    /// Check if the topic/lesson combination exists.
    pub fn contains(&self, topic: &str, lesson: u32) -> bool {
        self.lesson_count(topic)
            .is_some_and(|count| lesson >= 1 && lesson <= count)
    }

    /// Check if a lesson has a successor in the same topic.
    pub fn has_next_lesson(&self, topic: &str, lesson: u32) -> bool {
        match lesson.checked_add(1) {
            Some(next) => self.contains(topic, lesson) && self.contains(topic, next),
            None => false,
        }
    }

    /// Content availability for a lesson.
    pub fn content(&self, topic: &str, lesson: u32) -> LessonContent {
        match self.topics.get(topic) {
            Some(entry) if lesson >= 1 && lesson <= entry.authored => LessonContent::Available,
            _ => LessonContent::InDevelopment,
        }
    }

    /// Iterate over topics in slug order.
    pub fn topics(&self) -> impl Iterator<Item = (&str, &TopicEntry)> {
        self.topics.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check if the catalog has no topics.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
