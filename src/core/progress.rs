//! Lesson status and per-topic progress snapshots.
//!
//! Statuses are owned by the progress store. The types here are the
//! client-side, possibly stale copies the access controller reasons over.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of one lesson for one user.
///
/// An absent status is `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    /// Not reachable yet.
    #[default]
    Locked,
    /// Unlocked and in progress.
    Active,
    /// Finished by the learner.
    Completed,
}

/// Valid wire values for a lesson status.
pub const VALID_STATUSES: &[&str] = &["locked", "active", "completed"];

impl LessonStatus {
    /// Parse a status as reported by the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "locked" => Some(Self::Locked),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Check if a lesson in this status may be opened.
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }

    /// Check if the lesson has been finished.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (topic, lesson number) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonKey {
    /// Topic slug.
    pub topic: String,
    /// 1-based lesson number within the topic.
    pub lesson: u32,
}

impl LessonKey {
    /// Create a new lesson key.
    pub fn new(topic: impl Into<String>, lesson: u32) -> Self {
        Self {
            topic: topic.into(),
            lesson,
        }
    }

    /// Key of the preceding lesson, if any.
    pub fn previous(&self) -> Option<Self> {
        (self.lesson > 1).then(|| Self::new(self.topic.clone(), self.lesson - 1))
    }

    /// Key of the following lesson, if the number can be represented.
    pub fn next(&self) -> Option<Self> {
        let lesson = self.lesson.checked_add(1)?;
        Some(Self::new(self.topic.clone(), lesson))
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.lesson)
    }
}

/// Ordered lesson statuses for one topic, as returned by a single fetch.
///
/// Transient: refetched on every access check and never cached across
/// navigations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicProgressSnapshot {
    /// Topic slug.
    pub topic: String,
    /// Statuses keyed by lesson number. Missing lessons are locked.
    pub statuses: BTreeMap<u32, LessonStatus>,
}

impl TopicProgressSnapshot {
    /// Create an empty snapshot (every lesson locked).
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            statuses: BTreeMap::new(),
        }
    }

    /// Create a snapshot from (lesson, status) pairs.
    pub fn from_statuses(
        topic: impl Into<String>,
        statuses: impl IntoIterator<Item = (u32, LessonStatus)>,
    ) -> Self {
        Self {
            topic: topic.into(),
            statuses: statuses.into_iter().collect(),
        }
    }

    /// Status of a lesson, `Locked` when absent.
    pub fn status(&self, lesson: u32) -> LessonStatus {
        self.statuses.get(&lesson).copied().unwrap_or_default()
    }

    /// Status of a lesson if the store reported one.
    pub fn get(&self, lesson: u32) -> Option<LessonStatus> {
        self.statuses.get(&lesson).copied()
    }

    /// Set a lesson's status.
    pub fn set(&mut self, lesson: u32, status: LessonStatus) {
        self.statuses.insert(lesson, status);
    }

    /// Number of lessons the store reported.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Check if the store reported no lessons.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Number of completed lessons.
    pub fn completed_count(&self) -> usize {
        self.statuses.values().filter(|s| s.is_completed()).count()
    }

    /// Iterate over reported lessons in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, LessonStatus)> + '_ {
        self.statuses.iter().map(|(n, s)| (*n, *s))
    }

    /// Lessons that are reachable while their predecessor is not completed.
    ///
    /// Lesson 1 never appears here. A non-empty result means the store broke
    /// the ordering invariant.
    pub fn inconsistencies(&self) -> Vec<u32> {
        self.iter()
            .filter(|(n, s)| *n > 1 && s.is_reachable() && !self.status(n - 1).is_completed())
            .map(|(n, _)| n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(LessonStatus::parse("locked"), Some(LessonStatus::Locked));
        assert_eq!(LessonStatus::parse("active"), Some(LessonStatus::Active));
        assert_eq!(
            LessonStatus::parse(" Completed "),
            Some(LessonStatus::Completed)
        );
        assert_eq!(LessonStatus::parse("done"), None);
        assert_eq!(LessonStatus::parse(""), None);
    }

    #[test]
    fn test_status_as_str_matches_valid_statuses() {
        let all = [
            LessonStatus::Locked,
            LessonStatus::Active,
            LessonStatus::Completed,
        ];
        for status in all {
            assert!(VALID_STATUSES.contains(&status.as_str()));
            assert_eq!(LessonStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_reachability() {
        assert!(!LessonStatus::Locked.is_reachable());
        assert!(LessonStatus::Active.is_reachable());
        assert!(LessonStatus::Completed.is_reachable());
        assert!(LessonStatus::Completed.is_completed());
        assert!(!LessonStatus::Active.is_completed());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&LessonStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let status: LessonStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(status, LessonStatus::Active);
    }

    #[test]
    fn test_lesson_key_neighbours() {
        let key = LessonKey::new("rent", 2);
        assert_eq!(key.previous(), Some(LessonKey::new("rent", 1)));
        assert_eq!(key.next(), Some(LessonKey::new("rent", 3)));
        assert_eq!(LessonKey::new("rent", u32::MAX).next(), None);
        assert_eq!(LessonKey::new("rent", 1).previous(), None);
        assert_eq!(key.to_string(), "rent/2");
    }

    #[test]
    fn test_absent_lesson_is_locked() {
        let snapshot = TopicProgressSnapshot::new("rent");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.status(4), LessonStatus::Locked);
        assert_eq!(snapshot.get(4), None);
    }

    #[test]
    fn test_snapshot_counts() {
        let snapshot = TopicProgressSnapshot::from_statuses(
            "rent",
            [
                (1, LessonStatus::Completed),
                (2, LessonStatus::Completed),
                (3, LessonStatus::Active),
            ],
        );
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.completed_count(), 2);
        let order: Vec<u32> = snapshot.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_inconsistencies() {
        let consistent = TopicProgressSnapshot::from_statuses(
            "rent",
            [(1, LessonStatus::Completed), (2, LessonStatus::Active)],
        );
        assert!(consistent.inconsistencies().is_empty());

        let broken = TopicProgressSnapshot::from_statuses(
            "rent",
            [
                (1, LessonStatus::Active),
                (2, LessonStatus::Active),
                (4, LessonStatus::Completed),
            ],
        );
        assert_eq!(broken.inconsistencies(), vec![2, 4]);
    }
}
