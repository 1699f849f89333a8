//! Progress store boundary.
//!
//! The progress store owns lesson statuses and lives counters. The client
//! reaches it only through the request/response calls of `ProgressStore`
//! and gets no transactional guarantees across calls.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// One lesson row as reported by the store.
///
/// Raw wire values; the synchronizer normalises them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgressItem {
    /// Lesson number (1-based).
    pub lesson_number: i64,
    /// Status string (`locked`, `active` or `completed`).
    pub status: String,
}

impl LessonProgressItem {
    /// Create a progress item.
    pub fn new(lesson_number: i64, status: impl Into<String>) -> Self {
        Self {
            lesson_number,
            status: status.into(),
        }
    }
}

/// Lives counters as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivesRecord {
    /// Lives left.
    pub current_lives: i64,
    /// Maximum restored on reset.
    pub max_lives: i64,
    /// Last store-side reset.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_reset_date: DateTime<Utc>,
}

impl LivesRecord {
    /// Create a full balance with the given maximum.
    pub fn full(max_lives: i64) -> Self {
        Self {
            current_lives: max_lives,
            max_lives,
            last_reset_date: Utc::now(),
        }
    }
}

/// Acknowledgement of a `use_life` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseLifeReceipt {
    /// Authoritative count after the decrement.
    pub remaining_lives: i64,
    /// Maximum at the time of the call.
    pub max_lives: i64,
}

/// Accepts RFC 3339 timestamps and naive timestamps (read as UTC).
pub(crate) fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let message = format!("invalid timestamp: {}", raw);
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(message))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Trait for progress store clients.
///
/// Implementations talk to the store for one signed-in user. Writes are
/// acknowledged or fail; the caller decides what a failure means.
pub trait ProgressStore: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Read every lesson row the store tracks for a topic.
    fn topic_progress(&self, topic: &str) -> Result<Vec<LessonProgressItem>>;

    /// Set a lesson to `completed`.
    ///
    /// The store cascades its successor to `active` when one exists.
    fn mark_completed(&self, topic: &str, lesson: u32) -> Result<()>;

    /// Set a lesson to `active` unless it already is `active` or `completed`.
    fn mark_active(&self, topic: &str, lesson: u32) -> Result<()>;

    /// Read the lives counters.
    fn lives(&self) -> Result<LivesRecord>;

    /// Decrement lives by one.
    ///
    /// Fails when no lives are left.
    fn use_life(&self) -> Result<UseLifeReceipt>;
}

/// Blanket implementation of ProgressStore for Arc-wrapped stores.
///
/// Lets the synchronizer and the lives ledger share one store, including
/// `Arc<dyn ProgressStore>`.
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn topic_progress(&self, topic: &str) -> Result<Vec<LessonProgressItem>> {
        (**self).topic_progress(topic)
    }

    fn mark_completed(&self, topic: &str, lesson: u32) -> Result<()> {
        (**self).mark_completed(topic, lesson)
    }

    fn mark_active(&self, topic: &str, lesson: u32) -> Result<()> {
        (**self).mark_active(topic, lesson)
    }

    fn lives(&self) -> Result<LivesRecord> {
        (**self).lives()
    }

    fn use_life(&self) -> Result<UseLifeReceipt> {
        (**self).use_life()
    }
}

/// Test utilities for ProgressStore implementations.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::LessonGateError;

    fn status_of(items: &[LessonProgressItem], lesson: i64) -> Option<&str> {
        items
            .iter()
            .find(|i| i.lesson_number == lesson)
            .map(|i| i.status.as_str())
    }

    /// Verify the collaborator contract.
    ///
    /// Expects a fresh store whose catalog has topic `rent` with 3 lessons
    /// and whose lives start full at 3.
    pub fn check_store_contract<S: ProgressStore>(store: &S) {
        // Unknown progress reads as empty, not as an error
        assert!(store.topic_progress("rent").unwrap().is_empty());

        // Completion cascades to the successor
        store.mark_completed("rent", 1).unwrap();
        let items = store.topic_progress("rent").unwrap();
        assert_eq!(status_of(&items, 1), Some("completed"));
        assert_eq!(status_of(&items, 2), Some("active"));

        // Activation is a no-op on completed and active lessons
        store.mark_active("rent", 1).unwrap();
        store.mark_active("rent", 2).unwrap();
        let items = store.topic_progress("rent").unwrap();
        assert_eq!(status_of(&items, 1), Some("completed"));
        assert_eq!(status_of(&items, 2), Some("active"));

        // Completing the last lesson does not invent a successor
        store.mark_completed("rent", 3).unwrap();
        let items = store.topic_progress("rent").unwrap();
        assert_eq!(status_of(&items, 3), Some("completed"));
        assert_eq!(status_of(&items, 4), None);

        // Lives: decrement to zero, then refuse
        let lives = store.lives().unwrap();
        assert_eq!(lives.current_lives, 3);
        assert_eq!(lives.max_lives, 3);
        assert_eq!(store.use_life().unwrap().remaining_lives, 2);
        assert_eq!(store.use_life().unwrap().remaining_lives, 1);
        assert_eq!(store.use_life().unwrap().remaining_lives, 0);
        assert!(matches!(
            store.use_life(),
            Err(LessonGateError::Exhausted { .. })
        ));
        assert_eq!(store.lives().unwrap().current_lives, 0);
    }

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let dt = parse_timestamp("2025-03-01T10:00:00+00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_parse_naive_timestamp() {
        let dt = parse_timestamp("2025-03-01T10:00:00.123456").unwrap();
        assert_eq!(dt.timestamp(), 1_740_823_200);
    }

    #[test]
    fn test_parse_invalid_timestamp() {
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_lives_record_from_wire() {
        let json = r#"{
            "id": 1,
            "user_id": 7,
            "current_lives": 2,
            "max_lives": 3,
            "last_reset_date": "2025-03-01T10:00:00",
            "created_at": "2025-03-01T10:00:00"
        }"#;
        let record: LivesRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.current_lives, 2);
        assert_eq!(record.max_lives, 3);
    }

    #[test]
    fn test_use_life_receipt_from_wire() {
        let json = r#"{"message": "ok", "remaining_lives": 1, "max_lives": 3}"#;
        let receipt: UseLifeReceipt = serde_json::from_str(json).unwrap();
        assert_eq!(receipt.remaining_lives, 1);
        assert_eq!(receipt.max_lives, 3);
    }
}
