//! Progress Synchronizer.
//!
//! The protocol layer between the access rules and the progress store:
//! reads are normalised into a `TopicProgressSnapshot`, writes are
//! de-duplicated per lesson while in flight, and store failures are mapped
//! onto the error taxonomy (`TransientFetch` for reads, `WriteFailure` for
//! writes).

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::core::{LessonKey, LessonStatus, TopicProgressSnapshot};
use crate::error::{LessonGateError, Result};
use crate::store::{LessonProgressItem, ProgressStore};

/// Kind of progress write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOp {
    /// `mark_completed`.
    Complete,
    /// `mark_active` (corrective write).
    Activate,
}

impl WriteOp {
    /// Operation name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "mark_completed",
            Self::Activate => "mark_active",
        }
    }
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type InFlightSet = Mutex<HashSet<(WriteOp, LessonKey)>>;

fn lock(set: &InFlightSet) -> MutexGuard<'_, HashSet<(WriteOp, LessonKey)>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a write as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    in_flight: &'a InFlightSet,
    entry: (WriteOp, LessonKey),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.entry);
    }
}

/// Progress Synchronizer over a progress store.
#[derive(Debug)]
pub struct ProgressSync<S: ProgressStore> {
    store: S,
    in_flight: InFlightSet,
}

impl<S: ProgressStore> ProgressSync<S> {
    /// Create a synchronizer over a store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch every lesson status of a topic.
    ///
    /// All-or-nothing: any store failure yields `TransientFetch`, except a
    /// rejected session or a misconfigured store, which pass through.
    pub fn fetch_topic_progress(&self, topic: &str) -> Result<TopicProgressSnapshot> {
        let items = self.store.topic_progress(topic).map_err(|e| match e {
            LessonGateError::AuthRequired | LessonGateError::Config { .. } => e,
            other => LessonGateError::transient_fetch(topic, other.to_string()),
        })?;

        let snapshot = normalize(topic, items);
        let broken = snapshot.inconsistencies();
        if !broken.is_empty() {
            debug!(
                topic,
                lessons = ?broken,
                "store reports lessons reachable past an incomplete predecessor"
            );
        }
        Ok(snapshot)
    }

    /// Mark a write in flight.
    ///
    /// Fails with `InFlight` when the same write for the same lesson has not
    /// finished yet.
    pub fn begin_write(&self, op: WriteOp, key: LessonKey) -> Result<InFlightGuard<'_>> {
        let mut in_flight = lock(&self.in_flight);
        let entry = (op, key);
        if in_flight.contains(&entry) {
            return Err(LessonGateError::InFlight {
                key: format!("{} {}", op, entry.1),
            });
        }
        in_flight.insert(entry.clone());
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            entry,
        })
    }

    /// Ask the store to complete a lesson (the store cascades its successor).
    pub fn mark_completed(&self, topic: &str, lesson: u32) -> Result<()> {
        self.write(WriteOp::Complete, topic, lesson)
    }

    /// Ask the store to activate a lesson; a no-op store-side when it is
    /// already reachable.
    pub fn mark_active(&self, topic: &str, lesson: u32) -> Result<()> {
        self.write(WriteOp::Activate, topic, lesson)
    }

    fn write(&self, op: WriteOp, topic: &str, lesson: u32) -> Result<()> {
        let _guard = self.begin_write(op, LessonKey::new(topic, lesson))?;
        let result = match op {
            WriteOp::Complete => self.store.mark_completed(topic, lesson),
            WriteOp::Activate => self.store.mark_active(topic, lesson),
        };
        let operation = op.as_str();
        result.map_err(|e| LessonGateError::write_failure(operation, topic, lesson, e.to_string()))
    }
}

/// Normalise raw store rows into a snapshot.
///
/// Rows with a lesson number below 1 are dropped, unknown statuses read as
/// `locked`, and a repeated lesson number keeps its last row.
pub fn normalize(topic: &str, items: Vec<LessonProgressItem>) -> TopicProgressSnapshot {
    let mut snapshot = TopicProgressSnapshot::new(topic);
    for item in items {
        let Some(lesson) = u32::try_from(item.lesson_number).ok().filter(|n| *n >= 1) else {
            warn!(
                topic,
                lesson_number = %item.lesson_number,
                "dropping progress row with invalid lesson number"
            );
            continue;
        };
        let status = LessonStatus::parse(&item.status).unwrap_or_else(|| {
            warn!(
                topic,
                lesson,
                status = %item.status,
                "unknown lesson status, treating as locked"
            );
            LessonStatus::Locked
        });
        snapshot.set(lesson, status);
    }
    snapshot
}
