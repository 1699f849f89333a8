//! In-memory progress store for testing.
//!
//! Honors the store contract and lets tests script outages, inconsistent
//! statuses and concurrent resets so the access rules can be exercised
//! deterministically.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::core::{LessonKey, LessonStatus, TopicCatalog};
use crate::error::{LessonGateError, Result};
use crate::store::document::UserDocument;
use crate::store::traits::{LessonProgressItem, LivesRecord, ProgressStore, UseLifeReceipt};

/// A write the store received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// `mark_completed` call.
    Completed(LessonKey),
    /// `mark_active` call.
    Activated(LessonKey),
}

#[derive(Debug)]
struct MemoryState {
    document: UserDocument,
    cascade: bool,
    failing_fetches: u32,
    fail_writes: bool,
    fail_lives: bool,
    reset_before_next_use: bool,
    fetch_count: u32,
    writes: Vec<StoreWrite>,
}

/// In-memory progress store.
///
/// Thread-safe implementation using `RwLock`. State is lost when the store
/// is dropped.
#[derive(Debug)]
pub struct MemoryProgressStore {
    catalog: TopicCatalog,
    state: RwLock<MemoryState>,
}

impl MemoryProgressStore {
    /// Create an empty store with full lives (3/3).
    pub fn new(catalog: TopicCatalog) -> Self {
        Self::with_max_lives(catalog, 3)
    }

    /// Create an empty store with full lives.
    pub fn with_max_lives(catalog: TopicCatalog, max_lives: u32) -> Self {
        Self {
            catalog,
            state: RwLock::new(MemoryState {
                document: UserDocument::new(max_lives),
                cascade: true,
                failing_fetches: 0,
                fail_writes: false,
                fail_lives: false,
                reset_before_next_use: false,
                fetch_count: 0,
                writes: Vec::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Store-side setup
    // =========================================================================

    /// Overwrite a status, bypassing the store rules.
    pub fn set_status(&self, topic: &str, lesson: u32, status: LessonStatus) {
        self.write().document.set_status(topic, lesson, status);
    }

    /// Overwrite the lives counters.
    pub fn set_lives(&self, current: i64, max: i64) {
        let mut state = self.write();
        state.document.lives.current_lives = current;
        state.document.lives.max_lives = max;
    }

    /// Restore lives to the maximum, as the periodic reset would.
    pub fn reset_lives(&self) {
        self.write().document.reset_lives(Utc::now());
    }

    /// Apply a reset right before the next `use_life` decrement.
    pub fn reset_before_next_use(&self) {
        self.write().reset_before_next_use = true;
    }

    /// Stop cascading completion to the successor.
    pub fn disable_cascade(&self) {
        self.write().cascade = false;
    }

    /// Fail the next `n` progress reads.
    pub fn fail_next_fetches(&self, n: u32) {
        self.write().failing_fetches = n;
    }

    /// Fail every completion and activation write.
    pub fn fail_writes(&self, fail: bool) {
        self.write().fail_writes = fail;
    }

    /// Fail every lives read and decrement.
    pub fn fail_lives(&self, fail: bool) {
        self.write().fail_lives = fail;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Writes received so far, including failed ones.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.read().writes.clone()
    }

    /// Number of progress reads received, including failed ones.
    pub fn fetch_count(&self) -> u32 {
        self.read().fetch_count
    }

    /// Stored status of a lesson.
    pub fn status(&self, topic: &str, lesson: u32) -> Option<LessonStatus> {
        self.read()
            .document
            .progress
            .get(topic)
            .and_then(|lessons| lessons.get(&lesson).copied())
    }

    /// Stored lives counters.
    pub fn lives_record(&self) -> LivesRecord {
        self.read().document.lives.clone()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn topic_progress(&self, topic: &str) -> Result<Vec<LessonProgressItem>> {
        let mut state = self.write();
        state.fetch_count += 1;
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(LessonGateError::store("simulated outage reading progress"));
        }
        Ok(state.document.items(topic))
    }

    fn mark_completed(&self, topic: &str, lesson: u32) -> Result<()> {
        let mut state = self.write();
        state
            .writes
            .push(StoreWrite::Completed(LessonKey::new(topic, lesson)));
        if state.fail_writes {
            return Err(LessonGateError::store("simulated outage writing progress"));
        }
        let cascade = state.cascade;
        let document = &mut state.document;
        document.complete(&self.catalog, topic, lesson, cascade);
        Ok(())
    }

    fn mark_active(&self, topic: &str, lesson: u32) -> Result<()> {
        let mut state = self.write();
        state
            .writes
            .push(StoreWrite::Activated(LessonKey::new(topic, lesson)));
        if state.fail_writes {
            return Err(LessonGateError::store("simulated outage writing progress"));
        }
        state.document.activate(topic, lesson);
        Ok(())
    }

    fn lives(&self) -> Result<LivesRecord> {
        let state = self.read();
        if state.fail_lives {
            return Err(LessonGateError::store("simulated outage reading lives"));
        }
        Ok(state.document.lives.clone())
    }

    fn use_life(&self) -> Result<UseLifeReceipt> {
        let mut state = self.write();
        if state.fail_lives {
            return Err(LessonGateError::store("simulated outage using a life"));
        }
        if state.reset_before_next_use {
            state.reset_before_next_use = false;
            state.document.reset_lives(Utc::now());
        }
        state.document.use_life()
    }
}
