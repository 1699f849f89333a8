//! File-based progress store.
//!
//! A local stand-in for the remote store: one JSON document per user in
//! `<data_dir>/<user>.json`, written atomically via temp file + rename.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use tracing::info;

use crate::core::TopicCatalog;
use crate::error::{LessonGateError, Result};
use crate::store::document::UserDocument;
use crate::store::traits::{LessonProgressItem, LivesRecord, ProgressStore, UseLifeReceipt};

/// File-based progress store for one user.
#[derive(Debug)]
pub struct FileProgressStore {
    /// Directory holding user documents.
    data_dir: PathBuf,
    /// User the store reads and writes for.
    user: String,
    /// Catalog used for the completion cascade.
    catalog: TopicCatalog,
    /// Lives maximum for a newly created document.
    default_max_lives: u32,
    /// Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl FileProgressStore {
    /// Create a store in the given directory, creating it if needed.
    pub fn with_dir(
        data_dir: impl Into<PathBuf>,
        user: impl Into<String>,
        catalog: TopicCatalog,
        default_max_lives: u32,
    ) -> Result<Self> {
        let data_dir = data_dir.into();
        let user = user.into();

        if user.is_empty()
            || !user
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(LessonGateError::config(format!(
                "invalid user id '{}': use letters, digits, '-' or '_'",
                user
            )));
        }
        if default_max_lives == 0 {
            return Err(LessonGateError::config("lives maximum must be at least 1"));
        }

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).map_err(|e| LessonGateError::storage(&data_dir, e))?;
        }

        Ok(Self {
            data_dir,
            user,
            catalog,
            default_max_lives,
            lock: Mutex::new(()),
        })
    }

    /// Path of the user's document.
    fn document_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.user))
    }

    /// Path of the temp file used during atomic writes.
    fn temp_path(&self) -> PathBuf {
        self.data_dir.join(format!(".{}.json.tmp", self.user))
    }

    /// Load the user's document, or a fresh one if none exists.
    fn load(&self) -> Result<UserDocument> {
        let path = self.document_path();
        if !path.exists() {
            return Ok(UserDocument::new(self.default_max_lives));
        }
        let content = fs::read_to_string(&path).map_err(|e| LessonGateError::storage(&path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the user's document atomically.
    fn save(&self, document: &UserDocument) -> Result<()> {
        let final_path = self.document_path();
        let temp_path = self.temp_path();

        let json = serde_json::to_string_pretty(document)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| LessonGateError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| LessonGateError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| LessonGateError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| LessonGateError::storage(&final_path, e))?;
        Ok(())
    }

    /// Run a read-modify-write cycle under the process lock.
    fn update<T>(&self, f: impl FnOnce(&mut UserDocument) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.load()?;
        let value = f(&mut document)?;
        self.save(&document)?;
        Ok(value)
    }

    /// Overwrite the lives counters (store administration).
    pub fn set_lives(&self, record: LivesRecord) -> Result<()> {
        self.update(|doc| {
            doc.lives = record;
            Ok(())
        })
    }
}

impl ProgressStore for FileProgressStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn topic_progress(&self, topic: &str) -> Result<Vec<LessonProgressItem>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.items(topic))
    }

    fn mark_completed(&self, topic: &str, lesson: u32) -> Result<()> {
        self.update(|doc| {
            doc.complete(&self.catalog, topic, lesson, true);
            Ok(())
        })
    }

    fn mark_active(&self, topic: &str, lesson: u32) -> Result<()> {
        self.update(|doc| {
            doc.activate(topic, lesson);
            Ok(())
        })
    }

    fn lives(&self) -> Result<LivesRecord> {
        self.update(|doc| {
            if doc.reset_lives_if_due(Utc::now()) {
                info!(user = %self.user, max = doc.lives.max_lives, "daily lives reset");
            }
            Ok(doc.lives.clone())
        })
    }

    fn use_life(&self) -> Result<UseLifeReceipt> {
        self.update(|doc| doc.use_life())
    }
}
