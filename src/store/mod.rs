//! Progress store clients.
//!
//! Provides the `ProgressStore` trait and implementations:
//! - `MemoryProgressStore` for tests
//! - `FileProgressStore` as a local stand-in for the remote store
//! - `HttpProgressStore` for the remote store

pub mod document;
pub mod file;
pub mod http;
pub mod memory;
pub mod traits;

pub use document::UserDocument;
pub use file::FileProgressStore;
pub use http::HttpProgressStore;
pub use memory::{MemoryProgressStore, StoreWrite};
pub use traits::{LessonProgressItem, LivesRecord, ProgressStore, UseLifeReceipt};

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::core::TopicCatalog;
use crate::error::{LessonGateError, Result};

/// Open the store selected by `[store] backend`.
pub fn open_store(config: &Config, catalog: &TopicCatalog) -> Result<Arc<dyn ProgressStore>> {
    match config.store.backend.as_str() {
        "file" => {
            let data_dir = config
                .data_dir()
                .ok_or_else(|| LessonGateError::config("cannot determine data directory"))?;
            let store = FileProgressStore::with_dir(
                data_dir,
                config.store.user.clone(),
                catalog.clone(),
                config.lives.default_max,
            )?;
            Ok(Arc::new(store))
        }
        "http" => {
            let store = HttpProgressStore::new(
                &config.store.base_url,
                config.store.token.clone(),
                Duration::from_secs(config.store.timeout_seconds),
            )?;
            Ok(Arc::new(store))
        }
        other => Err(LessonGateError::config(format!(
            "unknown store backend '{}'",
            other
        ))),
    }
}
