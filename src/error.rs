//! Error taxonomy for lessongate.
//!
//! Read failures on the access path are recovered by the access controller,
//! write failures are logged and swallowed, and an exhausted lives balance is
//! the only error meant to reach the learner as an actionable message.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for lessongate operations.
#[derive(Error, Debug)]
pub enum LessonGateError {
    /// Network or server failure while reading progress or lives.
    #[error("transient fetch error for {topic}: {message}")]
    TransientFetch { topic: String, message: String },

    /// The lives balance is zero.
    #[error("no lives left (0/{max}), wait for the next reset")]
    Exhausted { max: u32 },

    /// A completion or activation write was not acknowledged.
    #[error("{operation} failed for {topic} lesson {lesson}: {message}")]
    WriteFailure {
        operation: &'static str,
        topic: String,
        lesson: u32,
        message: String,
    },

    /// An identical write is already in flight for this lesson.
    #[error("write already in flight for {key}")]
    InFlight { key: String },

    /// The auth service rejected the session.
    #[error("authentication required")]
    AuthRequired,

    /// I/O errors from the local file store or config files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML (de)serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Any other failure reported by the progress store.
    #[error("store error: {message}")]
    Store { message: String },
}

/// A specialized Result type for lessongate operations.
pub type Result<T> = std::result::Result<T, LessonGateError>;

impl LessonGateError {
    /// Create a transient fetch error.
    pub fn transient_fetch(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientFetch {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create a write failure.
    pub fn write_failure(
        operation: &'static str,
        topic: impl Into<String>,
        lesson: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::WriteFailure {
            operation,
            topic: topic.into(),
            lesson,
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a generic store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Whether the access path may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }

    /// Whether this error should be shown to the learner.
    ///
    /// Everything else is logged and recovered locally.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::AuthRequired)
    }
}

impl From<io::Error> for LessonGateError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for LessonGateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Log-and-substitute handling for errors that must not block the learner.
pub trait FailOpen<T> {
    /// Log a warning and return the default value on error.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Log a warning and return the provided fallback on error.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the lessongate CLI.
pub mod exit_codes {
    /// Command succeeded (access granted, write issued, life used).
    pub const OK: i32 = 0;

    /// Command failed with an error.
    pub const ERROR: i32 = 1;

    /// Access denied or lives exhausted.
    pub const DENIED: i32 = 2;

    /// Panic.
    pub const CRASH: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_fetch_display() {
        let err = LessonGateError::transient_fetch("rent", "connection reset");
        assert_eq!(
            err.to_string(),
            "transient fetch error for rent: connection reset"
        );
    }

    #[test]
    fn test_exhausted_display() {
        let err = LessonGateError::Exhausted { max: 3 };
        assert!(err.to_string().contains("0/3"));
    }

    #[test]
    fn test_write_failure_display() {
        let err = LessonGateError::write_failure("mark_completed", "rent", 2, "503");
        assert_eq!(
            err.to_string(),
            "mark_completed failed for rent lesson 2: 503"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = LessonGateError::storage(
            "/tmp/user.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/user.json"));
    }

    #[test]
    fn test_only_transient_fetch_is_retryable() {
        assert!(LessonGateError::transient_fetch("rent", "x").is_retryable());
        assert!(!LessonGateError::Exhausted { max: 3 }.is_retryable());
        assert!(!LessonGateError::write_failure("mark_active", "rent", 2, "x").is_retryable());
        assert!(!LessonGateError::AuthRequired.is_retryable());
        assert!(!LessonGateError::store("x").is_retryable());
    }

    #[test]
    fn test_user_facing_errors() {
        assert!(LessonGateError::Exhausted { max: 3 }.is_user_facing());
        assert!(LessonGateError::AuthRequired.is_user_facing());
        assert!(!LessonGateError::write_failure("mark_completed", "rent", 3, "x").is_user_facing());
        assert!(!LessonGateError::transient_fetch("rent", "x").is_user_facing());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: LessonGateError = io_err.into();
        assert!(matches!(err, LessonGateError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: LessonGateError = json_err.into();
        assert!(matches!(err, LessonGateError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(LessonGateError::store("down"));
        assert!(result.fail_open_default("test context").is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<u32> = Err(LessonGateError::store("down"));
        assert_eq!(result.fail_open_with("test context", 42), 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<u32> = Ok(100);
        assert_eq!(result.fail_open_default("test context"), 100);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::OK, 0);
        assert_eq!(exit_codes::ERROR, 1);
        assert_eq!(exit_codes::DENIED, 2);
        assert_eq!(exit_codes::CRASH, 3);
    }
}
