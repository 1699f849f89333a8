//! lessongate - lesson access gate and lives ledger
//!
//! lessongate gates sequential lesson content behind a per-topic completion
//! ladder and rations lesson starts with a replenishing lives balance. The
//! progress store that owns statuses and lives is treated as an opaque,
//! possibly inconsistent collaborator: the access controller repairs a
//! missed unlock on read, and write failures never block the learner.

pub mod access;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod flow;
pub mod ledger;
pub mod store;
pub mod sync;

pub use access::AccessController;
pub use config::Config;
pub use core::{
    AccessView, CheckTicket, Decision, DegradedAccessPolicy, LessonContent, LessonKey,
    LessonStatus, LivesBalance, Route, TopicCatalog, TopicProgressSnapshot, ViewStatus,
};
pub use error::{LessonGateError, Result};
pub use flow::{CompletionIntent, CompletionOutcome, LessonFlow, StartOutcome};
pub use ledger::LivesLedger;
pub use store::{
    open_store, FileProgressStore, HttpProgressStore, MemoryProgressStore, ProgressStore,
};
pub use sync::{InFlightGuard, ProgressSync, WriteOp};

// CLI commands
pub use cli::{CheckCommand, CompleteCommand, LivesCommand, ProgressCommand, StartCommand};
