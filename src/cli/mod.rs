//! CLI commands for lessongate.
//!
//! - **Learner actions**: check, start, complete
//! - **Inspection**: lives, progress

// Learner actions
pub mod check;
pub mod complete;
pub mod start;

// Inspection
pub mod lives;
pub mod progress;

pub use check::CheckCommand;
pub use complete::CompleteCommand;
pub use lives::LivesCommand;
pub use progress::ProgressCommand;
pub use start::StartCommand;
