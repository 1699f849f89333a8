//! Core types for lessongate.
//!
//! Lesson statuses and snapshots, the lives balance, the topic catalog,
//! access decisions with the degraded-access policy, navigation routes and
//! the access view state machine.

pub mod catalog;
pub mod lives;
pub mod policy;
pub mod progress;
pub mod routes;
pub mod view;

pub use catalog::{LessonContent, TopicCatalog, TopicEntry};
pub use lives::LivesBalance;
pub use policy::{Decision, DegradedAccessPolicy, VALID_POLICIES};
pub use progress::{LessonKey, LessonStatus, TopicProgressSnapshot, VALID_STATUSES};
pub use routes::Route;
pub use view::{AccessView, CheckTicket, ViewStatus};
