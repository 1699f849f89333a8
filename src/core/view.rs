//! Access view state machine.
//!
//! Tracks the access state of the lesson page currently on screen. Every
//! check is issued against a ticket; only the ticket of the most recent
//! navigation may move the view out of `Checking`. Late results from a
//! superseded navigation are dropped instead of aborting the transport.

use serde::Serialize;
use tracing::debug;

use crate::core::policy::Decision;
use crate::core::progress::LessonKey;

/// State of the lesson view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    /// Nothing on screen.
    #[default]
    Idle,
    /// Access check in flight; the page shows a loading state.
    Checking,
    /// Lesson content is rendered.
    Granted,
    /// The page redirected away.
    Denied,
}

impl ViewStatus {
    /// Check if a check has resolved for the current navigation.
    pub fn is_settled(&self) -> bool {
        matches!(self, ViewStatus::Granted | ViewStatus::Denied)
    }
}

/// Handle for one access check.
///
/// Issued by [`AccessView::begin`]; resolving with a stale ticket is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    generation: u64,
    key: LessonKey,
}

impl CheckTicket {
    /// Lesson the check is for.
    pub fn key(&self) -> &LessonKey {
        &self.key
    }

    /// Navigation generation the ticket belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Page-scoped access state.
#[derive(Debug, Default)]
pub struct AccessView {
    status: ViewStatus,
    generation: u64,
    target: Option<LessonKey>,
    decision: Option<Decision>,
}

impl AccessView {
    /// Create an idle view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    pub fn status(&self) -> ViewStatus {
        self.status
    }

    /// Lesson the view is showing or checking.
    pub fn target(&self) -> Option<&LessonKey> {
        self.target.as_ref()
    }

    /// Decision for the current navigation, once resolved.
    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    /// Check if the page should show its loading state.
    pub fn is_loading(&self) -> bool {
        self.status == ViewStatus::Checking
    }

    /// Current navigation generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Transition: any → Checking (navigation to a lesson).
    ///
    /// Supersedes any check still in flight.
    pub fn begin(&mut self, topic: impl Into<String>, lesson: u32) -> CheckTicket {
        self.generation += 1;
        let key = LessonKey::new(topic, lesson);
        self.status = ViewStatus::Checking;
        self.target = Some(key.clone());
        self.decision = None;
        CheckTicket {
            generation: self.generation,
            key,
        }
    }

    /// Transition: Checking → Granted | Denied.
    ///
    /// Returns `false` and leaves the view untouched when the ticket was
    /// superseded or the view already settled.
    pub fn resolve(&mut self, ticket: &CheckTicket, decision: Decision) -> bool {
        if ticket.generation != self.generation {
            debug!(
                lesson = %ticket.key,
                ticket = ticket.generation,
                current = self.generation,
                "discarding access result from superseded navigation"
            );
            return false;
        }
        if self.status != ViewStatus::Checking {
            debug!(
                lesson = %ticket.key,
                status = ?self.status,
                "access result arrived after view settled"
            );
            return false;
        }

        self.status = if decision.is_granted() {
            ViewStatus::Granted
        } else {
            ViewStatus::Denied
        };
        self.decision = Some(decision);
        true
    }

    /// Transition: any → Idle (navigation away or unmount).
    ///
    /// Pending results are ignored from here on.
    pub fn leave(&mut self) {
        self.generation += 1;
        self.status = ViewStatus::Idle;
        self.target = None;
        self.decision = None;
    }
}
