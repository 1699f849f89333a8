//! Lesson Access Controller.
//!
//! Decides whether a lesson may be rendered by combining the stored status of
//! the lesson with the completion of its predecessor. The store's cascade on
//! completion is the primary unlock; when a read shows a completed
//! predecessor next to a locked lesson, the controller grants access and
//! issues one corrective `mark_active` (read-repair).
//!
//! Failed reads are handled by the configured [`DegradedAccessPolicy`].

use tracing::{debug, info, warn};

use crate::core::{
    AccessView, CheckTicket, Decision, DegradedAccessPolicy, LessonStatus, Route,
    TopicProgressSnapshot, ViewStatus,
};
use crate::error::{FailOpen, LessonGateError};
use crate::store::ProgressStore;
use crate::sync::ProgressSync;

/// Lesson Access Controller.
#[derive(Debug)]
pub struct AccessController<S: ProgressStore> {
    sync: ProgressSync<S>,
    policy: DegradedAccessPolicy,
}

impl<S: ProgressStore> AccessController<S> {
    /// Create a controller over a store.
    pub fn new(store: S, policy: DegradedAccessPolicy) -> Self {
        Self {
            sync: ProgressSync::new(store),
            policy,
        }
    }

    /// The synchronizer the controller reads and repairs through.
    pub fn sync(&self) -> &ProgressSync<S> {
        &self.sync
    }

    /// The degraded-access policy in effect.
    pub fn policy(&self) -> DegradedAccessPolicy {
        self.policy
    }

    /// Decide access to `lesson` of `topic`.
    ///
    /// Issues at most one retry of the read and at most one corrective write.
    pub fn check_access(&self, topic: &str, lesson: u32) -> Decision {
        if lesson == 0 {
            warn!(topic, "lesson numbers start at 1");
            return Decision::deny_to_topic(topic);
        }
        // The first lesson has no predecessor gate.
        if lesson == 1 {
            return Decision::grant(LessonStatus::Active);
        }

        match self.fetch(topic) {
            Ok(snapshot) => self.decide(&snapshot, lesson),
            Err(decision) => decision,
        }
    }

    /// Run the check a ticket was issued for.
    pub fn check(&self, ticket: &CheckTicket) -> Decision {
        let key = ticket.key();
        self.check_access(&key.topic, key.lesson)
    }

    /// Navigate `view` to a lesson, run the check and settle the view.
    pub fn check_access_for_view(
        &self,
        view: &mut AccessView,
        topic: &str,
        lesson: u32,
    ) -> ViewStatus {
        let ticket = view.begin(topic, lesson);
        let decision = self.check(&ticket);
        view.resolve(&ticket, decision);
        view.status()
    }

    /// Read the topic, retrying a transient failure once when the policy
    /// allows it.
    ///
    /// `Err` carries the decision to return without a snapshot.
    fn fetch(&self, topic: &str) -> Result<TopicProgressSnapshot, Decision> {
        let attempts = if self.policy.retries() { 2 } else { 1 };
        for attempt in 1..=attempts {
            match self.sync.fetch_topic_progress(topic) {
                Ok(snapshot) => return Ok(snapshot),
                Err(LessonGateError::AuthRequired) => {
                    warn!(topic, "session rejected while checking access");
                    return Err(Decision::Deny {
                        redirect: Route::Login,
                    });
                }
                Err(e) if e.is_retryable() => {
                    warn!(topic, attempt, attempts, error = %e, "progress read failed");
                }
                Err(e) => {
                    warn!(topic, error = %e, "progress read failed, not retrying");
                    break;
                }
            }
        }

        let decision = self.policy.fallback(topic);
        info!(
            topic,
            policy = %self.policy,
            granted = decision.is_granted(),
            "applying degraded-access policy"
        );
        Err(decision)
    }

    /// Apply the reachability rules to a snapshot (`lesson > 1`).
    fn decide(&self, snapshot: &TopicProgressSnapshot, lesson: u32) -> Decision {
        let topic = snapshot.topic.as_str();
        let current = snapshot.status(lesson);
        if current.is_reachable() {
            return Decision::grant(current);
        }

        if snapshot.status(lesson - 1).is_completed() {
            info!(topic, lesson, "read-repair: activating locked lesson");
            self.sync
                .mark_active(topic, lesson)
                .fail_open_default("corrective activation");
            return Decision::grant(LessonStatus::Active);
        }

        debug!(topic, lesson, "lesson locked, redirecting to topic list");
        Decision::deny_to_topic(topic)
    }
}
