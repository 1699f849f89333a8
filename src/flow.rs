//! Lesson flow: starting a lesson and the completion protocol.
//!
//! Ties the access controller, the lives ledger and the catalog together for
//! the two learner actions that change state.

use serde::Serialize;
use tracing::{info, warn};

use crate::access::AccessController;
use crate::core::{Decision, DegradedAccessPolicy, LessonContent, Route, TopicCatalog};
use crate::error::{LessonGateError, Result};
use crate::ledger::LivesLedger;
use crate::store::ProgressStore;

/// Where the learner wants to go after finishing a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionIntent {
    /// Advance to the following lesson.
    NextLesson,
    /// Return to the topic's lesson list.
    TopicList,
}

/// Result of finishing a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Navigate to `to`.
    Navigate { to: Route },
    /// The last lesson of the topic is done; show the completion message and
    /// return to `redirect`.
    TerminalCompletion {
        topic: String,
        lesson: u32,
        redirect: Route,
    },
}

impl CompletionOutcome {
    /// Page the learner ends up on.
    pub fn route(&self) -> &Route {
        match self {
            Self::Navigate { to } => to,
            Self::TerminalCompletion { redirect, .. } => redirect,
        }
    }
}

/// Result of a lives-gated lesson start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    /// Access decision for the lesson.
    pub decision: Decision,
    /// Lives left after the start, when a life was spent.
    pub remaining_lives: Option<u32>,
}

/// Lesson flow over one store.
#[derive(Debug)]
pub struct LessonFlow<S: ProgressStore + Clone> {
    catalog: TopicCatalog,
    access: AccessController<S>,
    ledger: LivesLedger<S>,
}

impl<S: ProgressStore + Clone> LessonFlow<S> {
    /// Create a flow sharing `store` between access checks and the ledger.
    pub fn new(store: S, catalog: TopicCatalog, policy: DegradedAccessPolicy) -> Self {
        Self {
            catalog,
            access: AccessController::new(store.clone(), policy),
            ledger: LivesLedger::new(store),
        }
    }

    /// The access controller.
    pub fn access(&self) -> &AccessController<S> {
        &self.access
    }

    /// The lives ledger.
    pub fn ledger(&self) -> &LivesLedger<S> {
        &self.ledger
    }

    /// The lives ledger, mutably.
    pub fn ledger_mut(&mut self) -> &mut LivesLedger<S> {
        &mut self.ledger
    }

    /// The topic catalog.
    pub fn catalog(&self) -> &TopicCatalog {
        &self.catalog
    }

    /// Whether a lesson has content to show.
    pub fn content(&self, topic: &str, lesson: u32) -> LessonContent {
        self.catalog.content(topic, lesson)
    }

    /// Start a lesson on a flow that rations starts.
    ///
    /// An exhausted balance fails before any request. A denied lesson costs
    /// nothing; a granted one spends a life.
    pub fn start_lesson(&mut self, topic: &str, lesson: u32) -> Result<StartOutcome> {
        let held = match self.ledger.balance() {
            Some(balance) => balance,
            None => self.ledger.get_balance()?,
        };
        if held.is_exhausted() {
            return Err(LessonGateError::Exhausted { max: held.max });
        }

        let decision = self.access.check_access(topic, lesson);
        if !decision.is_granted() {
            return Ok(StartOutcome {
                decision,
                remaining_lives: None,
            });
        }

        let remaining = self.ledger.use_life()?;
        info!(topic, lesson, remaining, "lesson started");
        Ok(StartOutcome {
            decision,
            remaining_lives: Some(remaining),
        })
    }

    /// Finish a lesson.
    ///
    /// With `NextLesson` on the last lesson of a topic nothing is written and
    /// the outcome is a terminal completion. Otherwise completion is
    /// persisted; a failed write is logged and navigation proceeds, the next
    /// access check repairs the store. Only a duplicate completion still in
    /// flight is an error.
    pub fn complete_lesson(
        &self,
        topic: &str,
        lesson: u32,
        intent: CompletionIntent,
    ) -> Result<CompletionOutcome> {
        let topic_list = Route::topic_list(topic);

        if !self.catalog.contains(topic, lesson) {
            warn!(topic, lesson, "lesson not in catalog, not persisted");
            return Ok(CompletionOutcome::Navigate { to: topic_list });
        }

        match intent {
            CompletionIntent::NextLesson if !self.catalog.has_next_lesson(topic, lesson) => {
                info!(topic, lesson, "last lesson of topic completed");
                Ok(CompletionOutcome::TerminalCompletion {
                    topic: topic.to_string(),
                    lesson,
                    redirect: topic_list,
                })
            }
            CompletionIntent::NextLesson => {
                self.persist_completion(topic, lesson)?;
                Ok(CompletionOutcome::Navigate {
                    to: Route::lesson(topic, lesson + 1),
                })
            }
            CompletionIntent::TopicList => {
                self.persist_completion(topic, lesson)?;
                Ok(CompletionOutcome::Navigate { to: topic_list })
            }
        }
    }

    fn persist_completion(&self, topic: &str, lesson: u32) -> Result<()> {
        match self.access.sync().mark_completed(topic, lesson) {
            Ok(()) => Ok(()),
            Err(e @ LessonGateError::InFlight { .. }) => Err(e),
            Err(e) => {
                warn!(topic, lesson, error = %e, "completion not persisted, continuing");
                Ok(())
            }
        }
    }
}
