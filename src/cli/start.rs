//! Start command for lessongate.
//!
//! Lives-gated lesson start: refuses when the balance is spent, checks
//! access, and spends a life only for a granted lesson.

use serde::Serialize;

use crate::core::Decision;
use crate::error::LessonGateError;
use crate::flow::LessonFlow;
use crate::store::ProgressStore;

/// Options for the start command.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the start command.
#[derive(Debug, Clone, Serialize)]
pub struct StartOutput {
    /// Whether the lesson was started.
    pub started: bool,
    /// Topic slug.
    pub topic: String,
    /// Lesson number.
    pub lesson: u32,
    /// Access decision, when the check ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// Balance shown after the command, as `current/max`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lives: Option<String>,
    /// Whether the start was refused for lack of lives.
    pub exhausted: bool,
    /// Error message if the start failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The start command implementation.
pub struct StartCommand<S: ProgressStore + Clone> {
    flow: LessonFlow<S>,
}

impl<S: ProgressStore + Clone> StartCommand<S> {
    /// Create a new start command.
    pub fn new(flow: LessonFlow<S>) -> Self {
        Self { flow }
    }

    /// Run the start.
    pub fn run(&mut self, topic: &str, lesson: u32) -> StartOutput {
        let result = self.flow.start_lesson(topic, lesson);
        let lives = self.flow.ledger().balance().map(|b| b.to_string());

        match result {
            Ok(outcome) => StartOutput {
                started: outcome.remaining_lives.is_some(),
                topic: topic.to_string(),
                lesson,
                decision: Some(outcome.decision),
                lives,
                exhausted: false,
                error: None,
            },
            Err(e) => {
                // Spent lives and expired sessions are expected outcomes
                if !e.is_user_facing() {
                    tracing::warn!(topic, lesson, error = %e, "lesson start failed");
                }
                StartOutput {
                    started: false,
                    topic: topic.to_string(),
                    lesson,
                    decision: None,
                    lives,
                    exhausted: matches!(e, LessonGateError::Exhausted { .. }),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StartOutput, options: &StartOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StartOutput) -> String {
        let lives = output.lives.as_deref().unwrap_or("?");
        if output.started {
            return format!(
                "Started {}/{}. Lives: {}\n",
                output.topic, output.lesson, lives
            );
        }
        if let Some(Decision::Deny { redirect }) = &output.decision {
            return format!(
                "{}/{} is locked, redirecting to {}. Lives: {}\n",
                output.topic, output.lesson, redirect, lives
            );
        }
        format!(
            "Cannot start {}/{}: {}\n",
            output.topic,
            output.lesson,
            output.error.as_deref().unwrap_or("unknown error")
        )
    }
}
