//! Complete command for lessongate.
//!
//! Finishes a lesson through the completion protocol and reports where the
//! learner goes next.

use serde::Serialize;

use crate::core::TopicCatalog;
use crate::error::Result;
use crate::flow::{CompletionIntent, CompletionOutcome, LessonFlow};
use crate::store::ProgressStore;

/// Options for the complete command.
#[derive(Debug, Clone, Default)]
pub struct CompleteOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Return to the topic list instead of advancing.
    pub to_topic_list: bool,
}

/// Output format for the complete command.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteOutput {
    /// Whether the completion went through.
    pub success: bool,
    /// Topic slug.
    pub topic: String,
    /// Lesson number.
    pub lesson: u32,
    /// Where the learner goes next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CompletionOutcome>,
    /// Error message if the completion was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompleteOutput {
    fn from_result(topic: &str, lesson: u32, result: Result<CompletionOutcome>) -> Self {
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            success: error.is_none(),
            topic: topic.to_string(),
            lesson,
            outcome,
            error,
        }
    }
}

/// The complete command implementation.
pub struct CompleteCommand<S: ProgressStore + Clone> {
    flow: LessonFlow<S>,
}

impl<S: ProgressStore + Clone> CompleteCommand<S> {
    /// Create a new complete command.
    pub fn new(flow: LessonFlow<S>) -> Self {
        Self { flow }
    }

    /// Run the completion.
    pub fn run(&self, topic: &str, lesson: u32, options: &CompleteOptions) -> CompleteOutput {
        let intent = if options.to_topic_list {
            CompletionIntent::TopicList
        } else {
            CompletionIntent::NextLesson
        };
        let result = self.flow.complete_lesson(topic, lesson, intent);
        CompleteOutput::from_result(topic, lesson, result)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CompleteOutput, options: &CompleteOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            format_human_readable(output, self.flow.catalog())
        }
    }
}

fn format_human_readable(output: &CompleteOutput, catalog: &TopicCatalog) -> String {
    match (&output.outcome, &output.error) {
        (Some(CompletionOutcome::TerminalCompletion { topic, lesson, redirect }), _) => {
            let total = catalog.lesson_count(topic).unwrap_or(*lesson);
            format!(
                "Topic '{}' complete: all {} lessons done.\nReturning to {}\n",
                topic, total, redirect
            )
        }
        (Some(CompletionOutcome::Navigate { to }), _) => {
            format!("{}/{} done. Next: {}\n", output.topic, output.lesson, to)
        }
        (None, error) => format!(
            "Completion failed: {}\n",
            error.as_deref().unwrap_or("unknown error")
        ),
    }
}
