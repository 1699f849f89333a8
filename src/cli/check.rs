//! Check command for lessongate.
//!
//! Runs one access check and reports the decision. Corrective activations
//! happen as part of the check.

use serde::Serialize;

use crate::access::AccessController;
use crate::core::{Decision, LessonContent, TopicCatalog};
use crate::store::ProgressStore;

/// Options for the check command.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the check command.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutput {
    /// Topic slug.
    pub topic: String,
    /// Lesson number.
    pub lesson: u32,
    /// Whether the lesson may be rendered.
    pub granted: bool,
    /// The access decision.
    pub decision: Decision,
    /// Content availability, for granted lessons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<LessonContent>,
}

/// The check command implementation.
pub struct CheckCommand<S: ProgressStore> {
    controller: AccessController<S>,
    catalog: TopicCatalog,
}

impl<S: ProgressStore> CheckCommand<S> {
    /// Create a new check command.
    pub fn new(controller: AccessController<S>, catalog: TopicCatalog) -> Self {
        Self {
            controller,
            catalog,
        }
    }

    /// Run the check.
    pub fn run(&self, topic: &str, lesson: u32) -> CheckOutput {
        let decision = self.controller.check_access(topic, lesson);
        let granted = decision.is_granted();
        CheckOutput {
            topic: topic.to_string(),
            lesson,
            granted,
            content: granted.then(|| self.catalog.content(topic, lesson)),
            decision,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CheckOutput, options: &CheckOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &CheckOutput) -> String {
        match &output.decision {
            Decision::Grant { status } => {
                let mut text = format!(
                    "{}/{}: granted ({})\n",
                    output.topic, output.lesson, status
                );
                if output.content == Some(LessonContent::InDevelopment) {
                    text.push_str("This lesson is still in development.\n");
                }
                text
            }
            Decision::Deny { redirect } => {
                format!(
                    "{}/{}: locked, redirecting to {}\n",
                    output.topic, output.lesson, redirect
                )
            }
        }
    }
}
