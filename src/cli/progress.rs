//! Progress command for lessongate.
//!
//! Prints the normalised snapshot of one topic next to its catalog entry.

use serde::Serialize;

use crate::core::{LessonContent, LessonStatus, TopicCatalog, TopicProgressSnapshot};
use crate::store::ProgressStore;
use crate::sync::ProgressSync;

/// Options for the progress command.
#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One row of the progress listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonRow {
    /// Lesson number.
    pub lesson: u32,
    /// Status after normalisation.
    pub status: LessonStatus,
    /// Content availability.
    pub content: LessonContent,
}

/// Output format for the progress command.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressOutput {
    /// Whether the read succeeded.
    pub success: bool,
    /// Topic slug.
    pub topic: String,
    /// Lessons in the catalog, or the ones the store reported for unknown topics.
    pub lessons: Vec<LessonRow>,
    /// Completed lessons.
    pub completed: usize,
    /// Total lessons in the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Lessons reachable past an incomplete predecessor.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inconsistent: Vec<u32>,
    /// Error message if the read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The progress command implementation.
pub struct ProgressCommand<S: ProgressStore> {
    sync: ProgressSync<S>,
    catalog: TopicCatalog,
}

impl<S: ProgressStore> ProgressCommand<S> {
    /// Create a new progress command.
    pub fn new(sync: ProgressSync<S>, catalog: TopicCatalog) -> Self {
        Self { sync, catalog }
    }

    /// Run the command.
    pub fn run(&self, topic: &str) -> ProgressOutput {
        let total = self.catalog.lesson_count(topic);
        match self.sync.fetch_topic_progress(topic) {
            Ok(snapshot) => ProgressOutput {
                success: true,
                topic: topic.to_string(),
                lessons: self.rows(&snapshot, total),
                completed: snapshot.completed_count(),
                total,
                inconsistent: snapshot.inconsistencies(),
                error: None,
            },
            Err(e) => ProgressOutput {
                success: false,
                topic: topic.to_string(),
                lessons: Vec::new(),
                completed: 0,
                total,
                inconsistent: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    fn rows(&self, snapshot: &TopicProgressSnapshot, total: Option<u32>) -> Vec<LessonRow> {
        let lessons: Vec<u32> = match total {
            Some(count) => (1..=count).collect(),
            None => snapshot.iter().map(|(n, _)| n).collect(),
        };
        lessons
            .into_iter()
            .map(|lesson| LessonRow {
                lesson,
                status: snapshot.status(lesson),
                content: self.catalog.content(&snapshot.topic, lesson),
            })
            .collect()
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ProgressOutput, options: &ProgressOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ProgressOutput) -> String {
        if let Some(error) = &output.error {
            return format!(
                "Could not read progress for '{}': {}\n",
                output.topic, error
            );
        }

        let mut text = match output.total {
            Some(total) => format!(
                "{}: {}/{} completed\n",
                output.topic, output.completed, total
            ),
            None => format!("{}: not in catalog\n", output.topic),
        };
        for row in &output.lessons {
            let marker = match row.status {
                LessonStatus::Completed => "[x]",
                LessonStatus::Active => "[>]",
                LessonStatus::Locked => "[ ]",
            };
            text.push_str(&format!("  {} {:>2} {}", marker, row.lesson, row.status));
            if row.content == LessonContent::InDevelopment {
                text.push_str(" (in development)");
            }
            text.push('\n');
        }
        if !output.inconsistent.is_empty() {
            text.push_str(&format!(
                "Reachable before predecessor completed: {:?}\n",
                output.inconsistent
            ));
        }
        text
    }
}
