//! Lives command for lessongate.
//!
//! Shows the lives balance, optionally spending one life.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::LessonGateError;
use crate::ledger::LivesLedger;
use crate::store::ProgressStore;

/// Options for the lives command.
#[derive(Debug, Clone, Default)]
pub struct LivesOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Spend one life.
    pub use_life: bool,
}

/// Output format for the lives command.
#[derive(Debug, Clone, Serialize)]
pub struct LivesOutput {
    /// Whether the command succeeded.
    pub success: bool,
    /// Lives left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
    /// Maximum lives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Last store-side reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reset: Option<DateTime<Utc>>,
    /// Whether a life was spent.
    pub used: bool,
    /// Whether the balance is spent.
    pub exhausted: bool,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The lives command implementation.
pub struct LivesCommand<S: ProgressStore> {
    ledger: LivesLedger<S>,
}

impl<S: ProgressStore> LivesCommand<S> {
    /// Create a new lives command.
    pub fn new(ledger: LivesLedger<S>) -> Self {
        Self { ledger }
    }

    /// Run the command.
    pub fn run(&mut self, options: &LivesOptions) -> LivesOutput {
        let mut error = None;
        let mut used = false;
        let mut exhausted = false;

        match self.ledger.get_balance() {
            Ok(_) if options.use_life => match self.ledger.use_life() {
                Ok(_) => used = true,
                Err(e) => {
                    exhausted = matches!(e, LessonGateError::Exhausted { .. });
                    error = Some(e.to_string());
                }
            },
            Ok(_) => {}
            Err(e) => error = Some(e.to_string()),
        }

        let balance = self.ledger.balance();
        LivesOutput {
            success: error.is_none(),
            current: balance.map(|b| b.current),
            max: balance.map(|b| b.max),
            last_reset: balance.map(|b| b.last_reset),
            used,
            exhausted: exhausted || balance.is_some_and(|b| b.is_exhausted()),
            error,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &LivesOutput, options: &LivesOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &LivesOutput) -> String {
        let mut text = String::new();
        if let (Some(current), Some(max)) = (output.current, output.max) {
            text.push_str(&format!("Lives: {}/{}\n", current, max));
        }
        if let Some(last_reset) = output.last_reset {
            text.push_str(&format!(
                "Last reset: {}\n",
                last_reset.format("%Y-%m-%d %H:%M UTC")
            ));
        }
        if output.used {
            text.push_str("Used one life.\n");
        }
        if let Some(message) = self.ledger.blocked_message() {
            text.push_str(&format!("Lesson starts disabled: {}\n", message));
        } else if let Some(error) = &output.error {
            text.push_str(&format!("Error: {}\n", error));
        }
        text
    }
}
