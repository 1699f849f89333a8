//! Access decisions and the degraded-access policy.
//!
//! The policy decides what happens when the authoritative progress read
//! fails. It is a value, not a branch, so fail-open and fail-closed setups
//! can be swapped through configuration and tested on their own.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::progress::LessonStatus;
use crate::core::routes::Route;

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The lesson may be rendered.
    Grant { status: LessonStatus },
    /// The lesson is not reachable; navigate to `redirect`.
    Deny { redirect: Route },
}

impl Decision {
    /// Grant with the given status.
    pub fn grant(status: LessonStatus) -> Self {
        Self::Grant { status }
    }

    /// Deny and send the learner back to the topic's lesson list.
    pub fn deny_to_topic(topic: impl Into<String>) -> Self {
        Self::Deny {
            redirect: Route::topic_list(topic),
        }
    }

    /// Check if access was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Grant { .. })
    }

    /// Status of a granted lesson.
    pub fn status(&self) -> Option<LessonStatus> {
        match self {
            Self::Grant { status } => Some(*status),
            Self::Deny { .. } => None,
        }
    }

    /// Redirect target of a denial.
    pub fn redirect(&self) -> Option<&Route> {
        match self {
            Self::Grant { .. } => None,
            Self::Deny { redirect } => Some(redirect),
        }
    }
}

/// Behaviour when the progress read for lesson > 1 fails.
///
/// Lesson 1 is granted under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegradedAccessPolicy {
    /// Retry the read once; deny if the retry fails too.
    #[default]
    Permissive,
    /// Deny without retrying.
    Strict,
    /// Retry the read once; grant `active` if the retry fails too.
    Open,
}

/// Valid configuration values for the degraded-access policy.
pub const VALID_POLICIES: &[&str] = &["permissive", "strict", "open"];

impl DegradedAccessPolicy {
    /// Parse a policy name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "permissive" => Some(Self::Permissive),
            "strict" => Some(Self::Strict),
            "open" => Some(Self::Open),
            _ => None,
        }
    }

    /// Configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Strict => "strict",
            Self::Open => "open",
        }
    }

    /// Whether a failed read is retried once before falling back.
    pub fn retries(&self) -> bool {
        !matches!(self, Self::Strict)
    }

    /// Decision once no read for the topic succeeded.
    pub fn fallback(&self, topic: &str) -> Decision {
        match self {
            Self::Open => Decision::grant(LessonStatus::Active),
            Self::Permissive | Self::Strict => Decision::deny_to_topic(topic),
        }
    }
}

impl fmt::Display for DegradedAccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
