//! Lives balance value type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LessonGateError, Result};

/// A bounded, periodically replenished attempt counter.
///
/// Invariant: `current <= max` and `max > 0`. Replenishment happens on the
/// store side; the client only observes `last_reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivesBalance {
    /// Lives left.
    pub current: u32,
    /// Upper bound restored on reset.
    pub max: u32,
    /// When the store last replenished the balance.
    pub last_reset: DateTime<Utc>,
}

impl LivesBalance {
    /// Build a balance from store-reported values.
    ///
    /// Negative counts clamp to zero and a count above `max` clamps to `max`.
    /// A non-positive `max` is rejected.
    pub fn from_store(current: i64, max: i64, last_reset: DateTime<Utc>) -> Result<Self> {
        if max <= 0 {
            return Err(LessonGateError::store(format!(
                "lives maximum must be positive, got {}",
                max
            )));
        }
        let max = u32::try_from(max)
            .map_err(|_| LessonGateError::store(format!("lives maximum {} out of range", max)))?;
        let clamped = current.clamp(0, i64::from(max));
        if clamped != current {
            tracing::warn!(current, max, "lives outside 0..=max, clamping");
        }
        Ok(Self {
            current: clamped as u32,
            max,
            last_reset,
        })
    }

    /// Check if no lives are left.
    pub fn is_exhausted(&self) -> bool {
        self.current == 0
    }
}

impl fmt::Display for LivesBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}
