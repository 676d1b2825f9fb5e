//! Update rate control for state streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for state streams
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every state change as it is merged
    Native,

    /// Throttled to maximum Hz, latest state wins within an interval
    Max(u32),
}

impl UpdateRate {
    /// Normalize degenerate rates. `Max(0)` cannot be honoured and is treated as `Native`.
    pub fn normalize(self) -> Self {
        match self {
            UpdateRate::Max(0) => UpdateRate::Native,
            other => other,
        }
    }

    /// Check if throttling is needed
    pub fn needs_throttle(self) -> bool {
        matches!(self.normalize(), UpdateRate::Max(_))
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self) -> Option<Duration> {
        match self.normalize() {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}
