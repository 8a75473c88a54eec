//! Restart-intensity limiting.
//!
//! Guards against restart storms: each restart event is stamped into a
//! sliding window, and once the window holds more than `max_restarts`
//! entries the supervisor must stop restarting and terminate with
//! `MaxRestartsExceeded`.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

// Layer 3: Internal module imports
// (none)

/// Restart-intensity configuration: at most `max_restarts` restarts within
/// any `within` window.
///
/// The default of 3 restarts per 5 seconds suits most trees; stress and
/// chaos rigs configure far higher limits (hundreds per window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartIntensity {
    /// Restarts tolerated inside one window.
    pub max_restarts: u32,
    /// Window length.
    pub within: Duration,
}

impl RestartIntensity {
    /// Explicit limits.
    pub fn new(max_restarts: u32, within: Duration) -> Self {
        Self {
            max_restarts,
            within,
        }
    }
}

impl Default for RestartIntensity {
    fn default() -> Self {
        Self {
            max_restarts: 3,
            within: Duration::from_millis(5000),
        }
    }
}

/// Sliding window of restart timestamps, shared across all children of one
/// supervisor.
#[derive(Debug)]
pub(crate) struct IntensityWindow {
    limit: RestartIntensity,
    marks: VecDeque<Instant>,
}

impl IntensityWindow {
    pub(crate) fn new(limit: RestartIntensity) -> Self {
        Self {
            limit,
            marks: VecDeque::new(),
        }
    }

    /// Record a restart event at `now`; returns `true` when the limit is
    /// exceeded and the supervisor must escalate.
    ///
    /// Prunes entries older than the window, appends `now`, then checks the
    /// count against the limit.
    pub(crate) fn record(&mut self, now: Instant) -> bool {
        while let Some(oldest) = self.marks.front() {
            if now.duration_since(*oldest) > self.limit.within {
                self.marks.pop_front();
            } else {
                break;
            }
        }
        self.marks.push_back(now);
        self.marks.len() > self.limit.max_restarts as usize
    }
}
