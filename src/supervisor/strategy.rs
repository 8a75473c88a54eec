//! Restart strategies.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// How a supervisor reacts when one of its children exits with a
/// restart-eligible reason.
///
/// # Strategy selection
///
/// - [`OneForOne`](Strategy::OneForOne): children are independent; only the
///   failed child restarts.
/// - [`OneForAll`](Strategy::OneForAll): children are interdependent; every
///   child restarts together.
/// - [`RestForOne`](Strategy::RestForOne): later children depend on earlier
///   ones; the failed child and everything started after it restart.
/// - [`SimpleOneForOne`](Strategy::SimpleOneForOne): homogeneous dynamic
///   children spawned from a template; only the failed child restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Restart only the failed child.
    OneForOne,
    /// Restart all children, in their original start order.
    OneForAll,
    /// Restart the failed child and all children started after it.
    RestForOne,
    /// Dynamic homogeneous children from a [`ChildTemplate`](crate::supervisor::ChildTemplate);
    /// only the failed child restarts.
    SimpleOneForOne,
}

impl Strategy {
    /// `true` for the dynamic template strategy.
    pub fn is_simple(&self) -> bool {
        matches!(self, Strategy::SimpleOneForOne)
    }
}

/// Compute the restart group for a failed child, in stable original order.
///
/// `is_running` reports whether the slot at an index currently holds a live
/// child; slots that are down for other reasons (manually terminated,
/// non-restartable exits) are not dragged back up by a group restart — the
/// failed slot itself is always included.
pub(crate) fn restart_set(
    strategy: Strategy,
    failed_index: usize,
    child_count: usize,
    is_running: impl Fn(usize) -> bool,
) -> Vec<usize> {
    let range = match strategy {
        Strategy::OneForOne | Strategy::SimpleOneForOne => return vec![failed_index],
        Strategy::OneForAll => 0..child_count,
        Strategy::RestForOne => failed_index..child_count,
    };
    range
        .filter(|&index| index == failed_index || is_running(index))
        .collect()
}
