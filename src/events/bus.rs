//! Process-wide lifecycle event broadcaster.
//!
//! Events are dispatched synchronously, after the state tables have been
//! updated for the transition they describe. Handlers therefore observe a
//! consistent world, but they run on the thread that committed the
//! transition and must not block indefinitely. A panicking handler is
//! logged and skipped; it never takes the runtime down.

// Layer 1: Standard library imports
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

// Layer 2: Third-party crate imports
use parking_lot::RwLock;
use tracing::warn;

// Layer 3: Internal module imports
use crate::process::{ExitReason, FaultCause, Ref};

type Handler = Arc<dyn Fn(&LifecycleEvent) + Send + Sync + 'static>;

/// Subscriber list. Append/remove under the write lock; dispatch clones a
/// snapshot so handlers never run while the lock is held.
static SUBSCRIBERS: LazyLock<RwLock<Vec<(u64, Handler)>>> = LazyLock::new(|| RwLock::new(Vec::new()));

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A lifecycle transition of one process.
///
/// Per process, events are emitted in state-transition order: exactly one
/// `Started`, at most one `Crashed`, exactly one `Terminated`. `Restarted`
/// is emitted by the supervising process for the replacement incarnation.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The process finished `init` and entered `Running`.
    Started {
        /// Handle of the started process.
        target: Ref,
    },
    /// A handler failed; the process is crashing.
    Crashed {
        /// Handle of the crashing process.
        target: Ref,
        /// What went wrong.
        error: FaultCause,
    },
    /// A supervisor replaced a failed child with a fresh incarnation.
    Restarted {
        /// Handle of the replacement process.
        target: Ref,
        /// Lifetime restart count of the child's slot.
        attempt: u32,
    },
    /// The process reached `Stopped`.
    Terminated {
        /// Handle of the stopped process.
        target: Ref,
        /// Final exit reason.
        reason: ExitReason,
    },
}

impl LifecycleEvent {
    /// The process this event is about.
    pub fn target(&self) -> &Ref {
        match self {
            LifecycleEvent::Started { target }
            | LifecycleEvent::Crashed { target, .. }
            | LifecycleEvent::Restarted { target, .. }
            | LifecycleEvent::Terminated { target, .. } => target,
        }
    }
}

/// Handle returned by [`subscribe`]; pass it to [`Subscription::unsubscribe`]
/// to remove the handler again.
#[derive(Debug)]
pub struct Subscription {
    token: u64,
}

impl Subscription {
    /// Remove the handler this subscription stands for. Idempotent.
    pub fn unsubscribe(self) {
        remove(self.token);
    }
}

/// Register a lifecycle handler.
///
/// The handler is invoked synchronously for every lifecycle transition in
/// the runtime, in subscription order. Keep handlers short; they run on the
/// path that committed the transition.
///
/// # Example
/// ```rust,no_run
/// use procnest::events::{self, LifecycleEvent};
///
/// let sub = events::subscribe(|event| {
///     if let LifecycleEvent::Crashed { target, error } = event {
///         eprintln!("{target} crashed: {error}");
///     }
/// });
/// # sub.unsubscribe();
/// ```
pub fn subscribe<F>(handler: F) -> Subscription
where
    F: Fn(&LifecycleEvent) + Send + Sync + 'static,
{
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    SUBSCRIBERS.write().push((token, Arc::new(handler)));
    Subscription { token }
}

fn remove(token: u64) {
    SUBSCRIBERS.write().retain(|(t, _)| *t != token);
}

/// Drop every subscriber. Test-harness hook.
pub(crate) fn clear() {
    SUBSCRIBERS.write().clear();
}

/// Dispatch an event to a snapshot of the current subscribers.
pub(crate) fn emit(event: LifecycleEvent) {
    let snapshot: Vec<Handler> = SUBSCRIBERS
        .read()
        .iter()
        .map(|(_, handler)| Arc::clone(handler))
        .collect();
    for handler in snapshot {
        if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
            warn!(target: "procnest::events", ?event, "lifecycle subscriber panicked");
        }
    }
}
