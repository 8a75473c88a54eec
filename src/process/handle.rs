//! Opaque process handles.

// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::state::ExitReason;
use super::table;
use crate::util::{ProcessId, ProcessKind};

/// Default grace period granted to a stopping process before it is killed.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Opaque handle to a process.
///
/// A `Ref` identifies a process by its stable id; two refs are equal exactly
/// when their ids are equal. A `Ref` may outlive the process it points to —
/// operations through a dead ref fail with `NotRunning` rather than
/// panicking. The ref does not own the mailbox; the runtime resolves the id
/// through its process table on every operation.
///
/// Typed handles ([`ServerRef`](crate::server::ServerRef),
/// [`SupervisorRef`](crate::supervisor::SupervisorRef)) can be recovered from
/// a `Ref` with [`Ref::downcast`](crate::server::ServerRef) /
/// [`Ref::downcast_supervisor`](crate::supervisor::SupervisorRef) after a
/// registry lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ref {
    id: ProcessId,
    kind: ProcessKind,
}

impl Ref {
    pub(crate) fn new(id: ProcessId, kind: ProcessKind) -> Self {
        Self { id, kind }
    }

    /// The stable process id.
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// The process kind this handle was minted for.
    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    /// Whether the process behind this handle is currently running.
    ///
    /// Returns `false` once the process has begun stopping, and for refs
    /// whose process is already gone.
    pub fn is_running(&self) -> bool {
        table::get(&self.id)
            .map(|cell| cell.status().is_alive())
            .unwrap_or(false)
    }

    /// Request a graceful stop with reason [`ExitReason::Normal`] and the
    /// default grace period, then wait until the process is stopped.
    pub async fn stop(&self) {
        self.stop_with(ExitReason::Normal, DEFAULT_SHUTDOWN_TIMEOUT)
            .await;
    }

    /// Request a graceful stop with an explicit reason and grace period.
    ///
    /// Resolves once the process reaches `Stopped`. A process that does not
    /// finish `terminate` within the grace period is killed; its mailbox is
    /// dropped and cleanup is abandoned. Concurrent stops are idempotent:
    /// later callers simply await the shutdown already in progress.
    pub async fn stop_with(&self, reason: ExitReason, grace: Duration) {
        table::stop_process(self, reason, grace).await;
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Ref {}

impl Hash for Ref {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
