//! Process status machine and exit reasons.
//!
//! Every process moves through the same status machine:
//!
//! ```text
//! Initializing -> Running -> Stopping -> Stopped
//!       |                       ^
//!       +--- init failure ------+ (never observable: the record is removed)
//! ```
//!
//! Transitions are monotonic; a process never re-enters an earlier status.

// Layer 1: Standard library imports
use std::error::Error;
use std::fmt::{self, Display};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Shared, cloneable handle to the error that crashed a handler.
///
/// The cause is delivered both to an in-flight caller (as
/// `ServerError::HandlerFailed`) and to lifecycle subscribers (inside
/// `LifecycleEvent::Crashed`), so it is reference-counted rather than owned.
pub type FaultCause = Arc<dyn Error + Send + Sync + 'static>;

/// Lifecycle status of a process.
///
/// # Example
/// ```rust
/// use procnest::process::ProcessStatus;
///
/// assert!(ProcessStatus::Running.is_alive());
/// assert!(!ProcessStatus::Stopping.is_alive());
/// assert!(ProcessStatus::Stopped.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// `init` is running; no message has been dequeued yet.
    Initializing,
    /// The handler loop is processing messages.
    Running,
    /// Shutdown was requested or a crash occurred; `terminate` may be running.
    Stopping,
    /// The process is gone. Terminal.
    Stopped,
}

impl ProcessStatus {
    /// Whether new work may still be enqueued for the process.
    pub fn is_alive(&self) -> bool {
        matches!(self, ProcessStatus::Initializing | ProcessStatus::Running)
    }

    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessStatus::Stopped)
    }
}

/// Why a process exited.
///
/// The reason determines whether a supervisor restarts the child; see the
/// restart eligibility table on
/// [`RestartPolicy`](crate::supervisor::RestartPolicy).
#[derive(Debug, Clone)]
pub enum ExitReason {
    /// The process finished on its own terms.
    Normal,
    /// The process was asked to stop (directly or by its supervisor).
    Shutdown,
    /// A handler failed; the cause is carried along.
    Error(FaultCause),
}

impl ExitReason {
    /// Build an `Error` reason from any error value.
    pub fn error(cause: impl Error + Send + Sync + 'static) -> Self {
        ExitReason::Error(Arc::new(cause))
    }

    /// `true` for [`ExitReason::Normal`].
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Normal)
    }

    /// `true` for [`ExitReason::Shutdown`].
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ExitReason::Shutdown)
    }

    /// `true` for [`ExitReason::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, ExitReason::Error(_))
    }

    /// The crash cause, if this is an `Error` exit.
    pub fn cause(&self) -> Option<&FaultCause> {
        match self {
            ExitReason::Error(cause) => Some(cause),
            _ => None,
        }
    }
}

impl Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal"),
            ExitReason::Shutdown => write!(f, "shutdown"),
            ExitReason::Error(cause) => write!(f, "error: {cause}"),
        }
    }
}

/// Fault recorded when a handler panics instead of returning an error.
///
/// The panic payload is flattened to a message string; panics carry no
/// structured data across the task boundary.
#[derive(Debug, Error)]
#[error("handler panicked: {message}")]
pub struct PanicFault {
    /// Rendered panic payload.
    pub message: String,
}

impl PanicFault {
    /// Extract the payload of a panicked task into a fault value.
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_string()
        };
        Self { message }
    }
}

/// Fault recorded when a child process exits before its supervisor could
/// attach to it.
#[derive(Debug, Error)]
#[error("process {id} exited during startup")]
pub struct EarlyExit {
    /// Id of the short-lived process.
    pub id: crate::util::ProcessId,
}
