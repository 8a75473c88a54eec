//! Error types for generic-server operations.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::process::FaultCause;
use crate::util::ProcessId;

/// Errors surfaced while starting a process.
#[derive(Debug, Error)]
pub enum StartError {
    /// `init` returned an error; the process never reached `Running`.
    #[error("initialization failed: {cause}")]
    InitFailed {
        /// The error `init` produced.
        cause: FaultCause,
    },

    /// `init` did not finish within the configured timeout.
    #[error("initialization timed out after {timeout:?}")]
    InitTimeout {
        /// The exceeded timeout.
        timeout: Duration,
    },

    /// The requested name is already held by a live process.
    #[error("name '{name}' is already registered")]
    AlreadyRegistered {
        /// The contested name.
        name: String,
    },

    /// A supervisor-valued child failed to start.
    #[error("supervisor start failed: {0}")]
    Supervisor(#[source] Box<crate::supervisor::SupervisorError>),
}

impl StartError {
    /// `true` when the failure came from `init` itself (error or timeout)
    /// rather than from the surrounding runtime.
    pub fn is_init_failure(&self) -> bool {
        matches!(
            self,
            StartError::InitFailed { .. } | StartError::InitTimeout { .. }
        )
    }
}

impl From<crate::supervisor::SupervisorError> for StartError {
    fn from(error: crate::supervisor::SupervisorError) -> Self {
        StartError::Supervisor(Box::new(error))
    }
}

/// Errors surfaced by operations on a running server.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    /// The target process is gone or already stopping.
    #[error("process {id} is not running")]
    NotRunning {
        /// Id of the dead process.
        id: ProcessId,
    },

    /// The callee did not reply within the caller's deadline.
    ///
    /// The message may still be processed; only the reply is discarded. The
    /// target may since have been restarted under a supervisor — refresh the
    /// ref through the registry before retrying.
    #[error("call to {id} timed out after {timeout:?}")]
    CallTimeout {
        /// Id of the callee.
        id: ProcessId,
        /// The elapsed deadline.
        timeout: Duration,
    },

    /// The callee's handler failed while processing this call.
    ///
    /// The callee crashes with the same cause; its supervisor, if any, sees
    /// an `Error` exit.
    #[error("handler failed: {cause}")]
    HandlerFailed {
        /// The handler's error.
        cause: FaultCause,
    },
}

impl ServerError {
    /// `true` for failures that may be transient from the caller's point of
    /// view (the process may have been restarted under a supervisor).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServerError::NotRunning { .. } | ServerError::CallTimeout { .. }
        )
    }

    /// Id of the process involved, when the error names one.
    pub fn process_id(&self) -> Option<&ProcessId> {
        match self {
            ServerError::NotRunning { id } | ServerError::CallTimeout { id, .. } => Some(id),
            ServerError::HandlerFailed { .. } => None,
        }
    }
}
