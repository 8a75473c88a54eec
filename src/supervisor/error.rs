//! Error types for supervisor operations.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::server::StartError;
use crate::util::ProcessId;

/// Errors surfaced by supervisor operations.
///
/// All variants carry the ids needed to locate the failure in a tree; they
/// are plain data and own no process state.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A child's start factory failed, either at supervisor startup or
    /// through the dynamic child API.
    #[error("failed to start child '{child}': {source}")]
    ChildStartFailed {
        /// Id of the child that failed to start.
        child: String,
        /// The originating start failure.
        #[source]
        source: StartError,
    },

    /// The restart-intensity limit fired; the supervisor terminated and its
    /// subtree is gone. Terminal for that subtree.
    #[error("supervisor {supervisor} exceeded {max_restarts} restarts within {within:?}")]
    MaxRestartsExceeded {
        /// Id of the terminating supervisor.
        supervisor: ProcessId,
        /// The configured restart budget.
        max_restarts: u32,
        /// The configured window.
        within: Duration,
    },

    /// `start_child` with an id that is already tracked (live or dead).
    #[error("child id '{child}' already exists in supervisor {supervisor}")]
    DuplicateChild {
        /// Id of the supervisor.
        supervisor: ProcessId,
        /// The clashing child id.
        child: String,
    },

    /// No child with the given id is tracked.
    #[error("no child '{child}' in supervisor {supervisor}")]
    ChildNotFound {
        /// Id of the supervisor.
        supervisor: ProcessId,
        /// The unknown child id.
        child: String,
    },

    /// `restart_child` on a child that is still running.
    #[error("child '{child}' in supervisor {supervisor} is already running")]
    ChildAlreadyRunning {
        /// Id of the supervisor.
        supervisor: ProcessId,
        /// The running child id.
        child: String,
    },

    /// `SimpleOneForOne` was configured without a child template.
    #[error("simple_one_for_one supervisor {supervisor} requires a child template")]
    MissingChildTemplate {
        /// Id of the supervisor.
        supervisor: ProcessId,
    },

    /// Template/spec usage does not match the configured strategy.
    #[error("invalid simple_one_for_one configuration for supervisor {supervisor}: {reason}")]
    InvalidSimpleOneForOneConfig {
        /// Id of the supervisor.
        supervisor: ProcessId,
        /// What was wrong.
        reason: String,
    },

    /// The requested supervisor name is taken by a live process.
    #[error("name '{name}' is already registered")]
    AlreadyRegistered {
        /// The contested name.
        name: String,
    },

    /// The supervisor behind the handle is gone or stopping.
    #[error("supervisor {id} is not running")]
    NotRunning {
        /// Id of the dead supervisor.
        id: ProcessId,
    },
}

impl SupervisorError {
    /// `true` for failures that end the supervisor's subtree for good.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SupervisorError::MaxRestartsExceeded { .. })
    }

    /// `true` for strategy/configuration mistakes detected synchronously.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SupervisorError::MissingChildTemplate { .. }
                | SupervisorError::InvalidSimpleOneForOneConfig { .. }
        )
    }

    /// The child id involved, when the error names one.
    pub fn child_id(&self) -> Option<&str> {
        match self {
            SupervisorError::ChildStartFailed { child, .. }
            | SupervisorError::DuplicateChild { child, .. }
            | SupervisorError::ChildNotFound { child, .. }
            | SupervisorError::ChildAlreadyRunning { child, .. } => Some(child),
            _ => None,
        }
    }
}
