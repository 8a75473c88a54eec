//! Typed handle to a running generic server.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;
use tokio::time::timeout;

// Layer 3: Internal module imports
use super::error::ServerError;
use super::timer::{self, TimerRef};
use super::traits::GenServer;
use crate::mailbox::{Envelope, MailboxSender};
use crate::process::table::{self, ProcessCell};
use crate::process::{ExitReason, Ref};
use crate::util::ProcessKind;

/// Default deadline for [`ServerRef::call`].
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(5000);

/// Typed handle to a generic server.
///
/// Cheap to clone and safe to hold after the process dies — operations on a
/// dead handle fail with [`ServerError::NotRunning`]. The untyped
/// [`Ref`] behind the handle is available through [`ServerRef::target`],
/// e.g. for registry registration or child-spec factories.
pub struct ServerRef<S: GenServer> {
    target: Ref,
    sender: MailboxSender<S>,
}

impl<S: GenServer> Clone for ServerRef<S> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<S: GenServer> fmt::Debug for ServerRef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRef")
            .field("target", &self.target)
            .finish()
    }
}

impl<S: GenServer> PartialEq for ServerRef<S> {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl<S: GenServer> Eq for ServerRef<S> {}

impl<S: GenServer> ServerRef<S> {
    pub(crate) fn new(target: Ref, sender: MailboxSender<S>) -> Self {
        Self { target, sender }
    }

    /// The untyped process handle.
    pub fn target(&self) -> &Ref {
        &self.target
    }

    /// Stable id of the server process.
    pub fn id(&self) -> &crate::util::ProcessId {
        self.target.id()
    }

    /// Whether the server is currently running.
    pub fn is_running(&self) -> bool {
        self.target.is_running()
    }

    /// Synchronous request with the default 5 s deadline.
    pub async fn call(&self, request: S::Call) -> Result<S::Reply, ServerError> {
        self.call_with_timeout(request, DEFAULT_CALL_TIMEOUT).await
    }

    /// Synchronous request with an explicit deadline.
    ///
    /// Enqueues the request and awaits the handler's reply. On deadline
    /// expiry the caller gets [`ServerError::CallTimeout`]; the callee still
    /// processes the message and its reply is discarded — the callee is
    /// never told about the cancellation.
    pub async fn call_with_timeout(
        &self,
        request: S::Call,
        deadline: Duration,
    ) -> Result<S::Reply, ServerError> {
        self.live_cell()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Envelope::Call {
                payload: request,
                reply: reply_tx,
            })
            .map_err(|_| ServerError::NotRunning {
                id: self.id().clone(),
            })?;
        match timeout(deadline, reply_rx).await {
            Err(_) => Err(ServerError::CallTimeout {
                id: self.id().clone(),
                timeout: deadline,
            }),
            // The reply slot was dropped without an answer: the process was
            // torn down before our envelope was handled.
            Ok(Err(_)) => Err(ServerError::NotRunning {
                id: self.id().clone(),
            }),
            Ok(Ok(outcome)) => outcome,
        }
    }

    /// Fire-and-forget message.
    ///
    /// Enqueues unconditionally; fails only when the process record is gone
    /// or the server is already stopping.
    pub fn cast(&self, message: S::Cast) -> Result<(), ServerError> {
        self.live_cell()?;
        self.sender
            .send(Envelope::Cast { payload: message })
            .map_err(|_| ServerError::NotRunning {
                id: self.id().clone(),
            })
    }

    /// Schedule `message` for delivery as a cast after `delay`.
    ///
    /// The timer is non-durable: it is cancelled if the server stops first.
    pub fn send_after(&self, message: S::Cast, delay: Duration) -> Result<TimerRef, ServerError> {
        let cell = self.live_cell()?;
        Ok(timer::schedule(&cell, self.sender.clone(), message, delay))
    }

    /// Stop gracefully with reason `Normal` and the default grace period.
    pub async fn stop(&self) {
        self.target.stop().await;
    }

    /// Stop with an explicit reason and grace period; see
    /// [`Ref::stop_with`].
    pub async fn stop_with(&self, reason: ExitReason, grace: Duration) {
        self.target.stop_with(reason, grace).await;
    }

    /// Resolve the live process record, treating `Stopping` as dead.
    fn live_cell(&self) -> Result<Arc<ProcessCell>, ServerError> {
        let cell = table::get(self.id()).ok_or_else(|| ServerError::NotRunning {
            id: self.id().clone(),
        })?;
        if cell.status().is_alive() {
            Ok(cell)
        } else {
            Err(ServerError::NotRunning {
                id: self.id().clone(),
            })
        }
    }
}

impl<S: GenServer> From<ServerRef<S>> for Ref {
    fn from(server: ServerRef<S>) -> Ref {
        server.target
    }
}

impl<S: GenServer> From<&ServerRef<S>> for Ref {
    fn from(server: &ServerRef<S>) -> Ref {
        server.target.clone()
    }
}

impl Ref {
    /// Recover a typed server handle from an untyped ref.
    ///
    /// Returns `None` when the process is gone, is not a server, or was
    /// started with a different behaviour type. The usual source of refs to
    /// downcast is a [`registry::whereis`](crate::registry::whereis) lookup
    /// after a supervised restart.
    pub fn downcast<S: GenServer>(&self) -> Option<ServerRef<S>> {
        if self.kind() != ProcessKind::Server {
            return None;
        }
        let cell = table::get(self.id())?;
        let sender = cell.sender_any().downcast_ref::<MailboxSender<S>>()?;
        Some(ServerRef::new(self.clone(), sender.clone()))
    }
}
