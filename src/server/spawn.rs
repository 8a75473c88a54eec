//! Starting servers and driving their handler loops.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::error::{ServerError, StartError};
use super::handle::ServerRef;
use super::traits::GenServer;
use crate::events::{self, LifecycleEvent};
use crate::mailbox::{self, Envelope, Mailbox};
use crate::process::table::{self, ControlSignal, ProcessCell};
use crate::process::{ExitReason, FaultCause, PanicFault, Ref, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::registry::{self, RegistryError};
use crate::util::{ProcessId, ProcessKind};

/// Default time `init` is given before `start` fails with `InitTimeout`.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Options for [`start`].
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use procnest::server::SpawnOpts;
///
/// let opts = SpawnOpts::new()
///     .named("sessions")
///     .init_timeout(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpawnOpts {
    pub(crate) name: Option<String>,
    pub(crate) init_timeout: Option<Duration>,
}

impl SpawnOpts {
    /// Options with no name and the default init timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the server in the registry under `name` at start.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the init timeout.
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = Some(timeout);
        self
    }
}

/// Start a generic server process.
///
/// `init` runs to completion (bounded by the init timeout) before any
/// message is dequeued and before `start` returns, so a returned handle
/// always points at a `Running` process that already emitted `Started`. On
/// init failure or timeout the process never existed as far as lifecycle
/// observers are concerned: no event fires and the name reservation is
/// rolled back.
pub async fn start<S: GenServer>(mut server: S, opts: SpawnOpts) -> Result<ServerRef<S>, StartError> {
    let id = ProcessId::next(ProcessKind::Server);
    let target = Ref::new(id, ProcessKind::Server);
    let (sender, inbox) = mailbox::channel::<S>();
    let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
    let cell = ProcessCell::new(target.clone(), Box::new(sender.clone()), ctrl_tx);
    table::insert(Arc::clone(&cell));

    if let Some(name) = &opts.name {
        if let Err(error) = registry::register(name.clone(), &target) {
            table::discard(&cell);
            return Err(match error {
                RegistryError::AlreadyRegistered { name } => StartError::AlreadyRegistered { name },
                // The record was just inserted; only the name can clash.
                RegistryError::NotRunning { .. } => StartError::AlreadyRegistered {
                    name: name.clone(),
                },
            });
        }
    }

    let init_timeout = opts.init_timeout.unwrap_or(DEFAULT_INIT_TIMEOUT);
    match timeout(init_timeout, server.init()).await {
        Err(_) => {
            table::discard(&cell);
            return Err(StartError::InitTimeout {
                timeout: init_timeout,
            });
        }
        Ok(Err(error)) => {
            table::discard(&cell);
            return Err(StartError::InitFailed {
                cause: Arc::new(error),
            });
        }
        Ok(Ok(())) => {}
    }

    // A named server can be stopped through the registry while still
    // initializing; in that case the loop starts straight into shutdown.
    cell.try_set_running();

    let join = tokio::spawn(run_loop(server, Arc::clone(&cell), inbox, ctrl_rx));
    cell.set_abort(join.abort_handle());
    spawn_exit_watcher(Arc::clone(&cell), join);

    debug!(process = %target.id(), name = opts.name.as_deref(), "server started");
    events::emit(LifecycleEvent::Started {
        target: target.clone(),
    });
    Ok(ServerRef::new(target, sender))
}

/// The per-process handler loop.
///
/// Exactly one handler invocation is active at a time; the control channel
/// is polled first (biased) so a pending shutdown is honoured between
/// messages, never in the middle of one.
async fn run_loop<S: GenServer>(
    mut server: S,
    cell: Arc<ProcessCell>,
    mut inbox: Mailbox<S>,
    mut ctrl_rx: mpsc::UnboundedReceiver<ControlSignal>,
) {
    let (reason, deadline) = loop {
        tokio::select! {
            biased;
            signal = ctrl_rx.recv() => {
                match signal {
                    Some(ControlSignal::Shutdown { reason, deadline }) => {
                        break (reason, Some(deadline));
                    }
                    // Control channel gone: the record was torn down.
                    None => break (ExitReason::Shutdown, None),
                }
            }
            envelope = inbox.recv() => {
                let Some(envelope) = envelope else {
                    break (ExitReason::Normal, None);
                };
                match envelope {
                    Envelope::Call { payload, reply } => {
                        match server.handle_call(payload).await {
                            Ok(value) => {
                                // The caller may have timed out; the reply is
                                // then discarded, not an error here.
                                let _ = reply.send(Ok(value));
                                cell.record_processed();
                            }
                            Err(error) => {
                                let cause: FaultCause = Arc::new(error);
                                let _ = reply.send(Err(ServerError::HandlerFailed {
                                    cause: Arc::clone(&cause),
                                }));
                                break crash(&cell, cause);
                            }
                        }
                    }
                    Envelope::Cast { payload } => match server.handle_cast(payload).await {
                        Ok(()) => cell.record_processed(),
                        Err(error) => break crash(&cell, Arc::new(error)),
                    },
                }
            }
        }
    };

    cell.begin_stopping();
    let deadline = deadline.unwrap_or_else(|| Instant::now() + DEFAULT_SHUTDOWN_TIMEOUT);
    let cleanup = std::panic::AssertUnwindSafe(server.terminate(&reason)).catch_unwind();
    match timeout_at(deadline, cleanup).await {
        Ok(Ok(())) => {}
        Ok(Err(_panic)) => {
            warn!(process = %cell.id(), "terminate panicked; exit proceeds");
        }
        Err(_) => {
            warn!(process = %cell.id(), "terminate overran the grace period; exit proceeds");
        }
    }
    table::finalize_exit(&cell, reason);
}

/// Emit the `Crashed` event and produce the `Error` exit.
fn crash(cell: &Arc<ProcessCell>, cause: FaultCause) -> (ExitReason, Option<Instant>) {
    warn!(process = %cell.id(), error = %cause, "handler failed, process crashing");
    events::emit(LifecycleEvent::Crashed {
        target: cell.target().clone(),
        error: Arc::clone(&cause),
    });
    (ExitReason::Error(cause), None)
}

/// Map a panicked handler loop to a crash exit.
///
/// An aborted loop (forced kill) is not handled here — the kill path already
/// finalized the record.
pub(crate) fn spawn_exit_watcher(cell: Arc<ProcessCell>, join: JoinHandle<()>) {
    tokio::spawn(async move {
        if let Err(join_error) = join.await {
            if join_error.is_panic() {
                let cause: FaultCause = Arc::new(PanicFault::from_payload(join_error.into_panic()));
                events::emit(LifecycleEvent::Crashed {
                    target: cell.target().clone(),
                    error: Arc::clone(&cause),
                });
                table::finalize_exit(&cell, ExitReason::Error(cause));
            }
        }
    });
}
