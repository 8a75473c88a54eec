//! The runtime process table.
//!
//! Maps process ids to live process records ([`ProcessCell`]). The table is
//! the single source of truth for liveness: a ref whose id is absent here is
//! dead, no matter how many handles to it are still around. Cells are
//! mutated only by the runtime; user code reaches them exclusively through
//! the typed handle APIs.

// Layer 1: Standard library imports
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

// Layer 3: Internal module imports
use super::handle::Ref;
use super::state::{ExitReason, ProcessStatus};
use crate::events::{self, LifecycleEvent};
use crate::registry;
use crate::util::{ProcessId, ProcessKind};

/// Extra slack granted to the graceful path before the watchdog kills a
/// process that overran its shutdown grace period.
const FORCE_KILL_MARGIN: Duration = Duration::from_millis(50);

/// Global id -> process record table.
static TABLE: LazyLock<DashMap<ProcessId, Arc<ProcessCell>>> = LazyLock::new(DashMap::new);

/// Out-of-band control signal, checked by handler loops between messages.
#[derive(Debug)]
pub(crate) enum ControlSignal {
    /// Stop gracefully; `terminate` must finish before `deadline`.
    Shutdown {
        reason: ExitReason,
        deadline: Instant,
    },
}

/// Exit notice delivered to the supervisor monitoring a child.
#[derive(Debug)]
pub(crate) struct ChildExit {
    pub id: ProcessId,
    pub reason: ExitReason,
}

/// Supervisor back-pointer stored in a supervised child's record.
pub(crate) struct ParentLink {
    pub supervisor: ProcessId,
    pub notify: mpsc::UnboundedSender<ChildExit>,
}

/// A pending timer owned by a process.
///
/// The guard flag resolves the fire/cancel race: whichever side wins the
/// compare-and-swap claims the timer, so it either fires exactly once or is
/// observed as cancelled, never both.
pub(crate) struct TimerEntry {
    pub guard: Arc<AtomicBool>,
    pub handle: AbortHandle,
}

/// One live process record.
///
/// Owned by the table; shared with the process's own handler loop and with
/// short-lived operations (stop waiters, timer tasks).
pub(crate) struct ProcessCell {
    target: Ref,
    status: RwLock<ProcessStatus>,
    /// Registered name, if any. Written by the registry, cleared on exit.
    name: Mutex<Option<String>>,
    /// Type-erased clone of the typed envelope sender; recovered by
    /// `Ref::downcast` / `Ref::downcast_supervisor`.
    sender: Box<dyn Any + Send + Sync>,
    ctrl_tx: mpsc::UnboundedSender<ControlSignal>,
    parent: Mutex<Option<ParentLink>>,
    finalized: AtomicBool,
    timers: Mutex<HashMap<u64, TimerEntry>>,
    timer_seq: AtomicU64,
    abort: Mutex<Option<AbortHandle>>,
    stopped_tx: watch::Sender<bool>,
    stopped_rx: watch::Receiver<bool>,
    started_at: DateTime<Utc>,
    processed: AtomicU64,
}

impl ProcessCell {
    pub(crate) fn new(
        target: Ref,
        sender: Box<dyn Any + Send + Sync>,
        ctrl_tx: mpsc::UnboundedSender<ControlSignal>,
    ) -> Arc<Self> {
        let (stopped_tx, stopped_rx) = watch::channel(false);
        Arc::new(Self {
            target,
            status: RwLock::new(ProcessStatus::Initializing),
            name: Mutex::new(None),
            sender,
            ctrl_tx,
            parent: Mutex::new(None),
            finalized: AtomicBool::new(false),
            timers: Mutex::new(HashMap::new()),
            timer_seq: AtomicU64::new(1),
            abort: Mutex::new(None),
            stopped_tx,
            stopped_rx,
            started_at: Utc::now(),
            processed: AtomicU64::new(0),
        })
    }

    pub(crate) fn target(&self) -> &Ref {
        &self.target
    }

    pub(crate) fn id(&self) -> &ProcessId {
        self.target.id()
    }

    pub(crate) fn status(&self) -> ProcessStatus {
        *self.status.read()
    }

    pub(crate) fn set_status(&self, status: ProcessStatus) {
        *self.status.write() = status;
    }

    /// Promote `Initializing` to `Running`.
    ///
    /// Returns `false` when a stop raced ahead of the promotion; the handler
    /// loop then starts straight into shutdown.
    pub(crate) fn try_set_running(&self) -> bool {
        let mut status = self.status.write();
        if *status == ProcessStatus::Initializing {
            *status = ProcessStatus::Running;
            true
        } else {
            false
        }
    }

    /// Flip `Initializing`/`Running` to `Stopping`.
    ///
    /// Returns `true` when this call initiated the stop; `false` when a stop
    /// was already in progress (or finished).
    pub(crate) fn begin_stopping(&self) -> bool {
        let mut status = self.status.write();
        if status.is_alive() {
            *status = ProcessStatus::Stopping;
            true
        } else {
            false
        }
    }

    /// The type-erased envelope sender, for typed-handle recovery.
    pub(crate) fn sender_any(&self) -> &(dyn Any + Send + Sync) {
        self.sender.as_ref()
    }

    pub(crate) fn set_name(&self, name: Option<String>) {
        *self.name.lock() = name;
    }

    pub(crate) fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    pub(crate) fn set_abort(&self, handle: AbortHandle) {
        *self.abort.lock() = Some(handle);
    }

    pub(crate) fn next_timer_seq(&self) -> u64 {
        self.timer_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert_timer(&self, seq: u64, entry: TimerEntry) {
        self.timers.lock().insert(seq, entry);
    }

    pub(crate) fn remove_timer(&self, seq: u64) -> Option<TimerEntry> {
        self.timers.lock().remove(&seq)
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stopped_watch(&self) -> watch::Receiver<bool> {
        self.stopped_rx.clone()
    }

    /// Cancel every pending timer. Losers of the guard race already fired.
    fn cancel_all_timers(&self) {
        for (_, timer) in self.timers.lock().drain() {
            if timer
                .guard
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                timer.handle.abort();
            }
        }
    }
}

/// Insert a freshly created record.
pub(crate) fn insert(cell: Arc<ProcessCell>) {
    TABLE.insert(cell.id().clone(), cell);
}

/// Look up a record by id.
pub(crate) fn get(id: &ProcessId) -> Option<Arc<ProcessCell>> {
    TABLE.get(id).map(|entry| Arc::clone(entry.value()))
}

/// Snapshot of every live record, used by the test harness.
pub(crate) fn all_cells() -> Vec<Arc<ProcessCell>> {
    TABLE
        .iter()
        .map(|entry| Arc::clone(entry.value()))
        .collect()
}

/// Attach a supervisor back-pointer to a child record.
///
/// Fails when the child already exited; the caller must treat that as an
/// immediate child exit.
pub(crate) fn attach_parent(
    id: &ProcessId,
    supervisor: ProcessId,
    notify: mpsc::UnboundedSender<ChildExit>,
) -> Result<(), ()> {
    let Some(cell) = get(id) else {
        return Err(());
    };
    let mut parent = cell.parent.lock();
    if cell.finalized.load(Ordering::Acquire) {
        return Err(());
    }
    *parent = Some(ParentLink { supervisor, notify });
    Ok(())
}

/// Commit a process exit. Idempotent; the first caller wins.
///
/// Teardown order matters: timers are cancelled and the name released
/// before the `Terminated` event fires, and the supervisor is notified only
/// after the event, so a restarted incarnation can re-register the name.
pub(crate) fn finalize_exit(cell: &Arc<ProcessCell>, reason: ExitReason) {
    if cell.finalized.swap(true, Ordering::AcqRel) {
        return;
    }
    cell.cancel_all_timers();
    cell.set_status(ProcessStatus::Stopped);
    registry::unregister_on_exit(cell);
    TABLE.remove(cell.id());
    debug!(process = %cell.id(), %reason, "process stopped");
    events::emit(LifecycleEvent::Terminated {
        target: cell.target().clone(),
        reason: reason.clone(),
    });
    let parent = cell.parent.lock().take();
    if let Some(link) = parent {
        let _ = link.notify.send(ChildExit {
            id: cell.id().clone(),
            reason,
        });
    }
    cell.stopped_tx.send_replace(true);
}

/// Tear down a record that never reached `Running`.
///
/// No lifecycle events fire: a process whose `init` failed was never
/// started as far as observers are concerned.
pub(crate) fn discard(cell: &Arc<ProcessCell>) {
    if cell.finalized.swap(true, Ordering::AcqRel) {
        return;
    }
    cell.set_status(ProcessStatus::Stopped);
    registry::unregister_on_exit(cell);
    TABLE.remove(cell.id());
    cell.stopped_tx.send_replace(true);
}

/// Kill a process outright: abort its task, then commit the exit.
///
/// `emit_crash` controls whether an `Error` reason also produces a
/// `Crashed` event (true for fault injection, false for shutdown-overrun
/// kills, whose reason is not a fault of the process itself).
pub(crate) fn kill(cell: &Arc<ProcessCell>, reason: ExitReason, emit_crash: bool) {
    cell.set_status(ProcessStatus::Stopping);
    if let Some(handle) = cell.abort.lock().take() {
        handle.abort();
    }
    if emit_crash {
        if let ExitReason::Error(cause) = &reason {
            events::emit(LifecycleEvent::Crashed {
                target: cell.target().clone(),
                error: Arc::clone(cause),
            });
        }
    }
    finalize_exit(cell, reason);
}

/// Stop a process and wait until it is `Stopped`.
///
/// Servers are bounded: if the process has not stopped within the grace
/// period (plus a small margin for the graceful path to win), it is killed.
/// Supervisors are trusted runtime code and are awaited without a bound;
/// their own child shutdowns are each bounded by the child's grace.
pub(crate) async fn stop_process(target: &Ref, reason: ExitReason, grace: Duration) {
    let Some(cell) = get(target.id()) else {
        return;
    };
    if cell.begin_stopping() {
        let deadline = Instant::now() + grace;
        let _ = cell.ctrl_tx.send(ControlSignal::Shutdown {
            reason: reason.clone(),
            deadline,
        });
    }
    let mut stopped = cell.stopped_watch();
    match target.kind() {
        ProcessKind::Supervisor => {
            let _ = stopped.wait_for(|done| *done).await;
        }
        ProcessKind::Server => {
            let bound = grace + FORCE_KILL_MARGIN;
            let wait = stopped.wait_for(|done| *done);
            if tokio::time::timeout(bound, wait).await.is_err() {
                debug!(process = %cell.id(), "shutdown grace exceeded, killing process");
                kill(&cell, reason, false);
            }
        }
    }
}

/// Introspection snapshot of one process record.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    /// Stable process id.
    pub id: ProcessId,
    /// Server or supervisor.
    pub kind: ProcessKind,
    /// Current lifecycle status.
    pub status: ProcessStatus,
    /// Registered name, if any.
    pub name: Option<String>,
    /// Id of the supervising process, if the process is a supervised child.
    pub supervisor: Option<ProcessId>,
    /// Messages handled so far.
    pub processed_messages: u64,
    /// When the process record was created.
    pub started_at: DateTime<Utc>,
}

/// Snapshot a live process. Returns `None` for dead refs.
pub fn info(target: &Ref) -> Option<ProcessInfo> {
    let cell = get(target.id())?;
    let supervisor = cell
        .parent
        .lock()
        .as_ref()
        .map(|link| link.supervisor.clone());
    Some(ProcessInfo {
        id: cell.id().clone(),
        kind: cell.target().kind(),
        status: cell.status(),
        name: cell.name(),
        supervisor,
        processed_messages: cell.processed.load(Ordering::Relaxed),
        started_at: cell.started_at,
    })
}
