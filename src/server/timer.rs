//! Non-durable one-shot timers.
//!
//! A timer belongs to the process that scheduled it and dies with it: when
//! the owner transitions to `Stopping`, every pending timer is cancelled.
//! The fire/cancel race is settled by a compare-and-swap guard — exactly one
//! of {cast delivered, cancel observed} happens per timer.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::Serialize;
use tokio::time::sleep;

// Layer 3: Internal module imports
use crate::mailbox::{Envelope, MailboxSender};
use crate::process::table::{self, ProcessCell, TimerEntry};
use crate::server::GenServer;
use crate::util::ProcessId;

/// Handle to a pending timer: `(owner process id, timer sequence)`.
///
/// Obtained from [`ServerRef::send_after`](crate::server::ServerRef::send_after).
/// Cancellation is best-effort — once the timer has fired, [`TimerRef::cancel`]
/// reports `false` and has no effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimerRef {
    owner: ProcessId,
    seq: u64,
}

impl TimerRef {
    /// Id of the process the delivery is destined for.
    pub fn owner(&self) -> &ProcessId {
        &self.owner
    }

    /// Try to cancel the pending delivery.
    ///
    /// Returns `true` when the timer was still pending — the cast will never
    /// be delivered. Returns `false` when the timer already fired, was
    /// already cancelled, or its owner is gone. Idempotent.
    pub fn cancel(&self) -> bool {
        let Some(cell) = table::get(&self.owner) else {
            return false;
        };
        let Some(entry) = cell.remove_timer(self.seq) else {
            return false;
        };
        if entry
            .guard
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            entry.handle.abort();
            true
        } else {
            false
        }
    }
}

/// Schedule a one-shot cast delivery to `cell`'s mailbox after `delay`.
///
/// The fired cast is enqueued at the mailbox tail, behind whatever arrived
/// before the fire moment.
pub(crate) fn schedule<S: GenServer>(
    cell: &Arc<ProcessCell>,
    sender: MailboxSender<S>,
    message: S::Cast,
    delay: Duration,
) -> TimerRef {
    let seq = cell.next_timer_seq();
    let guard = Arc::new(AtomicBool::new(false));
    let task_guard = Arc::clone(&guard);
    let owner = Arc::downgrade(cell);

    let task = tokio::spawn(async move {
        sleep(delay).await;
        if task_guard
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = sender.send(Envelope::Cast { payload: message });
            if let Some(cell) = owner.upgrade() {
                cell.remove_timer(seq);
            }
        }
    });

    cell.insert_timer(
        seq,
        TimerEntry {
            guard,
            handle: task.abort_handle(),
        },
    );

    TimerRef {
        owner: cell.id().clone(),
        seq,
    }
}
