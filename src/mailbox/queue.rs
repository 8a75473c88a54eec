//! FIFO mailbox over tokio's unbounded mpsc channel.
//!
//! Every process owns exactly one mailbox. Arrival order is delivery order;
//! there is no priority lane and no cross-mailbox ordering guarantee.
//! Enqueueing never blocks — backpressure is not a concern of this runtime,
//! which favours the fire-and-forget cast contract over bounded queues.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tokio::sync::mpsc;

// Layer 3: Internal module imports
use super::envelope::Envelope;
use crate::server::GenServer;

/// Create a connected mailbox pair for one process.
pub(crate) fn channel<S: GenServer>() -> (MailboxSender<S>, Mailbox<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MailboxSender { tx }, Mailbox { rx })
}

/// Sending half of a mailbox. Cheap to clone; shared by every typed handle
/// to the process and by its pending timers.
pub(crate) struct MailboxSender<S: GenServer> {
    tx: mpsc::UnboundedSender<Envelope<S>>,
}

impl<S: GenServer> Clone for MailboxSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: GenServer> MailboxSender<S> {
    /// Enqueue an envelope at the tail of the mailbox.
    ///
    /// Fails only when the receiving half is gone, i.e. the process record
    /// was torn down.
    pub(crate) fn send(&self, envelope: Envelope<S>) -> Result<(), Envelope<S>> {
        self.tx.send(envelope).map_err(|rejected| rejected.0)
    }
}

/// Receiving half of a mailbox, owned by the process's handler loop.
pub(crate) struct Mailbox<S: GenServer> {
    rx: mpsc::UnboundedReceiver<Envelope<S>>,
}

impl<S: GenServer> Mailbox<S> {
    /// Await the next envelope in arrival order.
    pub(crate) async fn recv(&mut self) -> Option<Envelope<S>> {
        self.rx.recv().await
    }
}
