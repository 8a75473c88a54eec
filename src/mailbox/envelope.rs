//! Mailbox envelopes.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use crate::server::{GenServer, ServerError};

/// Single-shot slot a call reply travels through.
///
/// Dropped by the caller when its deadline elapses; the callee still
/// processes the message and the fulfilment attempt is silently discarded.
pub(crate) type ReplySlot<R> = oneshot::Sender<Result<R, ServerError>>;

/// One queued message for a generic server.
///
/// Timer deliveries reuse the `Cast` variant: once delivered, a fired timer
/// is indistinguishable from an ordinary cast.
pub(crate) enum Envelope<S: GenServer> {
    /// Synchronous request awaiting a reply.
    Call {
        payload: S::Call,
        reply: ReplySlot<S::Reply>,
    },
    /// Fire-and-forget message.
    Cast { payload: S::Cast },
}

impl<S: GenServer> std::fmt::Debug for Envelope<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Call { .. } => f.write_str("Envelope::Call"),
            Envelope::Cast { .. } => f.write_str("Envelope::Cast"),
        }
    }
}
