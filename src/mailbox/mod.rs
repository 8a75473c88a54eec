//! Per-process FIFO message queue and its envelopes.

pub(crate) mod envelope;
pub(crate) mod queue;

pub(crate) use envelope::{Envelope, ReplySlot};
pub(crate) use queue::{channel, Mailbox, MailboxSender};
