//! Process primitives: handles, the status machine, and the runtime table.
//!
//! A process is a cooperative task with a FIFO mailbox and an exclusive
//! handler loop. This module owns the pieces shared by servers and
//! supervisors: the opaque [`Ref`] handle, the [`ProcessStatus`] machine,
//! [`ExitReason`]s, and the global id -> record table.

pub mod handle;
pub mod state;
pub(crate) mod table;

pub use handle::{Ref, DEFAULT_SHUTDOWN_TIMEOUT};
pub use state::{ExitReason, FaultCause, PanicFault, ProcessStatus};
pub use table::{info, ProcessInfo};
