//! Generic servers: typed call/cast behaviours on a supervised process.
//!
//! A server is started with [`start`], producing a [`ServerRef`] handle for
//! synchronous [`call`](ServerRef::call)s, asynchronous
//! [`cast`](ServerRef::cast)s, and one-shot
//! [`send_after`](ServerRef::send_after) timers. The behaviour itself is a
//! [`GenServer`] implementation; see the trait for the crash and lifecycle
//! contract.

pub mod error;
pub mod handle;
pub mod spawn;
pub mod timer;
pub mod traits;

pub use error::{ServerError, StartError};
pub use handle::{ServerRef, DEFAULT_CALL_TIMEOUT};
pub use spawn::{start, SpawnOpts, DEFAULT_INIT_TIMEOUT};
pub use timer::TimerRef;
pub use traits::GenServer;

#[cfg(test)]
pub(crate) use traits::testing_support;
