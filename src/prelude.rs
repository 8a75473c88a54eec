//! Prelude module for convenient imports.
//!
//! Re-exports the types needed by most embedders:
//!
//! ```rust
//! use procnest::prelude::*;
//! ```
//!
//! # What's Included
//!
//! ## Generic Servers
//! - [`GenServer`] - behaviour trait (`init` / `handle_call` / `handle_cast` / `terminate`)
//! - [`ServerRef`] - typed handle: `call`, `cast`, `send_after`, `stop`
//! - [`SpawnOpts`] - start options (name, init timeout)
//! - [`ServerError`] / [`StartError`] - operation and startup failures
//! - [`TimerRef`] - cancellable one-shot timer handle
//!
//! ## Supervision
//! - [`SupervisorOpts`] / [`SupervisorRef`] - configuration and handle
//! - [`Strategy`] - `OneForOne`, `OneForAll`, `RestForOne`, `SimpleOneForOne`
//! - [`ChildSpec`] / [`ChildTemplate`] - child descriptions
//! - [`RestartPolicy`] - `Permanent`, `Transient`, `Temporary`
//! - [`RestartIntensity`] - restart budget per sliding window
//! - [`AutoShutdown`] - significant-child shutdown modes
//! - [`SupervisorError`] - supervisor failures
//!
//! ## Processes & Lifecycle
//! - [`Ref`] - opaque process handle
//! - [`ExitReason`] / [`ProcessStatus`] - exit and status machine
//! - [`LifecycleEvent`] / [`Subscription`] - event stream
//!
//! The `server` and `supervisor` modules themselves are re-exported for the
//! `server::start(..)` / `supervisor::start(..)` entry points.

pub use crate::events::{subscribe, LifecycleEvent, Subscription};
pub use crate::process::{ExitReason, FaultCause, ProcessStatus, Ref};
pub use crate::registry;
pub use crate::server::{
    self, GenServer, ServerError, ServerRef, SpawnOpts, StartError, TimerRef,
};
pub use crate::supervisor::{
    self, template_arg, AutoShutdown, ChildCounts, ChildInfo, ChildSpec, ChildTemplate,
    RestartIntensity, RestartPolicy, Strategy, SupervisorError, SupervisorOpts, SupervisorRef,
};
pub use crate::util::{ProcessId, ProcessKind};
