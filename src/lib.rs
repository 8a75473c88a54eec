//! # procnest - OTP-Style Process Runtime
//!
//! Generic servers and supervision trees on tokio: typed call/cast
//! behaviours running one-message-at-a-time on their own cooperative task,
//! watched by supervisors that restart them under configurable strategies
//! with bounded restart intensity.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use procnest::prelude::*;
//!
//! // 1. Define the message sums for your server
//! enum CounterCall {
//!     Get,
//! }
//!
//! enum CounterCast {
//!     Increment,
//! }
//!
//! // 2. The behaviour value is the server state
//! #[derive(Default)]
//! struct Counter {
//!     count: u64,
//! }
//!
//! #[async_trait]
//! impl GenServer for Counter {
//!     type Call = CounterCall;
//!     type Reply = u64;
//!     type Cast = CounterCast;
//!     type Error = std::io::Error;
//!
//!     async fn handle_call(&mut self, request: CounterCall) -> Result<u64, Self::Error> {
//!         match request {
//!             CounterCall::Get => Ok(self.count),
//!         }
//!     }
//!
//!     async fn handle_cast(&mut self, message: CounterCast) -> Result<(), Self::Error> {
//!         match message {
//!             CounterCast::Increment => {
//!                 self.count += 1;
//!                 Ok(())
//!             }
//!         }
//!     }
//! }
//!
//! // 3. Start it, talk to it, supervise it
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let counter = server::start(Counter::default(), SpawnOpts::new()).await?;
//!
//!     counter.cast(CounterCast::Increment)?;
//!     let value = counter.call(CounterCall::Get).await?;
//!     assert_eq!(value, 1);
//!
//!     let sup = supervisor::start(
//!         SupervisorOpts::new(Strategy::OneForOne).child(ChildSpec::new("counter", || async {
//!             let counter = server::start(Counter::default(), SpawnOpts::new()).await?;
//!             Ok(counter.into())
//!         })),
//!     )
//!     .await?;
//!
//!     sup.stop().await;
//!     counter.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Core Guarantees
//!
//! - **Serialised handlers**: for any process, `init`, `handle_call`,
//!   `handle_cast`, and `terminate` are mutually exclusive. Distinct
//!   processes run truly in parallel on the tokio runtime.
//! - **FIFO mailboxes**: delivery is arrival order within one mailbox; no
//!   ordering is promised across mailboxes.
//! - **Crash conversion**: a failing handler crashes its process — the
//!   caller of an in-flight `call` gets `HandlerFailed`, lifecycle
//!   subscribers see `Crashed`, and the supervisor applies its restart
//!   rules. Cast senders are never informed.
//! - **Bounded shutdown**: a stopping process gets its grace period to run
//!   `terminate`, then is killed. `Supervisor::stop` tears the subtree down
//!   in reverse start order.
//! - **Bounded restarts**: each supervisor counts restarts in a sliding
//!   window and terminates with `MaxRestartsExceeded` when the budget is
//!   blown, escalating the failure to its own supervisor.
//!
//! # Module Organization
//!
//! - [`server`] - `GenServer` behaviour, start/call/cast, timers
//! - [`supervisor`] - child specs, strategies, intensity, supervisor process
//! - [`registry`] - process-wide name directory
//! - [`events`] - lifecycle event stream (`Started`/`Crashed`/`Restarted`/`Terminated`)
//! - [`process`] - refs, status machine, introspection
//! - [`testing`] - crash injection and teardown hooks for harnesses
//!
//! # Non-Goals
//!
//! No distribution or clustering, no preemption (handlers run to
//! completion), no hot code reload, no pluggable schedulers.

pub mod events;
pub(crate) mod mailbox;
pub mod prelude;
pub mod process;
pub mod registry;
pub mod server;
pub mod supervisor;
pub mod testing;
pub mod util;

// Re-export commonly used types
pub use events::{subscribe, LifecycleEvent, Subscription};
pub use process::{info, ExitReason, FaultCause, ProcessInfo, ProcessStatus, Ref};
pub use server::{GenServer, ServerError, ServerRef, SpawnOpts, StartError, TimerRef};
pub use supervisor::{
    AutoShutdown, ChildCounts, ChildInfo, ChildSpec, ChildTemplate, RestartIntensity,
    RestartPolicy, Strategy, SupervisorError, SupervisorOpts, SupervisorRef,
};
pub use util::{ProcessId, ProcessKind};
