//! The generic server behaviour trait.

// Layer 1: Standard library imports
use std::error::Error;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use crate::process::ExitReason;

/// Behaviour of a generic server process.
///
/// A generic server is a process that serialises all message handling: the
/// runtime invokes at most one of `init`, `handle_call`, `handle_cast`, and
/// `terminate` at a time for a given process, in mailbox arrival order. The
/// implementing value *is* the server state; handlers mutate it through
/// `&mut self` and a restart always begins from a freshly constructed value.
///
/// Message types are ordinary Rust sums — define one `Call` and one `Cast`
/// enum per server and dispatch exhaustively.
///
/// # Crash semantics
///
/// Returning `Err` from `handle_call` or `handle_cast` crashes the process:
/// the error becomes the `Error` exit reason, a `Crashed` lifecycle event
/// fires, and an in-flight caller sees
/// [`ServerError::HandlerFailed`](crate::server::ServerError). A cast sender
/// is never informed — casts are fire-and-forget.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use procnest::server::GenServer;
///
/// enum CounterCall {
///     Get,
/// }
///
/// enum CounterCast {
///     Increment,
/// }
///
/// struct Counter {
///     count: u64,
/// }
///
/// #[async_trait]
/// impl GenServer for Counter {
///     type Call = CounterCall;
///     type Reply = u64;
///     type Cast = CounterCast;
///     type Error = std::io::Error;
///
///     async fn handle_call(&mut self, request: Self::Call) -> Result<u64, Self::Error> {
///         match request {
///             CounterCall::Get => Ok(self.count),
///         }
///     }
///
///     async fn handle_cast(&mut self, message: Self::Cast) -> Result<(), Self::Error> {
///         match message {
///             CounterCast::Increment => {
///                 self.count += 1;
///                 Ok(())
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait GenServer: Send + 'static {
    /// Requests answered synchronously via [`ServerRef::call`](crate::server::ServerRef::call).
    type Call: Send + 'static;

    /// Reply value produced by `handle_call`.
    type Reply: Send + 'static;

    /// Fire-and-forget messages delivered via [`ServerRef::cast`](crate::server::ServerRef::cast)
    /// and by fired timers.
    type Cast: Send + 'static;

    /// Error type a failing handler crashes the process with.
    type Error: Error + Send + Sync + 'static;

    /// Set up the server before any message is dequeued.
    ///
    /// Runs under the `init_timeout` of
    /// [`SpawnOpts`](crate::server::SpawnOpts); failure or timeout means the
    /// process never starts and the caller of `start` gets the error.
    async fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handle a synchronous request and produce the reply.
    async fn handle_call(&mut self, request: Self::Call) -> Result<Self::Reply, Self::Error>;

    /// Handle an asynchronous message.
    async fn handle_cast(&mut self, message: Self::Cast) -> Result<(), Self::Error>;

    /// Best-effort cleanup, invoked once on any exit — including crashes.
    ///
    /// Bounded by the shutdown grace period; an overrunning `terminate` is
    /// abandoned and the process reported stopped regardless.
    async fn terminate(&mut self, _reason: &ExitReason) {}
}
