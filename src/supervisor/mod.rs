//! Hierarchical supervision.
//!
//! A supervisor owns an ordered set of child processes described by
//! [`ChildSpec`]s (or, for `SimpleOneForOne`, a single [`ChildTemplate`])
//! and restarts them under a declared [`Strategy`] when they exit with a
//! restart-eligible reason. Restart storms are bounded by
//! [`RestartIntensity`]; when the limit fires, the supervisor terminates
//! with [`SupervisorError::MaxRestartsExceeded`] and its parent — if it is
//! itself supervised — sees an `Error` exit and applies its own rules.
//!
//! # Example
//!
//! ```rust,no_run
//! use procnest::supervisor::{self, ChildSpec, Strategy, SupervisorOpts};
//! # async fn example(db: ChildSpec, api: ChildSpec) -> Result<(), Box<dyn std::error::Error>> {
//! let sup = supervisor::start(
//!     SupervisorOpts::new(Strategy::RestForOne)
//!         .child(db)
//!         .child(api),
//! )
//! .await?;
//!
//! assert_eq!(sup.count_children().await?.active, 2);
//! sup.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod intensity;
pub mod node;
pub mod spec;
pub mod strategy;

pub use node::{start, ChildCounts, ChildInfo, SupervisorOpts, SupervisorRef};
pub use error::SupervisorError;
pub use intensity::RestartIntensity;
pub use spec::{
    template_arg, AutoShutdown, ChildSpec, ChildStartFn, ChildStartFuture, ChildTemplate,
    RestartPolicy, TemplateArg, TemplateStartFn,
};
pub use strategy::Strategy;
