//! Lifecycle event stream.
//!
//! Both subsystems publish their state transitions here; see [`bus`].

pub mod bus;

pub use bus::{subscribe, LifecycleEvent, Subscription};

pub(crate) use bus::{clear, emit};
