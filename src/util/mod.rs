//! Utility types shared across the runtime.
//!
//! Currently home to process identifiers; see [`ids`].

pub mod ids;

pub use ids::{ProcessId, ProcessKind};
