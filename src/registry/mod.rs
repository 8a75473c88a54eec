//! Name ↔ process-handle directory.

pub mod store;

pub use store::{register, unregister, whereis, RegistryError};

pub(crate) use store::{clear, unregister_on_exit};
