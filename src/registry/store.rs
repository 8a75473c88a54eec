//! Process-wide name directory.

// Layer 1: Standard library imports
use std::sync::{Arc, LazyLock};

// Layer 2: Third-party crate imports
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

// Layer 3: Internal module imports
use crate::process::table::{self, ProcessCell};
use crate::process::Ref;
use crate::util::ProcessId;

/// Global name -> ref table. Names are opaque strings, globally unique among
/// live processes; no wildcarding.
static NAMES: LazyLock<DashMap<String, Ref>> = LazyLock::new(DashMap::new);

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The name is already taken by a live process.
    #[error("name '{name}' is already registered")]
    AlreadyRegistered {
        /// The contested name.
        name: String,
    },

    /// The ref being registered does not point at a live process.
    #[error("process {id} is not running")]
    NotRunning {
        /// Id of the dead process.
        id: ProcessId,
    },
}

/// Register `target` under `name`.
///
/// Fails with [`RegistryError::AlreadyRegistered`] when the name is held by
/// a live process. A name whose previous holder already stopped is silently
/// reclaimed. The registration is released automatically when the process
/// stops.
pub fn register(name: impl Into<String>, target: &Ref) -> Result<(), RegistryError> {
    let name = name.into();
    let Some(cell) = table::get(target.id()) else {
        return Err(RegistryError::NotRunning {
            id: target.id().clone(),
        });
    };
    match NAMES.entry(name.clone()) {
        Entry::Occupied(mut occupied) => {
            let holder_alive = table::get(occupied.get().id()).is_some();
            if holder_alive {
                return Err(RegistryError::AlreadyRegistered { name });
            }
            occupied.insert(target.clone());
        }
        Entry::Vacant(vacant) => {
            vacant.insert(target.clone());
        }
    }
    cell.set_name(Some(name.clone()));
    debug!(process = %target.id(), name, "registered");
    Ok(())
}

/// Release a name. Idempotent: unknown names are ignored.
pub fn unregister(name: &str) {
    if let Some((_, holder)) = NAMES.remove(name) {
        if let Some(cell) = table::get(holder.id()) {
            cell.set_name(None);
        }
        debug!(process = %holder.id(), name, "unregistered");
    }
}

/// Look up the ref registered under `name`.
///
/// Returns `Some` only while the registered process is alive; a stale entry
/// left by a dead process is cleaned up lazily and reported as `None`.
pub fn whereis(name: &str) -> Option<Ref> {
    let target = NAMES.get(name).map(|entry| entry.value().clone())?;
    if table::get(target.id()).is_some() {
        Some(target)
    } else {
        NAMES.remove_if(name, |_, holder| holder.id() == target.id());
        None
    }
}

/// Release the name held by an exiting process. Called from the exit path,
/// before the `Terminated` event, so a successor can reuse the name as soon
/// as the event is observable.
pub(crate) fn unregister_on_exit(cell: &Arc<ProcessCell>) {
    if let Some(name) = cell.name() {
        NAMES.remove_if(&name, |_, holder| holder.id() == cell.id());
        cell.set_name(None);
    }
}

/// Drop every registration. Test-harness hook.
pub(crate) fn clear() {
    NAMES.clear();
}
