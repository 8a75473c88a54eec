//! Test and stress instrumentation.
//!
//! These hooks exist for test harnesses, chaos rigs, and benchmarks. They
//! reach around the normal lifecycle — production code has no business
//! calling them.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
use crate::events;
use crate::process::table;
use crate::process::{ExitReason, Ref};
use crate::registry;
use crate::util::ids;
use crate::util::ProcessKind;

/// Force-terminate a process, bypassing its `terminate` callback.
///
/// The handler-loop task is aborted mid-flight and the exit committed with
/// the injected reason. An `Error` reason emits a `Crashed` event, so a
/// supervising parent applies its normal restart rules — this is the chaos
/// rig's crash-injection primitive (and the reason the hook exists).
pub fn force_terminate(target: &Ref, reason: ExitReason) {
    let Some(cell) = table::get(target.id()) else {
        return;
    };
    debug!(process = %target.id(), %reason, "force-terminating");
    table::kill(&cell, reason, true);
}

/// Stop every live process and reset the id counter.
///
/// Supervisors are torn down first so none of them restarts a child while
/// the sweep runs; the registry and any leftover records go with them.
pub async fn clear_all() {
    // A couple of passes catch processes spawned while the sweep ran.
    for _ in 0..3 {
        let cells = table::all_cells();
        if cells.is_empty() {
            break;
        }
        for kind in [ProcessKind::Supervisor, ProcessKind::Server] {
            for cell in cells.iter().filter(|cell| cell.target().kind() == kind) {
                table::kill(cell, ExitReason::Shutdown, false);
            }
        }
        tokio::task::yield_now().await;
    }
    registry::clear();
    ids::reset_counter();
}

/// Remove every lifecycle subscriber.
pub fn clear_lifecycle_subscribers() {
    events::clear();
}

/// Reset the process-id counter without touching live processes.
pub fn reset_id_counter() {
    ids::reset_counter();
}
