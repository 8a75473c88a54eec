// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Monotonic counter shared by every process id minted in this runtime.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Length of the random suffix appended to each process id.
const SUFFIX_LEN: usize = 6;

/// The kind of process an identifier belongs to.
///
/// # Example
/// ```rust
/// use procnest::util::ProcessKind;
///
/// assert_eq!(ProcessKind::Server.prefix(), "srv");
/// assert_eq!(ProcessKind::Supervisor.prefix(), "sup");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    /// A generic server process.
    Server,
    /// A supervisor process.
    Supervisor,
}

impl ProcessKind {
    /// Short prefix used in rendered process ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            ProcessKind::Server => "srv",
            ProcessKind::Supervisor => "sup",
        }
    }
}

impl Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessKind::Server => write!(f, "server"),
            ProcessKind::Supervisor => write!(f, "supervisor"),
        }
    }
}

/// Stable identifier for a process.
///
/// Ids are minted from a monotonic counter plus a short random suffix, so
/// they stay unique across the lifetime of the runtime even after the
/// counter is reset by the test harness.
///
/// # Example
/// ```rust
/// use procnest::util::{ProcessId, ProcessKind};
///
/// let a = ProcessId::next(ProcessKind::Server);
/// let b = ProcessId::next(ProcessKind::Server);
/// assert_ne!(a, b);
/// assert!(a.as_str().starts_with("srv-"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(String);

impl ProcessId {
    /// Mint the next identifier for the given process kind.
    pub fn next(kind: ProcessKind) -> Self {
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{}-{seq}-{}", kind.prefix(), suffix.to_lowercase()))
    }

    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reset the id counter. Only meaningful for the test harness; existing ids
/// stay unique thanks to the random suffix.
pub(crate) fn reset_counter() {
    NEXT_SEQ.store(1, Ordering::Relaxed);
}
