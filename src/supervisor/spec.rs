//! Child specifications and templates.

// Layer 1: Standard library imports
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::process::{ExitReason, Ref, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::server::StartError;

/// Future returned by a child start factory.
pub type ChildStartFuture = BoxFuture<'static, Result<Ref, StartError>>;

/// Boxed zero-argument start factory; invoked afresh on every (re)start.
pub type ChildStartFn = Arc<dyn Fn() -> ChildStartFuture + Send + Sync>;

/// Argument passed to a [`ChildTemplate`] factory.
///
/// Rust has no heterogeneous positional argument lists, so dynamic children
/// take a single shared any-value; build one with [`template_arg`] and
/// downcast inside the factory. The supervisor retains the argument so a
/// crashed child restarts with its original value.
pub type TemplateArg = Arc<dyn Any + Send + Sync>;

/// Boxed one-argument start factory used by `SimpleOneForOne` supervisors.
pub type TemplateStartFn = Arc<dyn Fn(TemplateArg) -> ChildStartFuture + Send + Sync>;

/// Wrap a value as a [`TemplateArg`].
pub fn template_arg<T: Any + Send + Sync>(value: T) -> TemplateArg {
    Arc::new(value)
}

/// When a supervisor restarts an exited child.
///
/// # Eligibility
///
/// | Exit reason | `Permanent` | `Transient` | `Temporary` |
/// |-------------|-------------|-------------|-------------|
/// | `Normal`    | restart     | —           | —           |
/// | `Shutdown`  | restart     | —           | —           |
/// | `Error`     | restart     | restart     | —           |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RestartPolicy {
    /// Always restart, regardless of exit reason.
    #[default]
    Permanent,
    /// Restart only after an `Error` exit.
    Transient,
    /// Never restart.
    Temporary,
}

impl RestartPolicy {
    /// Whether a child with this policy is restarted after `reason`.
    pub fn should_restart(&self, reason: &ExitReason) -> bool {
        match self {
            RestartPolicy::Permanent => true,
            RestartPolicy::Transient => reason.is_error(),
            RestartPolicy::Temporary => false,
        }
    }
}

/// When a supervisor shuts itself down because significant children exited.
///
/// Only children marked `significant` are considered; a supervisor with no
/// significant children never auto-shuts regardless of mode. Exits caused by
/// `terminate_child` do not trigger auto-shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutoShutdown {
    /// Never auto-shutdown.
    #[default]
    Never,
    /// Shut down as soon as any significant child stops without restart.
    AnySignificant,
    /// Shut down once the last significant child has stopped.
    AllSignificant,
}

/// Immutable description of one supervised child.
///
/// The `start` factory is re-invoked on every restart and must produce a
/// fresh process with fresh state; there is no state rehydration at this
/// layer.
///
/// # Example
/// ```rust,no_run
/// use procnest::server::{self, SpawnOpts};
/// use procnest::supervisor::{ChildSpec, RestartPolicy};
/// # use procnest::server::GenServer;
/// # #[derive(Default)] struct Worker;
/// # #[async_trait::async_trait]
/// # impl GenServer for Worker {
/// #     type Call = (); type Reply = (); type Cast = (); type Error = std::io::Error;
/// #     async fn handle_call(&mut self, _: ()) -> Result<(), Self::Error> { Ok(()) }
/// #     async fn handle_cast(&mut self, _: ()) -> Result<(), Self::Error> { Ok(()) }
/// # }
///
/// let spec = ChildSpec::new("worker-1", || async {
///     let worker = server::start(Worker::default(), SpawnOpts::new()).await?;
///     Ok(worker.into())
/// })
/// .with_restart(RestartPolicy::Transient);
/// ```
#[derive(Clone)]
pub struct ChildSpec {
    pub(crate) id: String,
    pub(crate) start: ChildStartFn,
    pub(crate) restart: RestartPolicy,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) significant: bool,
}

impl ChildSpec {
    /// A spec with the default policy set: `Permanent`, 5 s shutdown grace,
    /// not significant.
    pub fn new<F, Fut>(id: impl Into<String>, start: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Ref, StartError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            start: Arc::new(move || start().boxed()),
            restart: RestartPolicy::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            significant: false,
        }
    }

    /// The child id, unique within its supervisor.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Override the restart policy.
    pub fn with_restart(mut self, policy: RestartPolicy) -> Self {
        self.restart = policy;
        self
    }

    /// Override the shutdown grace period.
    pub fn with_shutdown_timeout(mut self, grace: Duration) -> Self {
        self.shutdown_timeout = grace;
        self
    }

    /// Mark the child significant for auto-shutdown purposes.
    pub fn with_significant(mut self, significant: bool) -> Self {
        self.significant = significant;
        self
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("id", &self.id)
            .field("restart", &self.restart)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("significant", &self.significant)
            .finish_non_exhaustive()
    }
}

/// Spec-shaped description of the homogeneous, dynamically spawned children
/// of a `SimpleOneForOne` supervisor.
///
/// Child ids are generated at spawn time; the factory receives the
/// [`TemplateArg`] supplied to
/// [`SupervisorRef::start_template_child`](crate::supervisor::SupervisorRef::start_template_child).
#[derive(Clone)]
pub struct ChildTemplate {
    pub(crate) start: TemplateStartFn,
    pub(crate) restart: RestartPolicy,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) significant: bool,
}

impl ChildTemplate {
    /// A template with the default policy set.
    pub fn new<F, Fut>(start: F) -> Self
    where
        F: Fn(TemplateArg) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Ref, StartError>> + Send + 'static,
    {
        Self {
            start: Arc::new(move |arg| start(arg).boxed()),
            restart: RestartPolicy::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            significant: false,
        }
    }

    /// Override the restart policy.
    pub fn with_restart(mut self, policy: RestartPolicy) -> Self {
        self.restart = policy;
        self
    }

    /// Override the shutdown grace period.
    pub fn with_shutdown_timeout(mut self, grace: Duration) -> Self {
        self.shutdown_timeout = grace;
        self
    }

    /// Mark spawned children significant for auto-shutdown purposes.
    pub fn with_significant(mut self, significant: bool) -> Self {
        self.significant = significant;
        self
    }
}

impl fmt::Debug for ChildTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildTemplate")
            .field("restart", &self.restart)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("significant", &self.significant)
            .finish_non_exhaustive()
    }
}
