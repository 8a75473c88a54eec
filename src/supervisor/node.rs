//! The supervisor process: startup, restart handling, dynamic children.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, warn};

// Layer 3: Internal module imports
use super::error::SupervisorError;
use super::intensity::{IntensityWindow, RestartIntensity};
use super::spec::{
    AutoShutdown, ChildSpec, ChildStartFn, ChildTemplate, RestartPolicy, TemplateArg,
    TemplateStartFn,
};
use super::strategy::{self, Strategy};
use crate::events::{self, LifecycleEvent};
use crate::process::state::EarlyExit;
use crate::process::table::{self, ChildExit, ControlSignal, ProcessCell};
use crate::process::{ExitReason, FaultCause, Ref, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::registry;
use crate::server::spawn::spawn_exit_watcher;
use crate::server::StartError;
use crate::util::{ProcessId, ProcessKind};

/// Options for [`start`].
///
/// # Example
/// ```rust,no_run
/// use procnest::supervisor::{self, RestartIntensity, Strategy, SupervisorOpts};
/// use std::time::Duration;
///
/// # async fn example(worker: procnest::supervisor::ChildSpec) {
/// let sup = supervisor::start(
///     SupervisorOpts::new(Strategy::OneForOne)
///         .child(worker)
///         .intensity(RestartIntensity::new(5, Duration::from_secs(10)))
///         .named("workers"),
/// )
/// .await;
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SupervisorOpts {
    strategy: Strategy,
    children: Vec<ChildSpec>,
    template: Option<ChildTemplate>,
    intensity: RestartIntensity,
    name: Option<String>,
    auto_shutdown: AutoShutdown,
}

impl SupervisorOpts {
    /// Options for the given strategy with defaults everywhere else: no
    /// children, default intensity (3 per 5 s), no name, no auto-shutdown.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            children: Vec::new(),
            template: None,
            intensity: RestartIntensity::default(),
            name: None,
            auto_shutdown: AutoShutdown::default(),
        }
    }

    /// Append one initial child. Start order is declaration order.
    pub fn child(mut self, spec: ChildSpec) -> Self {
        self.children.push(spec);
        self
    }

    /// Append several initial children.
    pub fn children(mut self, specs: impl IntoIterator<Item = ChildSpec>) -> Self {
        self.children.extend(specs);
        self
    }

    /// Set the child template. Required — and only valid — with
    /// [`Strategy::SimpleOneForOne`].
    pub fn template(mut self, template: ChildTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Override the restart-intensity limits.
    pub fn intensity(mut self, intensity: RestartIntensity) -> Self {
        self.intensity = intensity;
        self
    }

    /// Register the supervisor under `name` at start.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Configure auto-shutdown on significant child exits.
    pub fn auto_shutdown(mut self, mode: AutoShutdown) -> Self {
        self.auto_shutdown = mode;
        self
    }
}

/// Snapshot of one child slot.
#[derive(Debug, Clone, Serialize)]
pub struct ChildInfo {
    /// Child id, unique within the supervisor.
    pub id: String,
    /// Handle of the running incarnation, or `None` for a down slot.
    pub current: Option<Ref>,
    /// Supervised restarts performed for this slot.
    pub restart_count: u32,
    /// The slot's restart policy.
    pub restart: RestartPolicy,
    /// Whether the child counts toward auto-shutdown.
    pub significant: bool,
}

/// Child census in the shape of OTP's `supervisor:count_children/1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChildCounts {
    /// Tracked child slots, running or not.
    pub specs: usize,
    /// Slots currently holding a live child.
    pub active: usize,
    /// Running children that are themselves supervisors.
    pub supervisors: usize,
    /// Running children that are servers.
    pub workers: usize,
}

/// Requests handled by the supervisor loop.
pub(crate) enum SupervisorMsg {
    StartChild {
        spec: ChildSpec,
        reply: oneshot::Sender<Result<Ref, SupervisorError>>,
    },
    StartTemplateChild {
        arg: TemplateArg,
        reply: oneshot::Sender<Result<Ref, SupervisorError>>,
    },
    TerminateChild {
        child: String,
        reply: oneshot::Sender<Result<(), SupervisorError>>,
    },
    RestartChild {
        child: String,
        reply: oneshot::Sender<Result<Ref, SupervisorError>>,
    },
    GetChildren {
        reply: oneshot::Sender<Vec<ChildInfo>>,
    },
    GetChild {
        child: String,
        reply: oneshot::Sender<Option<ChildInfo>>,
    },
    CountChildren {
        reply: oneshot::Sender<ChildCounts>,
    },
}

/// Handle to a running supervisor.
///
/// Cheap to clone; operations on a dead handle fail with
/// [`SupervisorError::NotRunning`].
#[derive(Clone)]
pub struct SupervisorRef {
    target: Ref,
    api: mpsc::UnboundedSender<SupervisorMsg>,
}

impl fmt::Debug for SupervisorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorRef")
            .field("target", &self.target)
            .finish()
    }
}

impl PartialEq for SupervisorRef {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl Eq for SupervisorRef {}

impl SupervisorRef {
    /// The untyped process handle.
    pub fn target(&self) -> &Ref {
        &self.target
    }

    /// Stable id of the supervisor process.
    pub fn id(&self) -> &ProcessId {
        self.target.id()
    }

    /// Whether the supervisor is currently running.
    pub fn is_running(&self) -> bool {
        self.target.is_running()
    }

    /// Add and start a child from a spec. Not valid for
    /// `SimpleOneForOne` supervisors.
    pub async fn start_child(&self, spec: ChildSpec) -> Result<Ref, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.request(SupervisorMsg::StartChild { spec, reply }, rx)
            .await?
    }

    /// Spawn a dynamic child from the template. Only valid for
    /// `SimpleOneForOne` supervisors.
    pub async fn start_template_child(&self, arg: TemplateArg) -> Result<Ref, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.request(SupervisorMsg::StartTemplateChild { arg, reply }, rx)
            .await?
    }

    /// Stop a child but keep its slot, so
    /// [`restart_child`](SupervisorRef::restart_child) can revive it later.
    /// Under `SimpleOneForOne` the slot is removed entirely.
    pub async fn terminate_child(&self, child: impl Into<String>) -> Result<(), SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            SupervisorMsg::TerminateChild {
                child: child.into(),
                reply,
            },
            rx,
        )
        .await?
    }

    /// Start a fresh incarnation into a non-running slot.
    pub async fn restart_child(&self, child: impl Into<String>) -> Result<Ref, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            SupervisorMsg::RestartChild {
                child: child.into(),
                reply,
            },
            rx,
        )
        .await?
    }

    /// Snapshot of every child slot, in start order.
    pub async fn get_children(&self) -> Result<Vec<ChildInfo>, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.request(SupervisorMsg::GetChildren { reply }, rx).await
    }

    /// Snapshot of one child slot.
    pub async fn get_child(
        &self,
        child: impl Into<String>,
    ) -> Result<Option<ChildInfo>, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            SupervisorMsg::GetChild {
                child: child.into(),
                reply,
            },
            rx,
        )
        .await
    }

    /// Child census.
    pub async fn count_children(&self) -> Result<ChildCounts, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.request(SupervisorMsg::CountChildren { reply }, rx).await
    }

    /// Stop the supervisor with reason `Normal`.
    ///
    /// Children are shut down in reverse start order, each bounded by its
    /// own shutdown grace; the call resolves once the whole subtree is
    /// stopped and unregistered. Concurrent stops await the same shutdown.
    pub async fn stop(&self) {
        self.target.stop().await;
    }

    /// Stop the supervisor with an explicit reason.
    pub async fn stop_with(&self, reason: ExitReason) {
        self.target.stop_with(reason, DEFAULT_SHUTDOWN_TIMEOUT).await;
    }

    async fn request<T>(
        &self,
        msg: SupervisorMsg,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, SupervisorError> {
        let not_running = || SupervisorError::NotRunning {
            id: self.id().clone(),
        };
        let alive = table::get(self.id())
            .map(|cell| cell.status().is_alive())
            .unwrap_or(false);
        if !alive {
            return Err(not_running());
        }
        self.api.send(msg).map_err(|_| not_running())?;
        rx.await.map_err(|_| not_running())
    }
}

impl From<SupervisorRef> for Ref {
    fn from(supervisor: SupervisorRef) -> Ref {
        supervisor.target
    }
}

impl From<&SupervisorRef> for Ref {
    fn from(supervisor: &SupervisorRef) -> Ref {
        supervisor.target.clone()
    }
}

impl Ref {
    /// Recover a supervisor handle from an untyped ref.
    ///
    /// Returns `None` when the process is gone or is not a supervisor.
    pub fn downcast_supervisor(&self) -> Option<SupervisorRef> {
        if self.kind() != ProcessKind::Supervisor {
            return None;
        }
        let cell = table::get(self.id())?;
        let api = cell
            .sender_any()
            .downcast_ref::<mpsc::UnboundedSender<SupervisorMsg>>()?;
        Some(SupervisorRef {
            target: self.clone(),
            api: api.clone(),
        })
    }
}

/// How a child slot produces new incarnations.
enum EntryStart {
    Factory(ChildStartFn),
    Template {
        start: TemplateStartFn,
        arg: TemplateArg,
    },
}

/// One tracked child slot.
struct ChildEntry {
    id: String,
    start: EntryStart,
    restart: RestartPolicy,
    shutdown_timeout: Duration,
    significant: bool,
    current: Option<Ref>,
    restart_count: u32,
}

impl ChildEntry {
    fn from_spec(spec: ChildSpec) -> Self {
        Self {
            id: spec.id,
            start: EntryStart::Factory(spec.start),
            restart: spec.restart,
            shutdown_timeout: spec.shutdown_timeout,
            significant: spec.significant,
            current: None,
            restart_count: 0,
        }
    }

    fn from_template(id: String, template: &ChildTemplate, arg: TemplateArg) -> Self {
        Self {
            id,
            start: EntryStart::Template {
                start: Arc::clone(&template.start),
                arg,
            },
            restart: template.restart,
            shutdown_timeout: template.shutdown_timeout,
            significant: template.significant,
            current: None,
            restart_count: 0,
        }
    }

    fn info(&self) -> ChildInfo {
        ChildInfo {
            id: self.id.clone(),
            current: self.current.clone(),
            restart_count: self.restart_count,
            restart: self.restart,
            significant: self.significant,
        }
    }
}

/// Start a supervisor process.
///
/// Initial children are started sequentially in declaration order before
/// this returns. If any child fails to start, the already started children
/// are stopped in reverse order and the originating error is returned; the
/// supervisor never existed as far as lifecycle observers are concerned.
pub async fn start(opts: SupervisorOpts) -> Result<SupervisorRef, SupervisorError> {
    let id = ProcessId::next(ProcessKind::Supervisor);
    let target = Ref::new(id.clone(), ProcessKind::Supervisor);

    match opts.strategy {
        Strategy::SimpleOneForOne => {
            if opts.template.is_none() {
                return Err(SupervisorError::MissingChildTemplate { supervisor: id });
            }
            if !opts.children.is_empty() {
                return Err(SupervisorError::InvalidSimpleOneForOneConfig {
                    supervisor: id,
                    reason: "static children are not allowed".into(),
                });
            }
        }
        _ => {
            if opts.template.is_some() {
                return Err(SupervisorError::InvalidSimpleOneForOneConfig {
                    supervisor: id,
                    reason: "a child template requires the simple_one_for_one strategy".into(),
                });
            }
            for (index, spec) in opts.children.iter().enumerate() {
                if opts.children[..index].iter().any(|prior| prior.id == spec.id) {
                    return Err(SupervisorError::DuplicateChild {
                        supervisor: id,
                        child: spec.id.clone(),
                    });
                }
            }
        }
    }

    let (api_tx, api_rx) = mpsc::unbounded_channel();
    let (exits_tx, exits_rx) = mpsc::unbounded_channel();
    let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
    let cell = ProcessCell::new(target.clone(), Box::new(api_tx.clone()), ctrl_tx);
    table::insert(Arc::clone(&cell));

    if let Some(name) = &opts.name {
        if registry::register(name.clone(), &target).is_err() {
            table::discard(&cell);
            return Err(SupervisorError::AlreadyRegistered { name: name.clone() });
        }
    }

    let mut task = SupervisorTask {
        cell: Arc::clone(&cell),
        strategy: opts.strategy,
        auto_shutdown: opts.auto_shutdown,
        template: opts.template,
        limit: opts.intensity,
        window: IntensityWindow::new(opts.intensity),
        entries: opts.children.into_iter().map(ChildEntry::from_spec).collect(),
        exits_tx,
        next_dynamic_id: 0,
    };

    for index in 0..task.entries.len() {
        match task.start_entry(index).await {
            Ok(child) => task.entries[index].current = Some(child),
            Err(source) => {
                for prior in (0..index).rev() {
                    if let Some(child) = task.entries[prior].current.take() {
                        stop_child(&child, task.entries[prior].shutdown_timeout).await;
                    }
                }
                let child = task.entries[index].id.clone();
                table::discard(&cell);
                return Err(SupervisorError::ChildStartFailed { child, source });
            }
        }
    }

    cell.try_set_running();
    let join = tokio::spawn(task.run(api_rx, exits_rx, ctrl_rx));
    cell.set_abort(join.abort_handle());
    spawn_exit_watcher(Arc::clone(&cell), join);

    debug!(process = %target.id(), strategy = ?opts.strategy, "supervisor started");
    events::emit(LifecycleEvent::Started {
        target: target.clone(),
    });
    Ok(SupervisorRef {
        target,
        api: api_tx,
    })
}

/// Stop one child, bounded by its configured grace period.
async fn stop_child(child: &Ref, grace: Duration) {
    table::stop_process(child, ExitReason::Shutdown, grace).await;
}

/// Loop state of one supervisor process.
struct SupervisorTask {
    cell: Arc<ProcessCell>,
    strategy: Strategy,
    auto_shutdown: AutoShutdown,
    template: Option<ChildTemplate>,
    limit: RestartIntensity,
    window: IntensityWindow,
    entries: Vec<ChildEntry>,
    exits_tx: mpsc::UnboundedSender<ChildExit>,
    next_dynamic_id: u64,
}

impl SupervisorTask {
    async fn run(
        mut self,
        mut api_rx: mpsc::UnboundedReceiver<SupervisorMsg>,
        mut exits_rx: mpsc::UnboundedReceiver<ChildExit>,
        mut ctrl_rx: mpsc::UnboundedReceiver<ControlSignal>,
    ) {
        let reason = loop {
            tokio::select! {
                biased;
                signal = ctrl_rx.recv() => {
                    match signal {
                        Some(ControlSignal::Shutdown { reason, .. }) => break reason,
                        None => break ExitReason::Shutdown,
                    }
                }
                notice = exits_rx.recv() => {
                    if let Some(exit) = notice {
                        if let Some(terminal) = self.on_child_exit(exit).await {
                            break terminal;
                        }
                    }
                }
                request = api_rx.recv() => {
                    if let Some(msg) = request {
                        self.on_request(msg).await;
                    }
                }
            }
        };

        // Once stopping, child exits no longer trigger restarts: the loop is
        // out of the select and drains nothing further.
        self.cell.begin_stopping();
        self.shutdown_children().await;
        table::finalize_exit(&self.cell, reason);
    }

    /// Apply restart rules to a child exit notice.
    ///
    /// Returns `Some(reason)` when the supervisor itself must terminate
    /// (auto-shutdown or escalation).
    async fn on_child_exit(&mut self, exit: ChildExit) -> Option<ExitReason> {
        // Stale notices — deliberate stops and previous incarnations — no
        // longer match any slot's current ref and are dropped. This is also
        // what collapses simultaneous group crashes into one restart event.
        let index = self
            .entries
            .iter()
            .position(|entry| entry.current.as_ref().is_some_and(|r| r.id() == &exit.id))?;
        self.entries[index].current = None;

        if !self.entries[index].restart.should_restart(&exit.reason) {
            debug!(
                supervisor = %self.cell.id(),
                child = %self.entries[index].id,
                reason = %exit.reason,
                "child exit without restart"
            );
            let significant = self.entries[index].significant;
            if self.strategy.is_simple() {
                self.entries.remove(index);
            }
            if significant {
                match self.auto_shutdown {
                    AutoShutdown::Never => {}
                    AutoShutdown::AnySignificant => {
                        debug!(supervisor = %self.cell.id(), "significant child stopped, auto-shutdown");
                        return Some(ExitReason::Shutdown);
                    }
                    AutoShutdown::AllSignificant => {
                        let any_left = self
                            .entries
                            .iter()
                            .any(|entry| entry.significant && entry.current.is_some());
                        if !any_left {
                            debug!(supervisor = %self.cell.id(), "last significant child stopped, auto-shutdown");
                            return Some(ExitReason::Shutdown);
                        }
                    }
                }
            }
            return None;
        }

        if self.window.record(Instant::now()) {
            return Some(self.escalate());
        }

        let strategy = self.strategy;
        let entries = &self.entries;
        let group = strategy::restart_set(strategy, index, entries.len(), |i| {
            entries[i].current.is_some()
        });

        // Stop the still-running members of the group, reverse start order.
        for &member in group.iter().rev() {
            if let Some(child) = self.entries[member].current.take() {
                stop_child(&child, self.entries[member].shutdown_timeout).await;
            }
        }

        // Restart the group in stable original order. A start failure counts
        // as a fresh restart event; the intensity window is what eventually
        // breaks the loop.
        for &member in &group {
            loop {
                match self.start_entry(member).await {
                    Ok(child) => {
                        let entry = &mut self.entries[member];
                        entry.restart_count += 1;
                        events::emit(LifecycleEvent::Restarted {
                            target: child.clone(),
                            attempt: entry.restart_count,
                        });
                        entry.current = Some(child);
                        break;
                    }
                    Err(source) => {
                        warn!(
                            supervisor = %self.cell.id(),
                            child = %self.entries[member].id,
                            error = %source,
                            "child restart failed"
                        );
                        if self.window.record(Instant::now()) {
                            return Some(self.escalate());
                        }
                    }
                }
            }
        }
        None
    }

    async fn on_request(&mut self, msg: SupervisorMsg) {
        match msg {
            SupervisorMsg::StartChild { spec, reply } => {
                let _ = reply.send(self.api_start_child(spec).await);
            }
            SupervisorMsg::StartTemplateChild { arg, reply } => {
                let _ = reply.send(self.api_start_template_child(arg).await);
            }
            SupervisorMsg::TerminateChild { child, reply } => {
                let _ = reply.send(self.api_terminate_child(&child).await);
            }
            SupervisorMsg::RestartChild { child, reply } => {
                let _ = reply.send(self.api_restart_child(&child).await);
            }
            SupervisorMsg::GetChildren { reply } => {
                let _ = reply.send(self.entries.iter().map(ChildEntry::info).collect());
            }
            SupervisorMsg::GetChild { child, reply } => {
                let _ = reply.send(
                    self.entries
                        .iter()
                        .find(|entry| entry.id == child)
                        .map(ChildEntry::info),
                );
            }
            SupervisorMsg::CountChildren { reply } => {
                let _ = reply.send(self.counts());
            }
        }
    }

    async fn api_start_child(&mut self, spec: ChildSpec) -> Result<Ref, SupervisorError> {
        if self.strategy.is_simple() {
            return Err(SupervisorError::InvalidSimpleOneForOneConfig {
                supervisor: self.cell.id().clone(),
                reason: "child specs cannot be added dynamically; spawn from the template".into(),
            });
        }
        if let Some(existing) = self.entries.iter().position(|entry| entry.id == spec.id) {
            if self.entries[existing].current.is_some() {
                return Err(SupervisorError::DuplicateChild {
                    supervisor: self.cell.id().clone(),
                    child: spec.id,
                });
            }
            // A terminated slot can be re-added: the fresh spec replaces it
            // in place, with a clean restart history.
            self.entries[existing] = ChildEntry::from_spec(spec);
            return match self.start_entry(existing).await {
                Ok(child) => {
                    self.entries[existing].current = Some(child.clone());
                    Ok(child)
                }
                Err(source) => Err(SupervisorError::ChildStartFailed {
                    child: self.entries[existing].id.clone(),
                    source,
                }),
            };
        }
        self.entries.push(ChildEntry::from_spec(spec));
        let index = self.entries.len() - 1;
        match self.start_entry(index).await {
            Ok(child) => {
                self.entries[index].current = Some(child.clone());
                Ok(child)
            }
            Err(source) => {
                let entry = self.entries.remove(index);
                Err(SupervisorError::ChildStartFailed {
                    child: entry.id,
                    source,
                })
            }
        }
    }

    async fn api_start_template_child(&mut self, arg: TemplateArg) -> Result<Ref, SupervisorError> {
        if !self.strategy.is_simple() {
            return Err(SupervisorError::InvalidSimpleOneForOneConfig {
                supervisor: self.cell.id().clone(),
                reason: "dynamic arguments require the simple_one_for_one strategy".into(),
            });
        }
        let Some(template) = self.template.clone() else {
            // Validated at start; simple supervisors always carry a template.
            return Err(SupervisorError::MissingChildTemplate {
                supervisor: self.cell.id().clone(),
            });
        };
        self.next_dynamic_id += 1;
        let id = format!("child-{}", self.next_dynamic_id);
        self.entries
            .push(ChildEntry::from_template(id, &template, arg));
        let index = self.entries.len() - 1;
        match self.start_entry(index).await {
            Ok(child) => {
                self.entries[index].current = Some(child.clone());
                Ok(child)
            }
            Err(source) => {
                let entry = self.entries.remove(index);
                Err(SupervisorError::ChildStartFailed {
                    child: entry.id,
                    source,
                })
            }
        }
    }

    async fn api_terminate_child(&mut self, child: &str) -> Result<(), SupervisorError> {
        let Some(index) = self.entries.iter().position(|entry| entry.id == child) else {
            return Err(SupervisorError::ChildNotFound {
                supervisor: self.cell.id().clone(),
                child: child.to_string(),
            });
        };
        if let Some(running) = self.entries[index].current.take() {
            stop_child(&running, self.entries[index].shutdown_timeout).await;
        }
        if self.strategy.is_simple() {
            // No slot to restart into under simple_one_for_one.
            self.entries.remove(index);
        }
        Ok(())
    }

    async fn api_restart_child(&mut self, child: &str) -> Result<Ref, SupervisorError> {
        let Some(index) = self.entries.iter().position(|entry| entry.id == child) else {
            return Err(SupervisorError::ChildNotFound {
                supervisor: self.cell.id().clone(),
                child: child.to_string(),
            });
        };
        if self.entries[index].current.is_some() {
            return Err(SupervisorError::ChildAlreadyRunning {
                supervisor: self.cell.id().clone(),
                child: child.to_string(),
            });
        }
        match self.start_entry(index).await {
            Ok(started) => {
                self.entries[index].current = Some(started.clone());
                Ok(started)
            }
            Err(source) => Err(SupervisorError::ChildStartFailed {
                child: child.to_string(),
                source,
            }),
        }
    }

    /// Invoke a slot's factory and attach supervision to the new child.
    async fn start_entry(&self, index: usize) -> Result<Ref, StartError> {
        let factory_future = {
            let entry = &self.entries[index];
            match &entry.start {
                EntryStart::Factory(factory) => factory(),
                EntryStart::Template { start, arg } => start(Arc::clone(arg)),
            }
        };
        let started = factory_future.await?;
        match table::attach_parent(started.id(), self.cell.id().clone(), self.exits_tx.clone()) {
            Ok(()) => Ok(started),
            // The child died between start and attach; report it as a failed
            // start so the normal retry/rollback paths apply.
            Err(()) => Err(StartError::InitFailed {
                cause: Arc::new(EarlyExit {
                    id: started.id().clone(),
                }),
            }),
        }
    }

    /// Shut down every running child, reverse start order.
    async fn shutdown_children(&mut self) {
        for index in (0..self.entries.len()).rev() {
            if let Some(child) = self.entries[index].current.take() {
                stop_child(&child, self.entries[index].shutdown_timeout).await;
            }
        }
    }

    fn counts(&self) -> ChildCounts {
        let running = |entry: &&ChildEntry| entry.current.is_some();
        let active = self.entries.iter().filter(running).count();
        let supervisors = self
            .entries
            .iter()
            .filter(|entry| {
                entry
                    .current
                    .as_ref()
                    .is_some_and(|child| child.kind() == ProcessKind::Supervisor)
            })
            .count();
        ChildCounts {
            specs: self.entries.len(),
            active,
            supervisors,
            workers: active - supervisors,
        }
    }

    /// Emit the crash and produce the terminal `MaxRestartsExceeded` exit.
    fn escalate(&mut self) -> ExitReason {
        let fault = SupervisorError::MaxRestartsExceeded {
            supervisor: self.cell.id().clone(),
            max_restarts: self.limit.max_restarts,
            within: self.limit.within,
        };
        error!(supervisor = %self.cell.id(), %fault, "restart intensity exceeded, terminating");
        let cause: FaultCause = Arc::new(fault);
        events::emit(LifecycleEvent::Crashed {
            target: self.cell.target().clone(),
            error: Arc::clone(&cause),
        });
        ExitReason::Error(cause)
    }
}
