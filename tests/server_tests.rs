//! Generic Server Integration Tests
//!
//! End-to-end tests for the generic-server contract: start/init semantics,
//! call/cast behaviour, crash conversion, timers, and shutdown bounds.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tokio_test::assert_ok;

// Layer 3: Internal module imports
use procnest::prelude::*;
use procnest::testing;

// ============================================================================
// Fixtures
// ============================================================================

enum CounterCall {
    Get,
    Boom,
    SlowGet(Duration),
}

enum CounterCast {
    Increment,
    Add(u64),
    Boom,
}

#[derive(Default)]
struct Counter {
    count: u64,
}

#[async_trait]
impl GenServer for Counter {
    type Call = CounterCall;
    type Reply = u64;
    type Cast = CounterCast;
    type Error = std::io::Error;

    async fn handle_call(&mut self, request: CounterCall) -> Result<u64, Self::Error> {
        match request {
            CounterCall::Get => Ok(self.count),
            CounterCall::Boom => Err(std::io::Error::other("call handler failure")),
            CounterCall::SlowGet(delay) => {
                sleep(delay).await;
                Ok(self.count)
            }
        }
    }

    async fn handle_cast(&mut self, message: CounterCast) -> Result<(), Self::Error> {
        match message {
            CounterCast::Increment => {
                self.count += 1;
                Ok(())
            }
            CounterCast::Add(delta) => {
                self.count += delta;
                Ok(())
            }
            CounterCast::Boom => Err(std::io::Error::other("cast handler failure")),
        }
    }
}

/// Server whose lifecycle hooks report into shared flags.
struct Probe {
    init_delay: Duration,
    fail_init: bool,
    terminate_delay: Duration,
    terminated: Arc<AtomicBool>,
}

impl Probe {
    fn quick(terminated: Arc<AtomicBool>) -> Self {
        Self {
            init_delay: Duration::ZERO,
            fail_init: false,
            terminate_delay: Duration::ZERO,
            terminated,
        }
    }
}

#[async_trait]
impl GenServer for Probe {
    type Call = ();
    type Reply = ();
    type Cast = ();
    type Error = std::io::Error;

    async fn init(&mut self) -> Result<(), Self::Error> {
        if self.init_delay > Duration::ZERO {
            sleep(self.init_delay).await;
        }
        if self.fail_init {
            return Err(std::io::Error::other("init refused"));
        }
        Ok(())
    }

    async fn handle_call(&mut self, _request: ()) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn handle_cast(&mut self, _message: ()) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn terminate(&mut self, _reason: &ExitReason) {
        if self.terminate_delay > Duration::ZERO {
            sleep(self.terminate_delay).await;
        }
        self.terminated.store(true, Ordering::SeqCst);
    }
}

async fn eventually(budget: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + budget;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() > deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

// ============================================================================
// TEST GROUP 1: Start and init
// ============================================================================

#[tokio::test]
async fn test_start_call_cast_round_trip() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    assert!(counter.is_running());
    assert_ok!(counter.cast(CounterCast::Increment));
    assert_ok!(counter.cast(CounterCast::Add(4)));

    let value = counter.call(CounterCall::Get).await.unwrap();
    assert_eq!(value, 5);

    counter.stop().await;
    assert!(!counter.is_running());
}

#[tokio::test]
async fn test_init_failure_surfaces_to_start() {
    let terminated = Arc::new(AtomicBool::new(false));
    let probe = Probe {
        fail_init: true,
        ..Probe::quick(Arc::clone(&terminated))
    };

    let error = server::start(probe, SpawnOpts::new()).await.unwrap_err();
    assert!(matches!(error, StartError::InitFailed { .. }));
    assert!(error.to_string().contains("init refused"));
    // terminate never runs for a process that never started.
    assert!(!terminated.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_init_timeout() {
    let terminated = Arc::new(AtomicBool::new(false));
    let probe = Probe {
        init_delay: Duration::from_millis(500),
        ..Probe::quick(terminated)
    };

    let error = server::start(
        probe,
        SpawnOpts::new().init_timeout(Duration::from_millis(50)),
    )
    .await
    .unwrap_err();
    assert!(matches!(error, StartError::InitTimeout { .. }));
}

#[tokio::test]
async fn test_zero_init_timeout_accepts_synchronous_init() {
    // An init that never awaits completes inside the first poll, so even a
    // zero timeout admits it.
    let counter = server::start(
        Counter::default(),
        SpawnOpts::new().init_timeout(Duration::ZERO),
    )
    .await
    .unwrap();
    assert!(counter.is_running());
    counter.stop().await;
}

#[tokio::test]
async fn test_named_start_registration_and_downcast() {
    let name = "counter-named-start";
    let counter = server::start(Counter::default(), SpawnOpts::new().named(name))
        .await
        .unwrap();

    let found = registry::whereis(name).unwrap();
    assert_eq!(&found, counter.target());

    // Registry refs are untyped; recover the typed handle to talk to it.
    let typed = found.downcast::<Counter>().unwrap();
    typed.cast(CounterCast::Increment).unwrap();
    assert_eq!(typed.call(CounterCall::Get).await.unwrap(), 1);

    // A second server cannot claim the name while the first lives.
    let error = server::start(Counter::default(), SpawnOpts::new().named(name))
        .await
        .unwrap_err();
    assert!(matches!(error, StartError::AlreadyRegistered { .. }));

    counter.stop().await;
    assert!(registry::whereis(name).is_none());
}

#[tokio::test]
async fn test_downcast_to_wrong_behaviour_fails() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();
    assert!(counter.target().downcast::<Probe>().is_none());
    assert!(counter.target().downcast_supervisor().is_none());
    counter.stop().await;
}

// ============================================================================
// TEST GROUP 2: Calls, timeouts, crashes
// ============================================================================

#[tokio::test]
async fn test_call_timeout_leaves_server_running() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    let error = counter
        .call_with_timeout(
            CounterCall::SlowGet(Duration::from_millis(200)),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, ServerError::CallTimeout { .. }));
    assert!(error.is_retryable());

    // The callee still processed the slow call and stays usable.
    let value = counter.call(CounterCall::Get).await.unwrap();
    assert_eq!(value, 0);
    assert!(counter.is_running());
    counter.stop().await;
}

#[tokio::test]
async fn test_zero_call_timeout_expires_for_suspending_handler() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    let error = counter
        .call_with_timeout(
            CounterCall::SlowGet(Duration::from_millis(50)),
            Duration::ZERO,
        )
        .await
        .unwrap_err();
    assert!(matches!(error, ServerError::CallTimeout { .. }));
    counter.stop().await;
}

#[tokio::test]
async fn test_call_handler_crash() {
    let crashed = Arc::new(AtomicBool::new(false));
    let crashed_flag = Arc::clone(&crashed);
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();
    let watched = counter.target().clone();
    let sub = procnest::subscribe(move |event| {
        if let LifecycleEvent::Crashed { target, .. } = event {
            if target == &watched {
                crashed_flag.store(true, Ordering::SeqCst);
            }
        }
    });

    let error = counter.call(CounterCall::Boom).await.unwrap_err();
    assert!(matches!(error, ServerError::HandlerFailed { .. }));
    assert!(error.to_string().contains("call handler failure"));

    assert!(eventually(Duration::from_secs(1), || !counter.is_running()).await);
    assert!(crashed.load(Ordering::SeqCst));

    // Later operations observe a dead process.
    assert!(matches!(
        counter.cast(CounterCast::Increment),
        Err(ServerError::NotRunning { .. })
    ));
    let error = counter.call(CounterCall::Get).await.unwrap_err();
    assert!(matches!(error, ServerError::NotRunning { .. }));
    sub.unsubscribe();
}

#[tokio::test]
async fn test_cast_handler_crash_matches_call_crash() {
    let crashed = Arc::new(AtomicBool::new(false));
    let crashed_flag = Arc::clone(&crashed);
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();
    let watched = counter.target().clone();
    let sub = procnest::subscribe(move |event| {
        if let LifecycleEvent::Crashed { target, .. } = event {
            if target == &watched {
                crashed_flag.store(true, Ordering::SeqCst);
            }
        }
    });

    // Fire-and-forget: the sender is not informed, the process still dies.
    counter.cast(CounterCast::Boom).unwrap();
    assert!(eventually(Duration::from_secs(1), || !counter.is_running()).await);
    assert!(crashed.load(Ordering::SeqCst));
    sub.unsubscribe();
}

#[tokio::test]
async fn test_lifecycle_event_order_for_crash() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();
    let watched = counter.target().clone();
    let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log_handle = Arc::clone(&log);
    let sub = procnest::subscribe(move |event| {
        if event.target() == &watched {
            let tag = match event {
                LifecycleEvent::Started { .. } => "started",
                LifecycleEvent::Crashed { .. } => "crashed",
                LifecycleEvent::Restarted { .. } => "restarted",
                LifecycleEvent::Terminated { .. } => "terminated",
            };
            log_handle.lock().push(tag);
        }
    });

    counter.cast(CounterCast::Boom).unwrap();
    assert!(eventually(Duration::from_secs(1), || !counter.is_running()).await);
    assert!(
        eventually(Duration::from_secs(1), || log.lock().contains(&"terminated")).await
    );

    // `Started` was emitted before we subscribed; crash ordering holds.
    assert_eq!(log.lock().clone(), vec!["crashed", "terminated"]);
    sub.unsubscribe();
}

// ============================================================================
// TEST GROUP 3: Ordering and serialisation
// ============================================================================

#[tokio::test]
async fn test_fifo_ordering_from_one_sender() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    for delta in 1..=100_u64 {
        counter.cast(CounterCast::Add(delta)).unwrap();
    }
    let value = counter.call(CounterCall::Get).await.unwrap();
    assert_eq!(value, (1..=100).sum::<u64>());
    counter.stop().await;
}

/// No two handler invocations of one process may overlap (multi-threaded
/// runtime, many concurrent senders).
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serialised_handler_execution() {
    struct Overlap {
        active: Arc<AtomicU64>,
        overlapped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl GenServer for Overlap {
        type Call = ();
        type Reply = ();
        type Cast = ();
        type Error = std::io::Error;

        async fn handle_cast(&mut self, _message: ()) -> Result<(), Self::Error> {
            if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            // Suspend mid-handler; the mailbox must not be consumed.
            sleep(Duration::from_micros(200)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn handle_call(&mut self, _request: ()) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    let overlapped = Arc::new(AtomicBool::new(false));
    let server = server::start(
        Overlap {
            active: Arc::new(AtomicU64::new(0)),
            overlapped: Arc::clone(&overlapped),
        },
        SpawnOpts::new(),
    )
    .await
    .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handle = server.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..50 {
                handle.cast(()).unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Drain: a call enqueued after the casts completes after all of them.
    server.call(()).await.unwrap();
    assert!(!overlapped.load(Ordering::SeqCst));
    server.stop().await;
}

// ============================================================================
// TEST GROUP 4: Timers
// ============================================================================

#[tokio::test]
async fn test_send_after_delivers_once() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    let tref = counter
        .send_after(CounterCast::Increment, Duration::from_millis(30))
        .unwrap();

    sleep(Duration::from_millis(80)).await;
    assert_eq!(counter.call(CounterCall::Get).await.unwrap(), 1);

    // Fired timers report false on cancellation, with no side effects.
    assert!(!tref.cancel());
    assert_eq!(counter.call(CounterCall::Get).await.unwrap(), 1);
    counter.stop().await;
}

#[tokio::test]
async fn test_cancel_timer_before_fire() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    let tref = counter
        .send_after(CounterCast::Increment, Duration::from_millis(60))
        .unwrap();
    assert!(tref.cancel());
    assert!(!tref.cancel());

    sleep(Duration::from_millis(120)).await;
    assert_eq!(counter.call(CounterCall::Get).await.unwrap(), 0);
    counter.stop().await;
}

#[tokio::test]
async fn test_send_after_on_dead_server_fails() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();
    counter.stop().await;

    let error = counter
        .send_after(CounterCast::Increment, Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(error, ServerError::NotRunning { .. }));
}

// ============================================================================
// TEST GROUP 5: Shutdown
// ============================================================================

#[tokio::test]
async fn test_stop_runs_terminate() {
    let terminated = Arc::new(AtomicBool::new(false));
    let probe = server::start(Probe::quick(Arc::clone(&terminated)), SpawnOpts::new())
        .await
        .unwrap();

    probe.stop().await;
    assert!(terminated.load(Ordering::SeqCst));
    assert!(!probe.is_running());
}

#[tokio::test]
async fn test_stop_bounds_hung_terminate() {
    let terminated = Arc::new(AtomicBool::new(false));
    let probe = server::start(
        Probe {
            terminate_delay: Duration::from_secs(30),
            ..Probe::quick(Arc::clone(&terminated))
        },
        SpawnOpts::new(),
    )
    .await
    .unwrap();

    let began = Instant::now();
    probe
        .stop_with(ExitReason::Shutdown, Duration::from_millis(150))
        .await;
    assert!(began.elapsed() < Duration::from_millis(500));
    assert!(!probe.is_running());
    // terminate never finished; the flag stays unset.
    assert!(!terminated.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    let first = counter.stop();
    let second = counter.stop();
    tokio::join!(first, second);
    assert!(!counter.is_running());

    // Stopping an already dead server is a no-op.
    counter.stop().await;
}

/// A handler that never yields back to its loop cannot honour `Shutdown`;
/// the runtime must kill it no later than the grace period.
#[tokio::test]
async fn test_stop_kills_handler_that_ignores_shutdown() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    let wedged = {
        let handle = counter.clone();
        tokio::spawn(async move {
            handle
                .call_with_timeout(
                    CounterCall::SlowGet(Duration::from_secs(30)),
                    Duration::from_secs(60),
                )
                .await
        })
    };
    sleep(Duration::from_millis(30)).await;

    let began = Instant::now();
    counter
        .stop_with(ExitReason::Shutdown, Duration::from_millis(150))
        .await;
    assert!(began.elapsed() < Duration::from_millis(600));
    assert!(!counter.is_running());

    // The wedged caller observes the death rather than hanging forever.
    let outcome = wedged.await.unwrap();
    assert!(matches!(outcome, Err(ServerError::NotRunning { .. })));
}

#[tokio::test]
async fn test_stop_does_not_drain_mailbox() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    // Wedge the loop briefly so the queue builds up behind it.
    let slow = counter.call_with_timeout(
        CounterCall::SlowGet(Duration::from_millis(100)),
        Duration::from_millis(10),
    );
    let _ = slow.await;
    for _ in 0..64 {
        let _ = counter.cast(CounterCast::Increment);
    }
    counter.stop().await;
    assert!(!counter.is_running());
}

#[tokio::test]
async fn test_process_info_snapshot() {
    let counter = server::start(
        Counter::default(),
        SpawnOpts::new().named("info-snapshot"),
    )
    .await
    .unwrap();
    counter.cast(CounterCast::Increment).unwrap();
    counter.call(CounterCall::Get).await.unwrap();

    let info = procnest::info(counter.target()).unwrap();
    assert_eq!(info.kind, ProcessKind::Server);
    assert_eq!(info.status, ProcessStatus::Running);
    assert_eq!(info.name.as_deref(), Some("info-snapshot"));
    assert_eq!(info.processed_messages, 2);
    // Standalone servers have no supervisor back-pointer.
    assert!(info.supervisor.is_none());

    // Snapshots serialize for embedding dashboards.
    let json = serde_json::to_string(&info).unwrap();
    assert!(json.contains("info-snapshot"));

    counter.stop().await;
    assert!(procnest::info(counter.target()).is_none());
}

#[tokio::test]
async fn test_force_terminate_injects_crash() {
    let counter = server::start(Counter::default(), SpawnOpts::new())
        .await
        .unwrap();

    testing::force_terminate(
        counter.target(),
        ExitReason::error(std::io::Error::other("injected")),
    );
    assert!(eventually(Duration::from_secs(1), || !counter.is_running()).await);
    assert!(matches!(
        counter.call(CounterCall::Get).await.unwrap_err(),
        ServerError::NotRunning { .. }
    ));
}
