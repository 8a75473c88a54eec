//! End-to-End Scenario Tests
//!
//! Six concrete supervision scenarios exercising the full stack: counters
//! under OneForOne, OneForAll cascades, RestForOne suffix restarts,
//! intensity escalation, shutdown-timeout bounds, and dynamic
//! SimpleOneForOne batches.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};

// Layer 3: Internal module imports
use procnest::prelude::*;
use procnest::testing;

// ============================================================================
// Fixtures
// ============================================================================

enum CellCall {
    Get,
    GetId,
}

enum CellCast {
    Increment,
    Set(u64),
}

/// A value cell that knows its configured identity.
struct ValueCell {
    identity: String,
    value: u64,
}

impl ValueCell {
    fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            value: 0,
        }
    }
}

#[async_trait]
impl GenServer for ValueCell {
    type Call = CellCall;
    type Reply = String;
    type Cast = CellCast;
    type Error = std::io::Error;

    async fn handle_call(&mut self, request: CellCall) -> Result<String, Self::Error> {
        match request {
            CellCall::Get => Ok(self.value.to_string()),
            CellCall::GetId => Ok(self.identity.clone()),
        }
    }

    async fn handle_cast(&mut self, message: CellCast) -> Result<(), Self::Error> {
        match message {
            CellCast::Increment => self.value += 1,
            CellCast::Set(value) => self.value = value,
        }
        Ok(())
    }
}

fn cell_spec(id: &str) -> ChildSpec {
    let identity = id.to_string();
    ChildSpec::new(id, move || {
        let identity = identity.clone();
        async move {
            let cell = server::start(ValueCell::new(identity), SpawnOpts::new()).await?;
            Ok(cell.into())
        }
    })
}

async fn cell_handle(sup: &SupervisorRef, id: &str) -> ServerRef<ValueCell> {
    sup.get_child(id.to_string())
        .await
        .unwrap()
        .unwrap()
        .current
        .unwrap()
        .downcast::<ValueCell>()
        .unwrap()
}

async fn get_value(sup: &SupervisorRef, id: &str) -> u64 {
    cell_handle(sup, id)
        .await
        .call(CellCall::Get)
        .await
        .unwrap()
        .parse()
        .unwrap()
}

async fn current_ref(sup: &SupervisorRef, id: &str) -> Ref {
    sup.get_child(id.to_string())
        .await
        .unwrap()
        .unwrap()
        .current
        .unwrap()
}

async fn await_replacement(sup: &SupervisorRef, id: &str, previous: &Ref) -> Ref {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Ok(Some(info)) = sup.get_child(id.to_string()).await {
            if let Some(current) = info.current {
                if &current != previous && current.is_running() {
                    return current;
                }
            }
        }
        assert!(
            Instant::now() <= deadline,
            "child '{id}' was not replaced in time"
        );
        sleep(Duration::from_millis(10)).await;
    }
}

fn crash(target: &Ref) {
    testing::force_terminate(target, ExitReason::error(std::io::Error::other("injected")));
}

// ============================================================================
// S1 — Counter under OneForOne
// ============================================================================

#[tokio::test]
async fn scenario_counter_under_one_for_one() {
    let sup = supervisor::start(
        SupervisorOpts::new(Strategy::OneForOne).child(cell_spec("counter")),
    )
    .await
    .unwrap();

    let counter = cell_handle(&sup, "counter").await;
    counter.cast(CellCast::Increment).unwrap();
    counter.cast(CellCast::Increment).unwrap();
    assert_eq!(get_value(&sup, "counter").await, 2);

    let original = current_ref(&sup, "counter").await;
    crash(&original);
    await_replacement(&sup, "counter", &original).await;

    // Fresh incarnation, fresh state.
    assert_eq!(get_value(&sup, "counter").await, 0);
    let info = sup.get_child("counter").await.unwrap().unwrap();
    assert_eq!(info.restart_count, 1);

    sup.stop().await;
}

// ============================================================================
// S2 — OneForAll cascade
// ============================================================================

#[tokio::test]
async fn scenario_one_for_all_cascade() {
    let sup = supervisor::start(
        SupervisorOpts::new(Strategy::OneForAll)
            .child(cell_spec("a"))
            .child(cell_spec("b"))
            .child(cell_spec("c")),
    )
    .await
    .unwrap();

    let ra = current_ref(&sup, "a").await;
    let rb = current_ref(&sup, "b").await;
    let rc = current_ref(&sup, "c").await;

    crash(&rb);
    let ra2 = await_replacement(&sup, "a", &ra).await;
    let rb2 = await_replacement(&sup, "b", &rb).await;
    let rc2 = await_replacement(&sup, "c", &rc).await;

    assert_ne!(ra2, ra);
    assert_ne!(rb2, rb);
    assert_ne!(rc2, rc);

    // Identities are rebuilt from the specs, so each child still reports its
    // configured id.
    for id in ["a", "b", "c"] {
        let identity = cell_handle(&sup, id)
            .await
            .call(CellCall::GetId)
            .await
            .unwrap();
        assert_eq!(identity, id);
    }

    sup.stop().await;
}

// ============================================================================
// S3 — RestForOne with state retention
// ============================================================================

#[tokio::test]
async fn scenario_rest_for_one_state_retention() {
    let ids = ["p0", "p1", "p2", "p3", "p4"];
    let mut opts = SupervisorOpts::new(Strategy::RestForOne);
    for id in ids {
        opts = opts.child(cell_spec(id));
    }
    let sup = supervisor::start(opts).await.unwrap();

    for (index, id) in ids.iter().enumerate() {
        cell_handle(&sup, id)
            .await
            .cast(CellCast::Set(index as u64 + 1))
            .unwrap();
    }

    let before: Vec<Ref> = {
        let mut refs = Vec::new();
        for id in ids {
            refs.push(current_ref(&sup, id).await);
        }
        refs
    };

    crash(&before[2]);
    for (index, id) in ids.iter().enumerate().skip(2) {
        await_replacement(&sup, id, &before[index]).await;
    }

    // Prefix untouched: same refs, same state.
    assert_eq!(current_ref(&sup, "p0").await, before[0]);
    assert_eq!(current_ref(&sup, "p1").await, before[1]);
    assert_eq!(get_value(&sup, "p0").await, 1);
    assert_eq!(get_value(&sup, "p1").await, 2);

    // Suffix replaced with fresh state.
    for id in &ids[2..] {
        assert_eq!(get_value(&sup, id).await, 0);
    }

    sup.stop().await;
}

// ============================================================================
// S4 — Intensity exceeded
// ============================================================================

#[tokio::test]
async fn scenario_intensity_exceeded() {
    let sup = supervisor::start(
        SupervisorOpts::new(Strategy::OneForOne)
            .intensity(RestartIntensity::new(3, Duration::from_millis(5000)))
            .child(cell_spec("victim")),
    )
    .await
    .unwrap();

    let crashes = Arc::new(Mutex::new(Vec::new()));
    let crash_log = Arc::clone(&crashes);
    let watched = sup.target().clone();
    let sub = procnest::subscribe(move |event| {
        if let LifecycleEvent::Crashed { target, error } = event {
            if target == &watched {
                crash_log.lock().push(error.to_string());
            }
        }
    });

    let mut current = current_ref(&sup, "victim").await;
    for _ in 0..3 {
        crash(&current);
        current = await_replacement(&sup, "victim", &current).await;
    }

    // The fourth crash blows the budget.
    crash(&current);
    let deadline = Instant::now() + Duration::from_secs(2);
    while sup.is_running() {
        assert!(Instant::now() <= deadline, "supervisor survived the storm");
        sleep(Duration::from_millis(10)).await;
    }

    assert!(!current.is_running());
    let observed = crashes.lock().clone();
    assert_eq!(observed.len(), 1);
    assert!(observed[0].contains("exceeded 3 restarts"));
    assert!(observed[0].contains("5s"));
    sub.unsubscribe();
}

// ============================================================================
// S5 — Shutdown timeout
// ============================================================================

#[tokio::test]
async fn scenario_shutdown_timeout_bound() {
    struct Stubborn;

    #[async_trait]
    impl GenServer for Stubborn {
        type Call = ();
        type Reply = ();
        type Cast = ();
        type Error = std::io::Error;

        async fn handle_call(&mut self, _request: ()) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn handle_cast(&mut self, _message: ()) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn terminate(&mut self, _reason: &ExitReason) {
            // Never resolves inside any sane grace period.
            sleep(Duration::from_secs(3600)).await;
        }
    }

    let spec = ChildSpec::new("stubborn", || async {
        let server = server::start(Stubborn, SpawnOpts::new()).await?;
        Ok(server.into())
    })
    .with_shutdown_timeout(Duration::from_millis(150));

    let sup = supervisor::start(SupervisorOpts::new(Strategy::OneForOne).child(spec))
        .await
        .unwrap();
    let child = current_ref(&sup, "stubborn").await;

    let began = Instant::now();
    sup.stop().await;
    assert!(began.elapsed() <= Duration::from_millis(500));
    assert!(!child.is_running());
    assert!(!sup.is_running());
}

// ============================================================================
// S6 — Simple-one-for-one batching
// ============================================================================

#[tokio::test]
async fn scenario_simple_one_for_one_batch() {
    let template = ChildTemplate::new(|arg| async move {
        let worker_id = arg
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let cell = server::start(ValueCell::new(worker_id), SpawnOpts::new()).await?;
        Ok(cell.into())
    });

    let sup = supervisor::start(
        SupervisorOpts::new(Strategy::SimpleOneForOne).template(template),
    )
    .await
    .unwrap();
    assert_eq!(sup.count_children().await.unwrap().specs, 0);

    for worker in ["w1", "w2", "w3"] {
        sup.start_template_child(template_arg(worker.to_string()))
            .await
            .unwrap();
    }
    assert_eq!(sup.count_children().await.unwrap().active, 3);

    // Crash one: it is replaced in its slot, the census is stable.
    let victim = sup.get_children().await.unwrap()[1].clone();
    let victim_ref = victim.current.unwrap();
    crash(&victim_ref);
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let counts = sup.count_children().await.unwrap();
        if counts.active == 3 {
            break;
        }
        assert!(Instant::now() <= deadline, "crashed worker was not replaced");
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sup.count_children().await.unwrap().specs, 3);

    // Deliberate termination removes the slot entirely: no auto-restart.
    let first = sup.get_children().await.unwrap()[0].clone();
    sup.terminate_child(first.id).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    let counts = sup.count_children().await.unwrap();
    assert_eq!(counts.specs, 2);
    assert_eq!(counts.active, 2);

    // Specs cannot be pushed into a simple_one_for_one supervisor.
    let error = sup.start_child(cell_spec("static")).await.unwrap_err();
    assert!(matches!(
        error,
        SupervisorError::InvalidSimpleOneForOneConfig { .. }
    ));

    sup.stop().await;
}
