use async_trait::async_trait;
use sos_core::{
    ChannelErrorKind, ChannelKind, ChannelResult, ChannelSendError, ChannelSet, ConfigError,
    DispatchChannel, DispatchNotice, EmergencyEvent, EmergencyReason, EmergencyTrigger,
    EventStatus, TriggerConfig, TriggerError, TriggerState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::{sleep, timeout, Instant};
use uuid::Uuid;

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail(ChannelErrorKind),
    Hang,
}

struct ScriptedChannel {
    kind: ChannelKind,
    identifier: String,
    delay: Duration,
    behavior: Behavior,
    calls: AtomicUsize,
    seen_statuses: Mutex<Vec<EventStatus>>,
}

impl ScriptedChannel {
    fn new(kind: ChannelKind, identifier: &str, delay_ms: u64, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            identifier: identifier.to_string(),
            delay: Duration::from_millis(delay_ms),
            behavior,
            calls: AtomicUsize::new(0),
            seen_statuses: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DispatchChannel for ScriptedChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn send(&self, event: &EmergencyEvent) -> ChannelResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_statuses
            .lock()
            .expect("status log lock")
            .push(event.status());
        sleep(self.delay).await;
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(kind) => Err(ChannelSendError::new(kind, "scripted failure")),
            Behavior::Hang => {
                sleep(Duration::from_secs(3_600)).await;
                Ok(())
            }
        }
    }
}

fn build_trigger(channels: &[Arc<ScriptedChannel>]) -> EmergencyTrigger {
    build_trigger_with(TriggerConfig::default(), channels)
}

fn build_trigger_with(
    config: TriggerConfig,
    channels: &[Arc<ScriptedChannel>],
) -> EmergencyTrigger {
    let set = ChannelSet::new(
        channels
            .iter()
            .map(|channel| Arc::clone(channel) as Arc<dyn DispatchChannel>)
            .collect(),
    )
    .expect("valid channel set");
    EmergencyTrigger::new(config, set).expect("valid trigger")
}

fn total_calls(channels: &[Arc<ScriptedChannel>]) -> usize {
    channels.iter().map(|channel| channel.calls()).sum()
}

fn standard_channels() -> Vec<Arc<ScriptedChannel>> {
    vec![
        ScriptedChannel::new(ChannelKind::EmergencyServices, "112", 200, Behavior::Succeed),
        ScriptedChannel::new(ChannelKind::Contact, "+15550001234", 100, Behavior::Succeed),
    ]
}

#[tokio::test(start_paused = true)]
async fn rapid_repeated_arm_only_first_succeeds() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);

    let first = trigger.arm(EmergencyReason::Stroke).expect("first arm");
    for _ in 0..10 {
        let err = trigger
            .arm(EmergencyReason::Stroke)
            .expect_err("repeated arm must be rejected");
        assert_eq!(err, TriggerError::AlreadyArmed { active: first });
    }
    assert_eq!(
        trigger.current_event().expect("event in slot").id(),
        first
    );

    let state = trigger
        .wait_for_terminal(first)
        .await
        .expect("event should settle");
    assert!(matches!(state, TriggerState::Resolved { .. }));
    for channel in &channels {
        assert_eq!(channel.calls(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn arm_is_rejected_while_dispatching() {
    let channels = vec![ScriptedChannel::new(
        ChannelKind::EmergencyServices,
        "112",
        2_000,
        Behavior::Succeed,
    )];
    let trigger = build_trigger(&channels);
    let first = trigger.arm(EmergencyReason::Fall).expect("first arm");

    sleep(Duration::from_millis(3_100)).await;
    assert!(matches!(trigger.state(), TriggerState::Dispatching { .. }));
    assert_eq!(
        trigger.arm(EmergencyReason::Fall),
        Err(TriggerError::AlreadyArmed { active: first })
    );

    trigger
        .wait_for_terminal(first)
        .await
        .expect("dispatch should settle");
    assert_eq!(total_calls(&channels), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_before_expiry_sends_nothing() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");

    sleep(Duration::from_millis(1_000)).await;
    trigger.cancel(event_id).expect("cancel while armed");

    sleep(Duration::from_secs(30)).await;
    assert_eq!(
        trigger.state(),
        TriggerState::Cancelled {
            event_id,
            reason: EmergencyReason::Stroke
        }
    );
    assert_eq!(total_calls(&channels), 0);
    assert!(trigger.notice().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_twice_is_idempotent() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");

    trigger.cancel(event_id).expect("first cancel");
    trigger.cancel(event_id).expect("second cancel is a no-op");
    let state = trigger
        .wait_for_terminal(event_id)
        .await
        .expect("cancelled is terminal");
    assert!(matches!(state, TriggerState::Cancelled { .. }));
}

#[tokio::test(start_paused = true)]
async fn cancel_after_dispatch_is_too_late_and_dispatch_completes() {
    let channels = vec![
        ScriptedChannel::new(ChannelKind::EmergencyServices, "112", 1_000, Behavior::Succeed),
        ScriptedChannel::new(ChannelKind::Clinician, "dr-house", 500, Behavior::Succeed),
    ];
    let trigger = build_trigger(&channels);
    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");

    sleep(Duration::from_millis(3_100)).await;
    let err = trigger
        .cancel(event_id)
        .expect_err("cancel after dispatch must fail");
    assert_eq!(
        err,
        TriggerError::TooLate {
            event_id,
            status: EventStatus::Dispatching
        }
    );

    let state = trigger
        .wait_for_terminal(event_id)
        .await
        .expect("in-flight dispatch should complete");
    let result = state.dispatch_result().expect("resolved carries result");
    assert!(result.fully_succeeded());

    assert_eq!(
        trigger.cancel(event_id),
        Err(TriggerError::TooLate {
            event_id,
            status: EventStatus::Resolved
        })
    );
}

#[tokio::test(start_paused = true)]
async fn mismatched_cancel_is_stale() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);

    let unknown = Uuid::new_v4();
    assert_eq!(
        trigger.cancel(unknown),
        Err(TriggerError::StaleEvent {
            requested: unknown,
            active: None
        })
    );

    let event_id = trigger.arm(EmergencyReason::OtherEmergency).expect("arm");
    assert_eq!(
        trigger.cancel(unknown),
        Err(TriggerError::StaleEvent {
            requested: unknown,
            active: Some(event_id)
        })
    );
    assert!(matches!(trigger.state(), TriggerState::Armed { .. }));
}

#[tokio::test(start_paused = true)]
async fn channels_only_see_dispatching_events() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");
    trigger
        .wait_for_terminal(event_id)
        .await
        .expect("event should settle");

    for channel in &channels {
        let statuses = channel.seen_statuses.lock().expect("status log lock");
        assert_eq!(statuses.as_slice(), &[EventStatus::Dispatching]);
    }
}

#[tokio::test(start_paused = true)]
async fn mixed_channels_settle_after_slowest_timeout() {
    let channels = vec![
        ScriptedChannel::new(ChannelKind::EmergencyServices, "112", 200, Behavior::Succeed),
        ScriptedChannel::new(
            ChannelKind::Contact,
            "+15550001234",
            100,
            Behavior::Fail(ChannelErrorKind::TransportFailure),
        ),
        ScriptedChannel::new(ChannelKind::Clinician, "dr-1", 0, Behavior::Hang),
    ];
    let trigger = build_trigger(&channels);

    let started = Instant::now();
    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");
    let state = trigger
        .wait_for_terminal(event_id)
        .await
        .expect("event should settle");
    let elapsed = started.elapsed();

    // 3000 ms countdown + 5000 ms clinician timeout.
    assert!(elapsed >= Duration::from_millis(8_000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(8_100), "elapsed {elapsed:?}");

    let result = state.dispatch_result().expect("resolved carries result");
    let outcomes = result.outcomes();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].succeeded);
    assert_eq!(
        outcomes[1].error_kind,
        Some(ChannelErrorKind::TransportFailure)
    );
    assert_eq!(outcomes[2].error_kind, Some(ChannelErrorKind::Timeout));
    assert!(result.succeeded());

    let notice = trigger.notice().expect("resolved state has a notice");
    assert!(notice.help_notified());
}

#[tokio::test(start_paused = true)]
async fn all_channels_failing_still_resolves_with_fallback_notice() {
    let channels = vec![
        ScriptedChannel::new(
            ChannelKind::EmergencyServices,
            "112",
            50,
            Behavior::Fail(ChannelErrorKind::Rejected),
        ),
        ScriptedChannel::new(
            ChannelKind::Contact,
            "mom",
            50,
            Behavior::Fail(ChannelErrorKind::TransportFailure),
        ),
    ];
    let trigger = build_trigger(&channels);
    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");
    let state = trigger
        .wait_for_terminal(event_id)
        .await
        .expect("event should settle");

    let result = state.dispatch_result().expect("resolved carries result");
    assert!(!result.succeeded());
    assert_eq!(
        trigger.notice(),
        Some(DispatchNotice::AllFailed {
            fallback_number: "112".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn terminal_state_is_observed_without_recomputation() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");
    trigger
        .wait_for_terminal(event_id)
        .await
        .expect("event should settle");

    let first = trigger.state();
    sleep(Duration::from_secs(60)).await;
    let second = trigger.state();
    let again = trigger
        .wait_for_terminal(event_id)
        .await
        .expect("terminal state should be returned immediately");

    let first_result = first.dispatch_result().expect("first read");
    let second_result = second.dispatch_result().expect("second read");
    let third_result = again.dispatch_result().expect("third read");
    assert!(Arc::ptr_eq(first_result, second_result));
    assert!(Arc::ptr_eq(first_result, third_result));
    assert_eq!(total_calls(&channels), channels.len());
}

#[tokio::test(start_paused = true)]
async fn watcher_sees_countdown_then_dispatch_then_resolution() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let mut watcher = trigger.subscribe();
    assert_eq!(watcher.current(), TriggerState::Idle);

    let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");
    let mut countdown = Vec::new();
    let mut saw_dispatching = false;
    loop {
        let state = watcher.changed().await.expect("trigger alive");
        if let Some(secs) = state.countdown_display_secs() {
            countdown.push(secs);
        }
        if matches!(state, TriggerState::Dispatching { .. }) {
            saw_dispatching = true;
        }
        if state.is_terminal() {
            assert_eq!(state.event_id(), Some(event_id));
            assert!(matches!(state, TriggerState::Resolved { .. }));
            break;
        }
    }
    assert_eq!(countdown, vec![3, 2, 1]);
    assert!(saw_dispatching);
}

#[tokio::test(start_paused = true)]
async fn acknowledge_releases_terminal_event_and_allows_rearm() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let first = trigger.arm(EmergencyReason::Stroke).expect("arm");

    assert!(matches!(
        trigger.acknowledge(first),
        Err(TriggerError::NotTerminal {
            status: EventStatus::Armed,
            ..
        })
    ));

    trigger.cancel(first).expect("cancel");
    trigger.acknowledge(first).expect("acknowledge cancelled event");
    assert_eq!(trigger.state(), TriggerState::Idle);
    assert!(trigger.current_event().is_none());

    let second = trigger.arm(EmergencyReason::Fall).expect("re-arm after release");
    assert_ne!(first, second);
    assert!(matches!(
        trigger.wait_for_terminal(first).await,
        Err(TriggerError::StaleEvent { .. })
    ));
    assert!(matches!(
        trigger.acknowledge(first),
        Err(TriggerError::StaleEvent { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn new_arm_supersedes_resolved_event() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let first = trigger.arm(EmergencyReason::Stroke).expect("arm");
    trigger
        .wait_for_terminal(first)
        .await
        .expect("first event should settle");

    let second = trigger
        .arm(EmergencyReason::Stroke)
        .expect("terminal event does not block arm");
    assert_ne!(first, second);
    let state = trigger.state();
    assert_eq!(state.event_id(), Some(second));
    assert_eq!(state.countdown_display_secs(), Some(3));
}

#[test]
fn arm_outside_runtime_is_rejected_without_side_effects() {
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    assert_eq!(
        trigger.arm(EmergencyReason::Stroke),
        Err(TriggerError::RuntimeUnavailable)
    );
    assert_eq!(trigger.state(), TriggerState::Idle);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let channels = standard_channels();
    let set = ChannelSet::new(
        channels
            .iter()
            .map(|channel| Arc::clone(channel) as Arc<dyn DispatchChannel>)
            .collect(),
    )
    .expect("valid channel set");
    let config = TriggerConfig {
        countdown_ms: 0,
        ..TriggerConfig::default()
    };
    let err = EmergencyTrigger::new(config, set)
        .err()
        .expect("zero countdown must fail");
    assert_eq!(err, ConfigError::ZeroDuration("countdown_ms"));
}

#[tokio::test(start_paused = true)]
async fn uneven_countdown_dispatches_at_exact_deadline() {
    let channels = standard_channels();
    let config = TriggerConfig {
        countdown_ms: 2_500,
        ..TriggerConfig::default()
    };
    let trigger = build_trigger_with(config, &channels);
    let started = Instant::now();
    let event_id = trigger.arm(EmergencyReason::Fall).expect("arm");

    sleep(Duration::from_millis(2_400)).await;
    assert_eq!(trigger.state().countdown_display_secs(), Some(1));
    assert_eq!(total_calls(&channels), 0);

    sleep(Duration::from_millis(110)).await;
    assert!(matches!(trigger.state(), TriggerState::Dispatching { .. }));
    assert_eq!(total_calls(&channels), channels.len());

    trigger
        .wait_for_terminal(event_id)
        .await
        .expect("event should settle");
    // Slowest channel answers 200 ms after the 2.5 s deadline.
    assert!(started.elapsed() < Duration::from_millis(2_800));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_arms_from_many_tasks_admit_one_event() {
    const CALLERS: usize = 16;
    let channels = standard_channels();
    let trigger = build_trigger(&channels);
    let start_line = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let trigger = trigger.clone();
            let start_line = Arc::clone(&start_line);
            tokio::spawn(async move {
                start_line.wait().await;
                trigger.arm(EmergencyReason::Fall)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(CALLERS);
    for handle in handles {
        results.push(handle.await.expect("arm task should not panic"));
    }

    let winners: Vec<_> = results.iter().filter_map(|result| result.clone().ok()).collect();
    assert_eq!(winners.len(), 1);
    let winner = winners[0];
    for result in &results {
        if let Err(err) = result {
            assert_eq!(*err, TriggerError::AlreadyArmed { active: winner });
        }
    }
    assert_eq!(trigger.current_event().expect("event in slot").id(), winner);

    trigger.cancel(winner).expect("winner can be cancelled");
    assert_eq!(total_calls(&channels), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_racing_expiry_lands_on_exactly_one_side() {
    let channels = vec![
        ScriptedChannel::new(ChannelKind::EmergencyServices, "112", 2, Behavior::Succeed),
        ScriptedChannel::new(ChannelKind::Contact, "+15550001234", 1, Behavior::Succeed),
    ];
    let config = TriggerConfig {
        countdown_ms: 50,
        tick_interval_ms: 10,
        ..TriggerConfig::default()
    };
    let trigger = build_trigger_with(config, &channels);

    for round in 0..20u64 {
        let calls_before = total_calls(&channels);
        let event_id = trigger.arm(EmergencyReason::Stroke).expect("arm");
        sleep(Duration::from_millis(45 + round % 10)).await;

        let canceller = trigger.clone();
        let cancel = tokio::spawn(async move { canceller.cancel(event_id) })
            .await
            .expect("cancel task should not panic");
        let state = timeout(Duration::from_secs(5), trigger.wait_for_terminal(event_id))
            .await
            .expect("event should settle in time")
            .expect("event should stay observable");

        match state {
            TriggerState::Cancelled { .. } => {
                assert_eq!(cancel, Ok(()));
                sleep(Duration::from_millis(20)).await;
                assert_eq!(total_calls(&channels), calls_before);
            }
            TriggerState::Resolved { .. } => {
                assert!(matches!(cancel, Err(TriggerError::TooLate { .. })));
                assert_eq!(total_calls(&channels), calls_before + channels.len());
            }
            other => panic!("round {round}: non-terminal state {other:?}"),
        }
        trigger.acknowledge(event_id).expect("acknowledge terminal event");
    }
}
