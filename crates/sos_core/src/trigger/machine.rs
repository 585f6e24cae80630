//! Emergency trigger state machine.
//!
//! # Responsibility
//! - Own the single current-event slot and every transition of that event.
//! - Run the countdown clock and hand expired events to the coordinator.
//! - Publish every state change to subscribers for rendering.
//!
//! # Invariants
//! - At most one armed-or-dispatching event exists; a second `arm()` is
//!   rejected, never queued or merged.
//! - `armed -> dispatching` is the point of no return: no channel is sent
//!   to before it, and `cancel()` after it fails with `TooLate`.
//! - The coordinator is invoked exactly once per dispatched event.
//! - Terminal states are observed from the stored result, never recomputed.
//!
//! # See also
//! - `crate::dispatch::coordinator`

use crate::channel::set::ChannelSet;
use crate::config::{ConfigError, TriggerConfig};
use crate::dispatch::coordinator::DispatchCoordinator;
use crate::model::event::{EmergencyEvent, EmergencyReason, EventId, EventStatus};
use crate::model::notice::DispatchNotice;
use crate::model::now_epoch_ms;
use crate::model::outcome::DispatchResult;
use crate::trigger::error::{TriggerError, TriggerResult};
use crate::trigger::state::TriggerState;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Handle to the emergency trigger. Cheap to clone; clones share one slot.
#[derive(Clone)]
pub struct EmergencyTrigger {
    inner: Arc<TriggerInner>,
}

struct TriggerInner {
    config: TriggerConfig,
    coordinator: DispatchCoordinator,
    slot: watch::Sender<Option<EmergencyEvent>>,
    countdown_task: Mutex<Option<(EventId, AbortHandle)>>,
}

enum TickOutcome {
    Continue { remaining_ms: u64 },
    Expired(EmergencyEvent),
    Inactive,
}

impl EmergencyTrigger {
    /// Builds a trigger over an injected channel set.
    ///
    /// # Errors
    /// - Returns `ConfigError` when `config` does not validate.
    pub fn new(config: TriggerConfig, channels: ChannelSet) -> Result<Self, ConfigError> {
        config.validate()?;
        let coordinator = DispatchCoordinator::new(channels, config.channel_timeout());
        let (slot, _) = watch::channel(None);
        info!(
            "event=trigger_init module=trigger status=ok countdown_ms={} tick_ms={} channel_timeout_ms={} channels={}",
            config.countdown().as_millis(),
            config.tick_interval().as_millis(),
            coordinator.channel_timeout().as_millis(),
            coordinator.channels().len()
        );
        if !coordinator.channels().has_emergency_services() {
            warn!("event=trigger_init module=trigger status=degraded detail=no_emergency_services_channel");
        }
        Ok(Self {
            inner: Arc::new(TriggerInner {
                config,
                coordinator,
                slot,
                countdown_task: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.inner.config
    }

    /// Arms a new event and starts its countdown.
    ///
    /// # Errors
    /// - `AlreadyArmed` when an event is armed or dispatching; no event is created.
    /// - `RuntimeUnavailable` when called outside a tokio runtime.
    pub fn arm(&self, reason: EmergencyReason) -> TriggerResult<EventId> {
        let runtime = Handle::try_current().map_err(|_| {
            error!("event=trigger_arm module=trigger status=error error=runtime_unavailable");
            TriggerError::RuntimeUnavailable
        })?;

        let countdown_ms = self.inner.config.countdown_ms;
        let mut outcome = Err(TriggerError::RuntimeUnavailable);
        self.inner.slot.send_if_modified(|slot| {
            if let Some(active) = slot.as_ref().filter(|event| event.is_active()) {
                outcome = Err(TriggerError::AlreadyArmed {
                    active: active.id(),
                });
                return false;
            }
            let event = EmergencyEvent::arm(reason, countdown_ms, now_epoch_ms());
            outcome = Ok(event.id());
            *slot = Some(event);
            true
        });

        let event_id = match outcome {
            Ok(event_id) => event_id,
            Err(err) => {
                warn!(
                    "event=trigger_arm module=trigger status=rejected reason={} error={}",
                    reason, err
                );
                return Err(err);
            }
        };

        let task = runtime.spawn(run_countdown(Arc::clone(&self.inner), event_id));
        *self.inner.countdown_task.lock() = Some((event_id, task.abort_handle()));
        info!(
            "event=trigger_arm module=trigger status=ok event_id={} reason={} countdown_ms={}",
            event_id, reason, countdown_ms
        );
        Ok(event_id)
    }

    /// Cancels the armed event and stops its countdown.
    ///
    /// Cancelling an already-cancelled event with the same id is a no-op.
    ///
    /// # Errors
    /// - `StaleEvent` when `event_id` is not the event in the slot.
    /// - `TooLate` when the event is dispatching or resolved.
    pub fn cancel(&self, event_id: EventId) -> TriggerResult<()> {
        let mut outcome = Ok(());
        let mut cancelled = false;
        self.inner.slot.send_if_modified(|slot| {
            let Some(event) = slot.as_mut() else {
                outcome = Err(TriggerError::StaleEvent {
                    requested: event_id,
                    active: None,
                });
                return false;
            };
            if event.id() != event_id {
                outcome = Err(TriggerError::StaleEvent {
                    requested: event_id,
                    active: Some(event.id()),
                });
                return false;
            }
            match event.status() {
                EventStatus::Armed => match event.cancel() {
                    Ok(()) => {
                        cancelled = true;
                        true
                    }
                    Err(err) => {
                        error!(
                            "event=invariant_violation module=trigger status=error detail={}",
                            err
                        );
                        outcome = Err(TriggerError::TooLate {
                            event_id,
                            status: event.status(),
                        });
                        false
                    }
                },
                EventStatus::Cancelled => false,
                status @ (EventStatus::Dispatching | EventStatus::Resolved) => {
                    outcome = Err(TriggerError::TooLate { event_id, status });
                    false
                }
            }
        });

        match &outcome {
            Ok(()) if cancelled => {
                self.inner.stop_countdown(event_id);
                info!(
                    "event=trigger_cancel module=trigger status=ok event_id={}",
                    event_id
                );
            }
            Ok(()) => {}
            Err(err) => warn!(
                "event=trigger_cancel module=trigger status=rejected event_id={} error={}",
                event_id, err
            ),
        }
        outcome
    }

    /// Releases a terminal event after the interface has shown it.
    ///
    /// # Errors
    /// - `StaleEvent` when `event_id` is not the event in the slot.
    /// - `NotTerminal` when the event is still armed or dispatching.
    pub fn acknowledge(&self, event_id: EventId) -> TriggerResult<()> {
        let mut outcome = Ok(());
        self.inner.slot.send_if_modified(|slot| {
            let Some(event) = slot.as_ref() else {
                outcome = Err(TriggerError::StaleEvent {
                    requested: event_id,
                    active: None,
                });
                return false;
            };
            if event.id() != event_id {
                outcome = Err(TriggerError::StaleEvent {
                    requested: event_id,
                    active: Some(event.id()),
                });
                return false;
            }
            if !event.status().is_terminal() {
                outcome = Err(TriggerError::NotTerminal {
                    event_id,
                    status: event.status(),
                });
                return false;
            }
            *slot = None;
            true
        });
        if outcome.is_ok() {
            info!(
                "event=trigger_acknowledge module=trigger status=ok event_id={}",
                event_id
            );
        }
        outcome
    }

    /// Current render view.
    pub fn state(&self) -> TriggerState {
        TriggerState::from_slot(self.inner.slot.borrow().as_ref())
    }

    /// Snapshot of the event in the slot, if any.
    pub fn current_event(&self) -> Option<EmergencyEvent> {
        self.inner.slot.borrow().clone()
    }

    /// User-facing notice for a resolved state; `None` otherwise.
    pub fn notice(&self) -> Option<DispatchNotice> {
        self.state().dispatch_result().map(|result| {
            DispatchNotice::from_result(result, self.inner.config.fallback_number.trim())
        })
    }

    pub fn subscribe(&self) -> StateWatcher {
        StateWatcher {
            rx: self.inner.slot.subscribe(),
        }
    }

    /// Waits until `event_id` reaches `resolved` or `cancelled`.
    ///
    /// # Errors
    /// - `StaleEvent` when the event left the slot without being observed
    ///   here (acknowledged and replaced), or never was in it.
    pub async fn wait_for_terminal(&self, event_id: EventId) -> TriggerResult<TriggerState> {
        let mut rx = self.inner.slot.subscribe();
        let state = {
            let slot = rx
                .wait_for(|slot| {
                    !slot
                        .as_ref()
                        .is_some_and(|event| event.id() == event_id && event.is_active())
                })
                .await
                .map_err(|_| TriggerError::StaleEvent {
                    requested: event_id,
                    active: None,
                })?;
            TriggerState::from_slot(slot.as_ref())
        };

        if state.is_terminal() && state.event_id() == Some(event_id) {
            Ok(state)
        } else {
            Err(TriggerError::StaleEvent {
                requested: event_id,
                active: state.event_id(),
            })
        }
    }
}

impl TriggerInner {
    /// Clock callback: consumes `elapsed_ms` of the countdown and performs
    /// the dispatch transition at zero.
    fn tick(&self, event_id: EventId, elapsed_ms: u64) -> TickOutcome {
        let mut outcome = TickOutcome::Inactive;
        self.slot.send_if_modified(|slot| {
            let Some(event) = slot
                .as_mut()
                .filter(|event| event.id() == event_id && event.status() == EventStatus::Armed)
            else {
                return false;
            };

            let remaining_ms = event.advance_countdown(elapsed_ms);
            if remaining_ms > 0 {
                outcome = TickOutcome::Continue { remaining_ms };
                return true;
            }
            match event.begin_dispatch() {
                Ok(()) => {
                    outcome = TickOutcome::Expired(event.clone());
                    true
                }
                Err(err) => {
                    error!(
                        "event=invariant_violation module=trigger status=error detail={}",
                        err
                    );
                    false
                }
            }
        });
        outcome
    }

    fn resolve(&self, result: DispatchResult) {
        let event_id = result.event_id();
        let succeeded = result.succeeded();
        let mut resolved = false;
        self.slot.send_if_modified(|slot| match slot.as_mut() {
            Some(event) if event.id() == event_id => match event.resolve(result) {
                Ok(()) => {
                    resolved = true;
                    true
                }
                Err(err) => {
                    error!(
                        "event=invariant_violation module=trigger status=error detail={}",
                        err
                    );
                    false
                }
            },
            _ => false,
        });

        if resolved {
            info!(
                "event=trigger_resolve module=trigger status={} event_id={}",
                if succeeded { "ok" } else { "all_channels_failed" },
                event_id
            );
        } else {
            error!(
                "event=invariant_violation module=trigger status=error detail=dispatching_event_left_slot event_id={}",
                event_id
            );
        }
    }

    fn stop_countdown(&self, event_id: EventId) {
        let mut task = self.countdown_task.lock();
        if task.as_ref().is_some_and(|(id, _)| *id == event_id) {
            if let Some((_, handle)) = task.take() {
                handle.abort();
            }
        }
    }

    fn release_countdown(&self, event_id: EventId) {
        let mut task = self.countdown_task.lock();
        if task.as_ref().is_some_and(|(id, _)| *id == event_id) {
            *task = None;
        }
    }
}

async fn run_countdown(inner: Arc<TriggerInner>, event_id: EventId) {
    let tick = inner.config.tick_interval();
    let mut step = tick.min(inner.config.countdown());
    loop {
        tokio::time::sleep(step).await;
        // Both durations are built from u64 millis, so this never truncates.
        match inner.tick(event_id, step.as_millis() as u64) {
            TickOutcome::Continue { remaining_ms } => {
                step = tick.min(Duration::from_millis(remaining_ms))
            }
            TickOutcome::Expired(event) => {
                info!(
                    "event=trigger_expire module=trigger status=ok event_id={}",
                    event_id
                );
                inner.release_countdown(event_id);
                // Dispatch runs outside the countdown task so no abort can reach it.
                let dispatcher = Arc::clone(&inner);
                tokio::spawn(async move {
                    let result = dispatcher.coordinator.dispatch(&event).await;
                    dispatcher.resolve(result);
                });
                return;
            }
            TickOutcome::Inactive => return,
        }
    }
}

/// Subscription to trigger state changes.
pub struct StateWatcher {
    rx: watch::Receiver<Option<EmergencyEvent>>,
}

impl StateWatcher {
    pub fn current(&self) -> TriggerState {
        TriggerState::from_slot(self.rx.borrow().as_ref())
    }

    /// Waits for the next change. `None` once the trigger is gone.
    pub async fn changed(&mut self) -> Option<TriggerState> {
        self.rx.changed().await.ok()?;
        let state = TriggerState::from_slot(self.rx.borrow_and_update().as_ref());
        Some(state)
    }
}
