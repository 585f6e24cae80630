//! Render view of the trigger slot.

use crate::model::event::{EmergencyEvent, EmergencyReason, EventId, EventStatus};
use crate::model::outcome::DispatchResult;
use serde::Serialize;
use std::sync::Arc;

/// What the interface renders for the current slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TriggerState {
    Idle,
    Armed {
        event_id: EventId,
        reason: EmergencyReason,
        countdown_remaining_ms: u64,
    },
    Dispatching {
        event_id: EventId,
        reason: EmergencyReason,
    },
    Resolved {
        event_id: EventId,
        reason: EmergencyReason,
        result: Arc<DispatchResult>,
    },
    Cancelled {
        event_id: EventId,
        reason: EmergencyReason,
    },
}

impl TriggerState {
    pub(crate) fn from_slot(slot: Option<&EmergencyEvent>) -> Self {
        let Some(event) = slot else {
            return Self::Idle;
        };
        let event_id = event.id();
        let reason = event.reason();
        match (event.status(), event.dispatch_result()) {
            (EventStatus::Armed, _) => Self::Armed {
                event_id,
                reason,
                countdown_remaining_ms: event.countdown_remaining_ms(),
            },
            (EventStatus::Dispatching, _) => Self::Dispatching { event_id, reason },
            (EventStatus::Resolved, Some(result)) => Self::Resolved {
                event_id,
                reason,
                result: Arc::clone(result),
            },
            // Resolved always carries a result; fall back to dispatching
            // rather than fabricate one.
            (EventStatus::Resolved, None) => Self::Dispatching { event_id, reason },
            (EventStatus::Cancelled, _) => Self::Cancelled { event_id, reason },
        }
    }

    pub fn event_id(&self) -> Option<EventId> {
        match self {
            Self::Idle => None,
            Self::Armed { event_id, .. }
            | Self::Dispatching { event_id, .. }
            | Self::Resolved { event_id, .. }
            | Self::Cancelled { event_id, .. } => Some(*event_id),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved { .. } | Self::Cancelled { .. })
    }

    /// Whether `event_id` is armed or dispatching.
    pub fn is_active_for(&self, event_id: EventId) -> bool {
        match self {
            Self::Armed { event_id: id, .. } | Self::Dispatching { event_id: id, .. } => {
                *id == event_id
            }
            _ => false,
        }
    }

    /// Whole seconds left on the countdown, rounded up.
    ///
    /// `None` unless armed.
    pub fn countdown_display_secs(&self) -> Option<u64> {
        match self {
            Self::Armed {
                countdown_remaining_ms,
                ..
            } => Some(countdown_remaining_ms.div_ceil(1_000)),
            _ => None,
        }
    }

    pub fn dispatch_result(&self) -> Option<&Arc<DispatchResult>> {
        match self {
            Self::Resolved { result, .. } => Some(result),
            _ => None,
        }
    }
}
