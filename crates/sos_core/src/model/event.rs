//! Emergency event domain model.
//!
//! # Responsibility
//! - Define the record for one user-initiated alert attempt.
//! - Provide the only lifecycle helpers allowed to move an event between states.
//!
//! # Invariants
//! - `id` is generated at arm time and never reused for another event.
//! - Status moves only along `armed -> dispatching -> resolved` or
//!   `armed -> cancelled`; `resolved` and `cancelled` are terminal.
//! - `dispatch_result` is `Some` iff status is `resolved`.

use crate::model::outcome::DispatchResult;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque unique token for one emergency event.
pub type EventId = Uuid;

/// Why the user raised the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyReason {
    Stroke,
    Fall,
    OtherEmergency,
}

impl EmergencyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stroke => "stroke",
            Self::Fall => "fall",
            Self::OtherEmergency => "other_emergency",
        }
    }
}

impl Display for EmergencyReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a reason from its stable string form.
///
/// Accepts `other` as a short alias for `other_emergency`.
pub fn parse_reason(value: &str) -> Result<EmergencyReason, ReasonParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "stroke" => Ok(EmergencyReason::Stroke),
        "fall" => Ok(EmergencyReason::Fall),
        "other_emergency" | "other" => Ok(EmergencyReason::OtherEmergency),
        "" => Err(ReasonParseError::Empty),
        other => Err(ReasonParseError::Unsupported(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonParseError {
    Empty,
    Unsupported(String),
}

impl Display for ReasonParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "emergency reason must not be empty"),
            Self::Unsupported(value) => write!(
                f,
                "unsupported emergency reason `{value}`; expected stroke|fall|other_emergency"
            ),
        }
    }
}

impl Error for ReasonParseError {}

/// Lifecycle status of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Countdown running; cancellable.
    Armed,
    /// Point of no return: channels are being notified.
    Dispatching,
    /// Dispatch settled; terminal.
    Resolved,
    /// User cancelled before expiry; terminal.
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Armed => "armed",
            Self::Dispatching => "dispatching",
            Self::Resolved => "resolved",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }

    /// Transition table for the trigger lifecycle.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (Self::Armed, Self::Dispatching)
                | (Self::Armed, Self::Cancelled)
                | (Self::Dispatching, Self::Resolved)
        )
    }
}

impl Display for EventStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected lifecycle move. Reaching this is a programming error in the
/// state machine, never a user-facing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub event_id: EventId,
    pub from: EventStatus,
    pub to: EventStatus,
}

impl Display for InvalidTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition for event {}: {} -> {}",
            self.event_id, self.from, self.to
        )
    }
}

impl Error for InvalidTransition {}

/// One user-initiated alert attempt.
///
/// Read-only outside the crate; the trigger state machine owns every copy
/// that is still allowed to change. Serialize-only: an event can be shown
/// to the interface but never rebuilt from outside input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyEvent {
    id: EventId,
    reason: EmergencyReason,
    /// Unix epoch milliseconds.
    armed_at_ms: i64,
    countdown_ms: u64,
    countdown_remaining_ms: u64,
    status: EventStatus,
    dispatch_result: Option<Arc<DispatchResult>>,
}

impl EmergencyEvent {
    pub(crate) fn arm(reason: EmergencyReason, countdown_ms: u64, armed_at_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reason,
            armed_at_ms,
            countdown_ms,
            countdown_remaining_ms: countdown_ms,
            status: EventStatus::Armed,
            dispatch_result: None,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn reason(&self) -> EmergencyReason {
        self.reason
    }

    pub fn armed_at_ms(&self) -> i64 {
        self.armed_at_ms
    }

    pub fn countdown_ms(&self) -> u64 {
        self.countdown_ms
    }

    pub fn countdown_remaining_ms(&self) -> u64 {
        self.countdown_remaining_ms
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn dispatch_result(&self) -> Option<&Arc<DispatchResult>> {
        self.dispatch_result.as_ref()
    }

    /// Whether the event still blocks a new `arm()`.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Consumes `elapsed_ms` of countdown and returns what is left.
    ///
    /// Has no effect unless the event is armed.
    pub(crate) fn advance_countdown(&mut self, elapsed_ms: u64) -> u64 {
        if self.status == EventStatus::Armed {
            self.countdown_remaining_ms = self.countdown_remaining_ms.saturating_sub(elapsed_ms);
        }
        self.countdown_remaining_ms
    }

    pub(crate) fn begin_dispatch(&mut self) -> Result<(), InvalidTransition> {
        self.transition(EventStatus::Dispatching)?;
        self.countdown_remaining_ms = 0;
        Ok(())
    }

    pub(crate) fn cancel(&mut self) -> Result<(), InvalidTransition> {
        self.transition(EventStatus::Cancelled)
    }

    pub(crate) fn resolve(&mut self, result: DispatchResult) -> Result<(), InvalidTransition> {
        if result.event_id() != self.id {
            return Err(InvalidTransition {
                event_id: self.id,
                from: self.status,
                to: EventStatus::Resolved,
            });
        }
        self.transition(EventStatus::Resolved)?;
        self.dispatch_result = Some(Arc::new(result));
        Ok(())
    }

    fn transition(&mut self, next: EventStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                event_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
