//! Channel outcome and dispatch aggregate model.
//!
//! # Responsibility
//! - Describe one channel's send attempt as a settled `ChannelOutcome`.
//! - Aggregate all outcomes for one event into an immutable `DispatchResult`.
//!
//! # Invariants
//! - Exactly one `DispatchResult` exists per dispatched event.
//! - Outcomes are stored in configured channel order, not completion order.
//! - `DispatchResult::succeeded()` is true iff at least one outcome succeeded.

use crate::model::event::EventId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Category of notification target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Ambulance / public emergency number.
    EmergencyServices,
    /// Family member or other trusted person.
    Contact,
    /// Attending physician.
    Clinician,
}

impl ChannelKind {
    /// Stable string id used in logs and serialized payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmergencyServices => "emergency_services",
            Self::Contact => "contact",
            Self::Clinician => "clinician",
        }
    }

    /// User-facing short label.
    pub fn label(self) -> &'static str {
        match self {
            Self::EmergencyServices => "emergency services",
            Self::Contact => "emergency contact",
            Self::Clinician => "clinician",
        }
    }
}

impl Display for ChannelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel-local failure classification.
///
/// Never escalated into a core failure; aggregated into `DispatchResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelErrorKind {
    /// Attempt exceeded the per-channel timeout.
    Timeout,
    /// Transport could not deliver (network, telephony, crashed sender).
    TransportFailure,
    /// Remote side refused the notification.
    Rejected,
}

impl ChannelErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::TransportFailure => "transport_failure",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for ChannelErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one configured channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub kind: ChannelKind,
    /// Opaque contact handle (phone number, contact record, clinician id).
    pub identifier: String,
}

impl ChannelDescriptor {
    pub fn new(kind: ChannelKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }

    /// Identifier with everything but the last four characters masked.
    ///
    /// Log lines must use this form; raw handles are personal data.
    pub fn masked_identifier(&self) -> String {
        let chars: Vec<char> = self.identifier.chars().collect();
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        let mut masked = "*".repeat(hidden);
        masked.extend(&chars[hidden..]);
        masked
    }
}

/// Settled result of one channel send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel: ChannelDescriptor,
    pub succeeded: bool,
    /// `None` iff `succeeded`.
    pub error_kind: Option<ChannelErrorKind>,
    /// Sanitized diagnostic detail for failed attempts.
    pub detail: Option<String>,
    /// Unix epoch milliseconds.
    pub completed_at_ms: i64,
}

impl ChannelOutcome {
    pub fn success(channel: ChannelDescriptor, completed_at_ms: i64) -> Self {
        Self {
            channel,
            succeeded: true,
            error_kind: None,
            detail: None,
            completed_at_ms,
        }
    }

    pub fn failure(
        channel: ChannelDescriptor,
        error_kind: ChannelErrorKind,
        detail: impl Into<String>,
        completed_at_ms: i64,
    ) -> Self {
        Self {
            channel,
            succeeded: false,
            error_kind: Some(error_kind),
            detail: Some(detail.into()),
            completed_at_ms,
        }
    }
}

/// Aggregate of every channel outcome for one event.
///
/// Fields are private; the value is immutable once built by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    event_id: EventId,
    outcomes: Vec<ChannelOutcome>,
    completed_at_ms: i64,
}

impl DispatchResult {
    pub(crate) fn new(event_id: EventId, outcomes: Vec<ChannelOutcome>, completed_at_ms: i64) -> Self {
        Self {
            event_id,
            outcomes,
            completed_at_ms,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Outcomes in configured channel order.
    pub fn outcomes(&self) -> &[ChannelOutcome] {
        &self.outcomes
    }

    pub fn completed_at_ms(&self) -> i64 {
        self.completed_at_ms
    }

    /// True iff at least one channel succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.succeeded)
    }

    /// True iff every channel succeeded.
    pub fn fully_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|outcome| outcome.succeeded)
    }

    pub fn succeeded_channels(&self) -> Vec<&ChannelDescriptor> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.succeeded)
            .map(|outcome| &outcome.channel)
            .collect()
    }

    pub fn failed_channels(&self) -> Vec<&ChannelDescriptor> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded)
            .map(|outcome| &outcome.channel)
            .collect()
    }
}
