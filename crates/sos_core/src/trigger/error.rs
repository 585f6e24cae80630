//! Trigger operation errors.
//!
//! All variants are recoverable and meant to be rendered as a no-op by the
//! interface; none of them indicates a lost or duplicated alert.

use crate::model::event::{EventId, EventStatus};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TriggerResult<T> = Result<T, TriggerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// `arm()` while another event is armed or dispatching.
    AlreadyArmed { active: EventId },
    /// Operation targeted an event that is not the one in the slot.
    StaleEvent {
        requested: EventId,
        active: Option<EventId>,
    },
    /// `cancel()` after the dispatch transition.
    TooLate { event_id: EventId, status: EventStatus },
    /// `acknowledge()` on an event that has not reached a terminal state.
    NotTerminal { event_id: EventId, status: EventStatus },
    /// `arm()` called outside a tokio runtime; nothing was armed.
    RuntimeUnavailable,
}

impl Display for TriggerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyArmed { active } => {
                write!(f, "an emergency event is already in progress: {active}")
            }
            Self::StaleEvent { requested, active } => match active {
                Some(active) => write!(
                    f,
                    "event {requested} is not the active event (active: {active})"
                ),
                None => write!(f, "event {requested} is not the active event (none active)"),
            },
            Self::TooLate { event_id, status } => write!(
                f,
                "event {event_id} can no longer be cancelled (status: {status})"
            ),
            Self::NotTerminal { event_id, status } => {
                write!(f, "event {event_id} has not finished (status: {status})")
            }
            Self::RuntimeUnavailable => {
                write!(f, "no async runtime available to run the countdown")
            }
        }
    }
}

impl Error for TriggerError {}
