//! Core logic for the emergency self-report trigger.
//! This crate is the single source of truth for arming, cancellation and
//! multi-channel dispatch invariants; interfaces only render its state.

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod trigger;

pub use channel::logging_channel::LoggingChannel;
pub use channel::set::{ChannelSet, ChannelSetError};
pub use channel::{ChannelResult, ChannelSendError, DispatchChannel};
pub use config::{ConfigError, TriggerConfig};
pub use dispatch::coordinator::DispatchCoordinator;
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::event::{
    parse_reason, EmergencyEvent, EmergencyReason, EventId, EventStatus, ReasonParseError,
};
pub use model::notice::DispatchNotice;
pub use model::outcome::{
    ChannelDescriptor, ChannelErrorKind, ChannelKind, ChannelOutcome, DispatchResult,
};
pub use trigger::error::{TriggerError, TriggerResult};
pub use trigger::machine::{EmergencyTrigger, StateWatcher};
pub use trigger::state::TriggerState;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
