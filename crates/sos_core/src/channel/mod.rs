//! Notification channel contracts.
//!
//! # Responsibility
//! - Define the SPI every external transport (telephony, push, SMS) implements.
//! - Keep transport details outside core; core only sees settled results.
//!
//! # Invariants
//! - Channels are injected by the caller and never mutated by core.
//! - A channel owns its own retry policy; core never retries a send.

pub mod logging_channel;
pub mod set;

use crate::logging::sanitize_message;
use crate::model::event::EmergencyEvent;
use crate::model::outcome::{ChannelDescriptor, ChannelErrorKind, ChannelKind};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_SEND_ERROR_DETAIL_CHARS: usize = 200;

pub type ChannelResult<T> = Result<T, ChannelSendError>;

/// Failure reported by a channel transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSendError {
    pub kind: ChannelErrorKind,
    /// Single-line, length-capped diagnostic detail.
    pub detail: String,
}

impl ChannelSendError {
    pub fn new(kind: ChannelErrorKind, detail: impl AsRef<str>) -> Self {
        Self {
            kind,
            detail: sanitize_message(detail.as_ref(), MAX_SEND_ERROR_DETAIL_CHARS),
        }
    }

    pub fn transport(detail: impl AsRef<str>) -> Self {
        Self::new(ChannelErrorKind::TransportFailure, detail)
    }

    pub fn rejected(detail: impl AsRef<str>) -> Self {
        Self::new(ChannelErrorKind::Rejected, detail)
    }
}

impl Display for ChannelSendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel send failed ({}): {}", self.kind, self.detail)
    }
}

impl Error for ChannelSendError {}

/// One notification target.
///
/// `send` resolves once the transport has either delivered or given up.
/// Implementations must not block the executor thread.
#[async_trait]
pub trait DispatchChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Opaque contact handle (phone number, contact record, clinician id).
    fn identifier(&self) -> &str;

    async fn send(&self, event: &EmergencyEvent) -> ChannelResult<()>;

    fn descriptor(&self) -> ChannelDescriptor {
        ChannelDescriptor::new(self.kind(), self.identifier())
    }
}
