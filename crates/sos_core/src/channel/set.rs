//! Ordered, validated channel configuration.

use crate::channel::DispatchChannel;
use crate::model::outcome::{ChannelDescriptor, ChannelKind};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Channel set validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSetError {
    /// No channel configured; every alert would be a silent failure.
    Empty,
    InvalidIdentifier {
        kind: ChannelKind,
        identifier: String,
    },
    Duplicate {
        kind: ChannelKind,
        identifier: String,
    },
}

impl Display for ChannelSetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "at least one dispatch channel must be configured"),
            Self::InvalidIdentifier { kind, identifier } => {
                write!(f, "{kind} channel identifier is invalid: `{identifier}`")
            }
            Self::Duplicate { kind, identifier } => {
                write!(f, "{kind} channel already configured: `{identifier}`")
            }
        }
    }
}

impl Error for ChannelSetError {}

/// Immutable list of injected channels, kept in configured order.
#[derive(Clone)]
pub struct ChannelSet {
    channels: Vec<Arc<dyn DispatchChannel>>,
}

impl ChannelSet {
    /// Validates and freezes the channel list.
    ///
    /// # Errors
    /// - `Empty` when `channels` is empty.
    /// - `InvalidIdentifier` when an identifier is blank or has control chars.
    /// - `Duplicate` when the same `(kind, identifier)` appears twice.
    pub fn new(channels: Vec<Arc<dyn DispatchChannel>>) -> Result<Self, ChannelSetError> {
        if channels.is_empty() {
            return Err(ChannelSetError::Empty);
        }

        let mut seen = BTreeSet::<(ChannelKind, String)>::new();
        for channel in &channels {
            let kind = channel.kind();
            let raw = channel.identifier();
            let identifier = raw.trim();
            if identifier.is_empty() || raw.chars().any(char::is_control) {
                return Err(ChannelSetError::InvalidIdentifier {
                    kind,
                    identifier: raw.escape_debug().to_string(),
                });
            }
            if !seen.insert((kind, identifier.to_string())) {
                return Err(ChannelSetError::Duplicate {
                    kind,
                    identifier: identifier.to_string(),
                });
            }
        }

        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DispatchChannel>> {
        self.channels.iter()
    }

    /// Descriptors in configured order.
    pub fn descriptors(&self) -> Vec<ChannelDescriptor> {
        self.channels.iter().map(|channel| channel.descriptor()).collect()
    }

    /// Whether a public emergency-services channel is configured.
    pub fn has_emergency_services(&self) -> bool {
        self.channels
            .iter()
            .any(|channel| channel.kind() == ChannelKind::EmergencyServices)
    }
}
