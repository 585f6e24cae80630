//! Log-only channel.
//!
//! Records the alert in the core log and reports success. Performs no real
//! transport; used by the CLI demo and as a local audit trail.

use crate::channel::{ChannelResult, DispatchChannel};
use crate::model::event::EmergencyEvent;
use crate::model::outcome::{ChannelDescriptor, ChannelKind};
use async_trait::async_trait;
use log::warn;

pub struct LoggingChannel {
    kind: ChannelKind,
    identifier: String,
}

impl LoggingChannel {
    pub fn new(kind: ChannelKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }
}

#[async_trait]
impl DispatchChannel for LoggingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn send(&self, event: &EmergencyEvent) -> ChannelResult<()> {
        let descriptor = ChannelDescriptor::new(self.kind, self.identifier.as_str());
        warn!(
            "event=emergency_alert module=channel status=ok channel={} target={} event_id={} reason={}",
            self.kind,
            descriptor.masked_identifier(),
            event.id(),
            event.reason()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LoggingChannel;
    use crate::channel::DispatchChannel;
    use crate::model::event::{EmergencyEvent, EmergencyReason};
    use crate::model::outcome::ChannelKind;

    #[tokio::test]
    async fn always_reports_success() {
        let channel = LoggingChannel::new(ChannelKind::EmergencyServices, "112");
        let event = EmergencyEvent::arm(EmergencyReason::Stroke, 3_000, 0);
        channel.send(&event).await.expect("log channel never fails");
        assert_eq!(channel.descriptor().identifier, "112");
    }
}
