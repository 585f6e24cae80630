//! Multi-channel dispatch coordinator.
//!
//! # Responsibility
//! - Notify every configured channel concurrently and independently.
//! - Bound each attempt with the per-channel timeout.
//! - Aggregate settled attempts into one `DispatchResult`.
//!
//! # Invariants
//! - Returns only after every attempt has settled (success, failure, timeout).
//! - One channel's failure, panic or latency never affects another channel.
//! - Outcomes keep configured channel order.
//! - Attempts are never retried here.

use crate::channel::set::ChannelSet;
use crate::channel::DispatchChannel;
use crate::model::event::EmergencyEvent;
use crate::model::now_epoch_ms;
use crate::model::outcome::{ChannelErrorKind, ChannelOutcome, DispatchResult};
use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Fans one event out to the configured channel set.
#[derive(Clone)]
pub struct DispatchCoordinator {
    channels: ChannelSet,
    channel_timeout: Duration,
}

impl DispatchCoordinator {
    pub fn new(channels: ChannelSet, channel_timeout: Duration) -> Self {
        Self {
            channels,
            channel_timeout,
        }
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn channel_timeout(&self) -> Duration {
        self.channel_timeout
    }

    /// Sends `event` to every channel and waits for all attempts to settle.
    ///
    /// Each attempt runs on its own task so a channel that blocks or panics
    /// is contained. Must be called from within a tokio runtime.
    pub async fn dispatch(&self, event: &EmergencyEvent) -> DispatchResult {
        info!(
            "event=dispatch_start module=dispatch status=ok event_id={} channels={} timeout_ms={}",
            event.id(),
            self.channels.len(),
            self.channel_timeout.as_millis()
        );

        let shared_event = Arc::new(event.clone());
        let handles: Vec<_> = self
            .channels
            .iter()
            .map(|channel| {
                tokio::spawn(attempt(
                    Arc::clone(channel),
                    Arc::clone(&shared_event),
                    self.channel_timeout,
                ))
            })
            .collect();

        let settled = join_all(handles).await;
        let outcomes: Vec<ChannelOutcome> = settled
            .into_iter()
            .zip(self.channels.iter())
            .map(|(joined, channel)| match joined {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    let descriptor = channel.descriptor();
                    warn!(
                        "event=channel_send module=dispatch status=error channel={} target={} error=task_aborted panic={}",
                        descriptor.kind,
                        descriptor.masked_identifier(),
                        join_err.is_panic()
                    );
                    ChannelOutcome::failure(
                        descriptor,
                        ChannelErrorKind::TransportFailure,
                        "channel task aborted before completing",
                        now_epoch_ms(),
                    )
                }
            })
            .collect();

        let result = DispatchResult::new(event.id(), outcomes, now_epoch_ms());
        info!(
            "event=dispatch_settled module=dispatch status={} event_id={} succeeded={} failed={}",
            if result.succeeded() { "ok" } else { "error" },
            event.id(),
            result.succeeded_channels().len(),
            result.failed_channels().len()
        );
        result
    }
}

async fn attempt(
    channel: Arc<dyn DispatchChannel>,
    event: Arc<EmergencyEvent>,
    channel_timeout: Duration,
) -> ChannelOutcome {
    let descriptor = channel.descriptor();
    let outcome = match tokio::time::timeout(channel_timeout, channel.send(&event)).await {
        Ok(Ok(())) => ChannelOutcome::success(descriptor, now_epoch_ms()),
        Ok(Err(err)) => ChannelOutcome::failure(descriptor, err.kind, err.detail, now_epoch_ms()),
        Err(_elapsed) => ChannelOutcome::failure(
            descriptor,
            ChannelErrorKind::Timeout,
            format!("no response within {} ms", channel_timeout.as_millis()),
            now_epoch_ms(),
        ),
    };

    match outcome.error_kind {
        None => info!(
            "event=channel_send module=dispatch status=ok channel={} target={} event_id={}",
            outcome.channel.kind,
            outcome.channel.masked_identifier(),
            event.id()
        ),
        Some(kind) => warn!(
            "event=channel_send module=dispatch status=error channel={} target={} event_id={} error={}",
            outcome.channel.kind,
            outcome.channel.masked_identifier(),
            event.id(),
            kind
        ),
    }
    outcome
}
