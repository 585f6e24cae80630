//! Emergency trigger domain model.
//!
//! # Responsibility
//! - Define the event, outcome and notice shapes shared by the trigger and
//!   the dispatch coordinator.
//!
//! # Invariants
//! - Every alert attempt is identified by a fresh `EventId`.
//! - Aggregated dispatch results are immutable once constructed.

pub mod event;
pub mod notice;
pub mod outcome;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
