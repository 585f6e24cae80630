//! Emergency trigger lifecycle.
//!
//! # Responsibility
//! - Arm, count down, cancel and dispatch one emergency event at a time.
//! - Expose a read-only render view and change subscription to the interface.
//!
//! # Invariants
//! - Only the state machine mutates the current-event slot.

pub mod error;
pub mod machine;
pub mod state;
