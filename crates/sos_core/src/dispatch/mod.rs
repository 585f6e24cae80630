//! Dispatch fan-out.
//!
//! The coordinator is invoked by the trigger exactly once per event, after
//! the event has entered `dispatching`. Callers never reach channels directly.

pub mod coordinator;
