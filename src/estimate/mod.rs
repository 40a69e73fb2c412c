//! Queue contention estimation
//!
//! Derives fast-tier occupancy and expected queueing delays from a
//! [`QueueSnapshot`](crate::queue::QueueSnapshot). Everything here is pure and
//! recomputed for every decision.

mod ledger;
mod wait;

pub use ledger::*;
pub use wait::*;
