//! Queue snapshot provider
//!
//! Abstracts the host scheduler's job list behind [`QueueSource`] and turns
//! it into an immutable [`QueueSnapshot`] for one placement decision.

mod snapshot;
mod source;
pub mod slurm;

pub use snapshot::*;
pub use source::*;
pub use slurm::SqueueQueue;
