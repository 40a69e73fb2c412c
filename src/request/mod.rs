//! Storage request parsing
//!
//! Turns a job's free-form burst-buffer specification into a structured
//! fast-tier request.

mod burst_buffer;

pub use burst_buffer::*;
