//! Tier placement: decision rule, allocation and the serialized engine

mod allocator;
mod decision;
mod engine;
pub mod legacy;

pub use allocator::{allocate, fast_tier_time_limit, JobDescriptor, JobRecord};
pub use decision::{decide, transfer_time, Decision, DecisionReason, Tier};
pub use engine::{Placement, PlacementEngine};
pub use legacy::{legacy_decide, DiskSpaceProbe, FixedSpaceProbe, SpaceProbe};
