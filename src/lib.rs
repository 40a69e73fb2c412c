//! # TierPlace - Storage-Tier Placement for HPC Job Submissions
//!
//! TierPlace decides, at submission time, whether a batch job should keep its
//! working data on the large, slow shared tier (LPS) or on the small, fast
//! tier (HPS). It projects the job's completion time on both tiers from a
//! snapshot of the scheduler queue and picks the one that finishes first.
//!
//! ## Features
//!
//! - **Burst-Buffer Parsing**: `capacity=<MiB> io=<MB>` job requests
//! - **Queue Snapshots**: Live `squeue --json`, JSON files or in-memory queues
//! - **Contention Estimates**: Cluster-wide and fast-tier queueing delay
//! - **Completion-Time Projection**: Wait + run time + transfer time per tier
//! - **Time-Limit Rescaling**: Shorter limits for jobs moved to the fast tier
//! - **Serialized Decisions**: One decision at a time per engine
//! - **Legacy Policy**: Free-space threshold rule with fixed tier speeds
//!
//! ## Quick Start
//!
//! ```no_run
//! use tierplace::config::TierConfig;
//! use tierplace::placement::{JobDescriptor, PlacementEngine};
//! use tierplace::queue::SqueueQueue;
//!
//! let engine = PlacementEngine::new(TierConfig::default(), SqueueQueue::new());
//!
//! let mut job = JobDescriptor::new()
//!     .with_time_limit_minutes(10)
//!     .with_burst_buffer("capacity=100 io=600");
//!
//! let placement = engine.place(&mut job);
//! println!("{} ({:?})", placement.decision.tier, placement.decision.reason);
//! ```
//!
//! ## Inspecting Contention
//!
//! ```no_run
//! use tierplace::config::TierConfig;
//! use tierplace::estimate::{cluster_wait, hps_wait, TierLedger};
//! use tierplace::queue::{JsonFileQueue, QueueSnapshot};
//!
//! let config = TierConfig::default();
//! let snapshot = QueueSnapshot::capture(&JsonFileQueue::new("queue.json"), chrono::Utc::now());
//! let ledger = TierLedger::from_snapshot(&snapshot, &config.hps);
//!
//! println!("Cluster wait: {:?}", cluster_wait(&snapshot));
//! println!("HPS wait for 1 GiB: {}", hps_wait(&ledger, 1024));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod estimate;
pub mod placement;
pub mod queue;
pub mod request;

// Re-export commonly used types
pub use config::TierConfig;
pub use error::{PlacementError, Result};
pub use placement::{Decision, Placement, PlacementEngine, Tier};
pub use request::StorageRequest;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use tierplace::prelude::*;
    //! ```

    pub use crate::config::{PlacementMode, TierConfig};
    pub use crate::error::{PlacementError, Result};
    pub use crate::estimate::{cluster_wait, hps_wait, Estimate, TierLedger};
    pub use crate::placement::{
        allocate, decide, Decision, DecisionReason, JobDescriptor, JobRecord, Placement,
        PlacementEngine, Tier,
    };
    pub use crate::queue::{
        HostJob, HostJobState, JsonFileQueue, QueueSnapshot, QueueSource, SnapshotOrigin,
        SqueueQueue, StaticQueue,
    };
    pub use crate::request::StorageRequest;
}
