//! Fast-tier capacity ledger

use crate::config::FastTierSpec;
use crate::queue::{JobSnapshot, JobState, QueueSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// One job's share of the fast tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    /// Job holding the request
    pub job_id: u64,
    /// Capacity it holds (MiB)
    pub capacity: u64,
    /// How much longer it is expected to hold it
    pub residency: Duration,
}

impl Occupancy {
    /// Occupancy of a job, `None` if it holds no fast-tier request
    ///
    /// Running jobs hold the tier until their end time (their time limit if
    /// the end is unknown); queued jobs for their full time limit.
    pub fn of(job: &JobSnapshot, now: DateTime<Utc>) -> Option<Self> {
        let request = job.storage_request?;

        let residency = match (job.state, job.end_time) {
            (JobState::Running, Some(end)) => (end - now).to_std().unwrap_or(Duration::ZERO),
            (JobState::Running, None) | (JobState::Pending, _) | (JobState::Suspended, _) => {
                job.time_limit
            }
        };

        Some(Self {
            job_id: job.id,
            capacity: request.capacity,
            residency,
        })
    }
}

/// Committed fast-tier capacity derived from a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct TierLedger {
    total_capacity: u64,
    committed: u64,
    occupancy: Vec<Occupancy>,
}

impl TierLedger {
    /// Account every fast-tier request in the snapshot
    pub fn from_snapshot(snapshot: &QueueSnapshot, hps: &FastTierSpec) -> Self {
        let now = snapshot.taken_at();
        let occupancy: Vec<Occupancy> = snapshot
            .fast_tier_holders()
            .filter_map(|job| Occupancy::of(job, now))
            .collect();

        let committed = occupancy
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.capacity));

        Self {
            total_capacity: hps.total_capacity,
            committed,
            occupancy,
        }
    }

    /// Total fast-tier capacity
    pub fn total_capacity(&self) -> u64 {
        self.total_capacity
    }

    /// Capacity claimed by active jobs (may exceed the total)
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Capacity still free, never negative
    pub fn remaining(&self) -> u64 {
        self.total_capacity.saturating_sub(self.committed)
    }

    /// Per-job occupancy
    pub fn occupancy(&self) -> &[Occupancy] {
        &self.occupancy
    }

    /// Sum of all holders' residency times
    pub fn total_residency(&self) -> Duration {
        self.occupancy
            .iter()
            .fold(Duration::ZERO, |acc, o| acc.saturating_add(o.residency))
    }
}
