//! Immutable point-in-time view of the active job population

use super::source::{HostJob, HostJobState, QueueSource};
use crate::request::StorageRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// State of a job that still occupies (or will occupy) the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting to start
    Pending,
    /// Executing
    Running,
    /// Started, then suspended
    Suspended,
}

impl JobState {
    /// Active state for a host state, `None` for finished or unknown jobs
    pub fn from_host(state: HostJobState) -> Option<Self> {
        match state {
            HostJobState::Pending => Some(Self::Pending),
            HostJobState::Running => Some(Self::Running),
            HostJobState::Suspended => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// One active job as seen at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job identifier
    pub id: u64,
    /// Active state
    pub state: JobState,
    /// Known completion time
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock limit
    pub time_limit: Duration,
    /// Parsed fast-tier request, `None` if absent or malformed
    pub storage_request: Option<StorageRequest>,
}

impl JobSnapshot {
    /// Build from a host job, or `None` if the job is not active
    pub fn from_host(job: &HostJob) -> Option<Self> {
        let state = JobState::from_host(job.state)?;

        Some(Self {
            id: job.id,
            state,
            end_time: job.end_time,
            time_limit: job.time_limit(),
            storage_request: StorageRequest::parse_lenient(job.burst_buffer.as_deref()),
        })
    }

    /// Whether the job holds a fast-tier request
    pub fn holds_fast_tier(&self) -> bool {
        self.storage_request.is_some()
    }
}

/// Where a snapshot's contents came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", content = "reason", rename_all = "lowercase")]
pub enum SnapshotOrigin {
    /// Host answered with at least one active job
    Live,
    /// Host answered, no active jobs
    Empty,
    /// Host query failed; treated as an empty queue
    Unreachable(String),
}

/// Immutable view of all pending, running and suspended jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    taken_at: DateTime<Utc>,
    jobs: Vec<JobSnapshot>,
    origin: SnapshotOrigin,
}

impl QueueSnapshot {
    /// Query the source and keep the active jobs
    ///
    /// A failed query yields an empty snapshot marked `Unreachable`.
    pub fn capture<Q: QueueSource + ?Sized>(source: &Q, now: DateTime<Utc>) -> Self {
        match source.list_jobs() {
            Ok(host_jobs) => {
                let total = host_jobs.len();
                let snapshot = Self::from_host_jobs(&host_jobs, now);
                tracing::debug!(
                    "Captured {} active of {} jobs from {}",
                    snapshot.len(),
                    total,
                    source.name()
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!(
                    "Queue query via {} failed, assuming empty queue: {}",
                    source.name(),
                    e
                );
                Self {
                    taken_at: now,
                    jobs: Vec::new(),
                    origin: SnapshotOrigin::Unreachable(e.to_string()),
                }
            }
        }
    }

    /// Build a snapshot from host jobs, dropping inactive ones
    pub fn from_host_jobs(host_jobs: &[HostJob], now: DateTime<Utc>) -> Self {
        let jobs: Vec<JobSnapshot> = host_jobs.iter().filter_map(JobSnapshot::from_host).collect();
        Self::from_jobs(jobs, now)
    }

    /// Build a snapshot from already-active jobs
    pub fn from_jobs(jobs: Vec<JobSnapshot>, now: DateTime<Utc>) -> Self {
        let origin = if jobs.is_empty() {
            SnapshotOrigin::Empty
        } else {
            SnapshotOrigin::Live
        };

        Self {
            taken_at: now,
            jobs,
            origin,
        }
    }

    /// Snapshot with no jobs
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self::from_jobs(Vec::new(), now)
    }

    /// Time the snapshot was taken; estimators measure against it
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Active jobs
    pub fn jobs(&self) -> &[JobSnapshot] {
        &self.jobs
    }

    /// Jobs holding a fast-tier request
    pub fn fast_tier_holders(&self) -> impl Iterator<Item = &JobSnapshot> {
        self.jobs.iter().filter(|j| j.holds_fast_tier())
    }

    /// Where the contents came from
    pub fn origin(&self) -> &SnapshotOrigin {
        &self.origin
    }

    /// Number of active jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether there are no active jobs
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PlacementError, Result};
    use crate::queue::StaticQueue;
    use chrono::TimeZone;

    struct DownQueue;

    impl QueueSource for DownQueue {
        fn list_jobs(&self) -> Result<Vec<HostJob>> {
            Err(PlacementError::queue("slurmctld not responding"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_capture_filters_inactive_states() {
        let queue = StaticQueue::new(vec![
            HostJob::new(1, HostJobState::Pending, 10),
            HostJob::new(2, HostJobState::Running, 10),
            HostJob::new(3, HostJobState::Suspended, 10),
            HostJob::new(4, HostJobState::Completed, 10),
            HostJob::new(5, HostJobState::Cancelled, 10),
            HostJob::new(6, HostJobState::Completing, 10),
            HostJob::new(7, HostJobState::Unknown, 10),
        ]);

        let snapshot = QueueSnapshot::capture(&queue, now());
        let ids: Vec<u64> = snapshot.jobs().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(snapshot.origin(), &SnapshotOrigin::Live);
        assert_eq!(snapshot.taken_at(), now());
    }

    #[test]
    fn test_capture_parses_requests_leniently() {
        let queue = StaticQueue::new(vec![
            HostJob::new(1, HostJobState::Running, 10).with_burst_buffer("capacity=10 io=5"),
            HostJob::new(2, HostJobState::Running, 10).with_burst_buffer("capacity=garbage"),
            HostJob::new(3, HostJobState::Pending, 10),
        ]);

        let snapshot = QueueSnapshot::capture(&queue, now());
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.jobs()[0].storage_request, Some(StorageRequest::new(10, 5)));
        assert_eq!(snapshot.jobs()[1].storage_request, None);
        assert_eq!(snapshot.fast_tier_holders().count(), 1);
        assert_eq!(snapshot.jobs()[2].time_limit, Duration::from_secs(600));
    }

    #[test]
    fn test_capture_empty_queue() {
        let queue = StaticQueue::new(vec![HostJob::new(1, HostJobState::Completed, 10)]);
        let snapshot = QueueSnapshot::capture(&queue, now());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.origin(), &SnapshotOrigin::Empty);
    }

    #[test]
    fn test_capture_unreachable_degrades_to_empty() {
        let snapshot = QueueSnapshot::capture(&DownQueue, now());
        assert!(snapshot.is_empty());
        match snapshot.origin() {
            SnapshotOrigin::Unreachable(reason) => assert!(reason.contains("not responding")),
            other => panic!("unexpected origin {:?}", other),
        }
    }

    #[test]
    fn test_origin_serialization() {
        let json = serde_json::to_string(&SnapshotOrigin::Unreachable("down".into())).unwrap();
        assert_eq!(json, r#"{"origin":"unreachable","reason":"down"}"#);
        let json = serde_json::to_string(&SnapshotOrigin::Empty).unwrap();
        assert_eq!(json, r#"{"origin":"empty"}"#);
    }
}
