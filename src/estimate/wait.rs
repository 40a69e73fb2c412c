//! Wait-time estimation
//!
//! Two estimates are derived from the same snapshot: how long until the
//! cluster drains enough to start a new job, and how long until the fast tier
//! has room for a given request.

use super::ledger::TierLedger;
use crate::queue::QueueSnapshot;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A time estimate that may be unsatisfiable
///
/// `Unsatisfiable` orders above every finite value and never takes part in
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Estimate {
    /// Known, finite time
    Finite(Duration),
    /// The request can never be served
    Unsatisfiable,
}

impl Estimate {
    /// No waiting at all
    pub const ZERO: Estimate = Estimate::Finite(Duration::ZERO);

    /// The finite value, if any
    pub fn finite(self) -> Option<Duration> {
        match self {
            Self::Finite(d) => Some(d),
            Self::Unsatisfiable => None,
        }
    }

    /// Whether this is the unsatisfiable estimate
    pub fn is_unsatisfiable(self) -> bool {
        matches!(self, Self::Unsatisfiable)
    }

    /// Add a finite duration; unsatisfiable stays unsatisfiable
    pub fn saturating_add(self, rhs: Duration) -> Self {
        match self {
            Self::Finite(d) => Self::Finite(d.saturating_add(rhs)),
            Self::Unsatisfiable => Self::Unsatisfiable,
        }
    }
}

impl From<Duration> for Estimate {
    fn from(d: Duration) -> Self {
        Self::Finite(d)
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(d) => write!(f, "{}", humantime::format_duration(*d)),
            Self::Unsatisfiable => f.write_str("unsatisfiable"),
        }
    }
}

/// Expected delay before a new job can start anywhere in the cluster
///
/// Takes the latest known end time, then appends the time limits of all jobs
/// whose end is not yet known, as if they ran one after another. Node-level
/// parallelism is ignored. With no known end time the chain starts at the
/// snapshot time.
pub fn cluster_wait(snapshot: &QueueSnapshot) -> Duration {
    let now = snapshot.taken_at();
    let jobs = snapshot.jobs();

    let latest_known_end = jobs.iter().filter_map(|j| j.end_time).max().unwrap_or(now);

    let unestimated = jobs
        .iter()
        .filter(|j| j.end_time.is_none())
        .fold(Duration::ZERO, |acc, j| acc.saturating_add(j.time_limit));

    let unestimated = TimeDelta::from_std(unestimated).unwrap_or(TimeDelta::MAX);
    (latest_known_end - now)
        .checked_add(&unestimated)
        .unwrap_or(TimeDelta::MAX)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Expected delay before the fast tier can hold `requested_capacity`
///
/// Unsatisfiable if the request exceeds the tier's total capacity. Zero if
/// enough capacity is free right now. Otherwise the summed residency of every
/// job currently holding a fast-tier request.
pub fn hps_wait(ledger: &TierLedger, requested_capacity: u64) -> Estimate {
    if requested_capacity > ledger.total_capacity() {
        return Estimate::Unsatisfiable;
    }

    if ledger.remaining() >= requested_capacity {
        return Estimate::ZERO;
    }

    Estimate::Finite(ledger.total_residency())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FastTierSpec;
    use crate::queue::{JobSnapshot, JobState};
    use crate::request::StorageRequest;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn job(id: u64, state: JobState, minutes: u64) -> JobSnapshot {
        JobSnapshot {
            id,
            state,
            end_time: None,
            time_limit: Duration::from_secs(minutes * 60),
            storage_request: None,
        }
    }

    fn ledger(jobs: Vec<JobSnapshot>) -> TierLedger {
        TierLedger::from_snapshot(&QueueSnapshot::from_jobs(jobs, now()), &FastTierSpec::default())
    }

    #[test]
    fn test_estimate_ordering() {
        let short = Estimate::Finite(Duration::from_secs(1));
        let long = Estimate::Finite(Duration::from_secs(u64::MAX));
        assert!(short < long);
        assert!(long < Estimate::Unsatisfiable);
        assert!(Estimate::ZERO < short);
    }

    #[test]
    fn test_estimate_add_and_display() {
        let wait = Estimate::Finite(Duration::from_secs(60)).saturating_add(Duration::from_secs(30));
        assert_eq!(wait.finite(), Some(Duration::from_secs(90)));
        assert_eq!(wait.to_string(), "1m 30s");

        let never = Estimate::Unsatisfiable.saturating_add(Duration::from_secs(30));
        assert!(never.is_unsatisfiable());
        assert_eq!(never.to_string(), "unsatisfiable");
    }

    #[test]
    fn test_cluster_wait_empty_queue() {
        assert_eq!(cluster_wait(&QueueSnapshot::empty(now())), Duration::ZERO);
    }

    #[test]
    fn test_cluster_wait_known_ends_only() {
        let mut a = job(1, JobState::Running, 60);
        a.end_time = Some(now() + TimeDelta::minutes(10));
        let mut b = job(2, JobState::Running, 60);
        b.end_time = Some(now() + TimeDelta::minutes(25));

        let snapshot = QueueSnapshot::from_jobs(vec![a, b], now());
        assert_eq!(cluster_wait(&snapshot), Duration::from_secs(25 * 60));
    }

    #[test]
    fn test_cluster_wait_appends_unestimated_jobs() {
        let mut running = job(1, JobState::Running, 60);
        running.end_time = Some(now() + TimeDelta::minutes(10));
        let pending = job(2, JobState::Pending, 30);
        let suspended = job(3, JobState::Suspended, 15);

        let snapshot = QueueSnapshot::from_jobs(vec![running, pending, suspended], now());
        assert_eq!(cluster_wait(&snapshot), Duration::from_secs(55 * 60));
    }

    #[test]
    fn test_cluster_wait_without_known_end() {
        let snapshot = QueueSnapshot::from_jobs(
            vec![job(1, JobState::Pending, 30), job(2, JobState::Pending, 30)],
            now(),
        );
        assert_eq!(cluster_wait(&snapshot), Duration::from_secs(3600));
    }

    #[test]
    fn test_cluster_wait_never_negative() {
        let mut finished = job(1, JobState::Running, 60);
        finished.end_time = Some(now() - TimeDelta::hours(2));
        let pending = job(2, JobState::Pending, 30);

        let snapshot = QueueSnapshot::from_jobs(vec![finished, pending], now());
        assert_eq!(cluster_wait(&snapshot), Duration::ZERO);
    }

    #[test]
    fn test_hps_wait_empty_queue() {
        let ledger = ledger(Vec::new());
        assert_eq!(hps_wait(&ledger, 100), Estimate::ZERO);
        assert_eq!(hps_wait(&ledger, 5120), Estimate::ZERO);
    }

    #[test]
    fn test_hps_wait_over_capacity() {
        let ledger = ledger(Vec::new());
        assert_eq!(hps_wait(&ledger, 6000), Estimate::Unsatisfiable);
        assert_eq!(hps_wait(&ledger, 5121), Estimate::Unsatisfiable);
    }

    #[test]
    fn test_hps_wait_room_available() {
        let mut holder = job(1, JobState::Pending, 30);
        holder.storage_request = Some(StorageRequest::new(5000, 0));
        let ledger = ledger(vec![holder]);

        assert_eq!(hps_wait(&ledger, 120), Estimate::ZERO);
        assert_eq!(hps_wait(&ledger, 121), Estimate::Finite(Duration::from_secs(1800)));
    }

    #[test]
    fn test_hps_wait_sums_holders_only() {
        let mut running = job(1, JobState::Running, 60);
        running.end_time = Some(now() + TimeDelta::minutes(20));
        running.storage_request = Some(StorageRequest::new(3000, 0));

        let mut pending = job(2, JobState::Pending, 45);
        pending.storage_request = Some(StorageRequest::new(2000, 0));

        let bystander = job(3, JobState::Pending, 600);

        let ledger = ledger(vec![running, pending, bystander]);
        assert_eq!(ledger.remaining(), 120);
        assert_eq!(hps_wait(&ledger, 1000), Estimate::Finite(Duration::from_secs(65 * 60)));
    }

    fn arb_job() -> impl Strategy<Value = JobSnapshot> {
        (
            0u64..1000,
            prop_oneof![
                Just(JobState::Pending),
                Just(JobState::Running),
                Just(JobState::Suspended)
            ],
            proptest::option::of(-120i64..600),
            1u64..600,
            proptest::option::of(0u64..4000),
        )
            .prop_map(|(id, state, end_offset, minutes, capacity)| JobSnapshot {
                id,
                state,
                end_time: end_offset.map(|m| now() + TimeDelta::minutes(m)),
                time_limit: Duration::from_secs(minutes * 60),
                storage_request: capacity.map(|c| StorageRequest::new(c, 0)),
            })
    }

    proptest! {
        #[test]
        fn prop_hps_wait_monotone_in_capacity(
            jobs in proptest::collection::vec(arb_job(), 0..20),
            a in 0u64..8000,
            b in 0u64..8000,
        ) {
            let ledger = ledger(jobs);
            let (small, large) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(hps_wait(&ledger, small) <= hps_wait(&ledger, large));
        }

        #[test]
        fn prop_cluster_wait_at_least_latest_end(jobs in proptest::collection::vec(arb_job(), 0..20)) {
            let snapshot = QueueSnapshot::from_jobs(jobs, now());
            let wait = cluster_wait(&snapshot);
            if let Some(latest) = snapshot.jobs().iter().filter_map(|j| j.end_time).max() {
                let until_latest = (latest - now()).to_std().unwrap_or(Duration::ZERO);
                prop_assert!(wait >= until_latest);
            }
        }
    }
}
