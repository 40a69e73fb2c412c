//! Serialized placement entry point
//!
//! [`PlacementEngine::place`] runs snapshot, parse, estimate, decide and
//! allocate for one job while holding a single lock, so two submissions can
//! never both see the same free fast-tier capacity and both claim it.

use super::allocator::{allocate, JobRecord};
use super::decision::{decide, Decision};
use super::legacy::{legacy_decide, DiskSpaceProbe, SpaceProbe};
use crate::config::{PlacementMode, TierConfig};
use crate::error::Result;
use crate::estimate::{cluster_wait, hps_wait, TierLedger};
use crate::queue::{QueueSnapshot, QueueSource, SnapshotOrigin};
use crate::request::StorageRequest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of placing one job
#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    /// The decision applied to the job
    pub decision: Decision,
    /// Where the queue view came from; `None` if no snapshot was needed
    pub snapshot_origin: Option<SnapshotOrigin>,
    /// Time limit the decision was based on
    pub requested_time_limit: Duration,
    /// Parsed storage request, if the job had a valid one
    pub storage_request: Option<StorageRequest>,
}

/// Storage-tier placement engine
///
/// One instance should serve the whole process: the lock it owns is what
/// serializes decisions.
pub struct PlacementEngine<Q> {
    config: TierConfig,
    source: Q,
    probe: Box<dyn SpaceProbe + Send + Sync>,
    clock: Clock,
    lock: Mutex<()>,
}

impl<Q: QueueSource> PlacementEngine<Q> {
    /// Validate the configuration, then create an engine over it
    pub fn try_new(config: TierConfig, source: Q) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, source))
    }

    /// Create an engine without checking the configuration
    ///
    /// Use [`PlacementEngine::try_new`] unless the configuration came from
    /// [`TierConfig::load`] or [`TierConfig::from_cli`], which validate it.
    pub fn new(config: TierConfig, source: Q) -> Self {
        Self {
            config,
            source,
            probe: Box::new(DiskSpaceProbe),
            clock: Box::new(Utc::now),
            lock: Mutex::new(()),
        }
    }

    /// Use a different free-space probe for the legacy policy
    pub fn with_space_probe(mut self, probe: impl SpaceProbe + Send + Sync + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Use a different clock
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    /// Queue source in use
    pub fn source(&self) -> &Q {
        &self.source
    }

    /// Choose a tier for the job and apply it to the record
    ///
    /// Never fails: anything that cannot be evaluated sends the job to the
    /// slow tier.
    pub fn place(&self, job: &mut dyn JobRecord) -> Placement {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let requested_time_limit = job
            .time_limit()
            .unwrap_or_else(|| self.config.default_time_limit());
        let storage_request = StorageRequest::parse_lenient(job.storage_request_spec());

        let (decision, snapshot_origin) = match (&storage_request, self.config.mode) {
            (None, _) => {
                tracing::debug!("No storage request, skipping estimation");
                (Decision::without_request(), None)
            }
            (Some(request), PlacementMode::Projection) => self.project(requested_time_limit, request),
            (Some(request), PlacementMode::Legacy) => self.legacy(request),
        };

        allocate(job, &decision, &self.config);

        tracing::info!(
            tier = %decision.tier,
            reason = ?decision.reason,
            "Placed job on {} ({:?})",
            self.config.path(decision.tier).display(),
            decision.reason
        );

        Placement {
            decision,
            snapshot_origin,
            requested_time_limit,
            storage_request,
        }
    }

    fn project(&self, time_limit: Duration, request: &StorageRequest) -> (Decision, Option<SnapshotOrigin>) {
        let snapshot = QueueSnapshot::capture(&self.source, (self.clock)());
        let ledger = TierLedger::from_snapshot(&snapshot, &self.config.hps);
        let expected_wait = cluster_wait(&snapshot);
        let fast_wait = hps_wait(&ledger, request.capacity);

        tracing::debug!(
            "Expected wait (overall): {}, HPS wait: {}, HPS remaining: {} of {}",
            humantime::format_duration(expected_wait),
            fast_wait,
            ledger.remaining(),
            ledger.total_capacity()
        );

        let decision = decide(time_limit, Some(request), expected_wait, fast_wait, &self.config);

        if let (Some(lps), Some(hps)) = (decision.lps_time, decision.hps_time) {
            tracing::debug!(
                "Estimated job time: LPS {}, HPS {}",
                humantime::format_duration(lps),
                hps
            );
        }

        (decision, Some(snapshot.origin().clone()))
    }

    fn legacy(&self, request: &StorageRequest) -> (Decision, Option<SnapshotOrigin>) {
        let snapshot = QueueSnapshot::capture(&self.source, (self.clock)());
        let free = self
            .probe
            .free_capacity(&self.config.hps.path)
            .unwrap_or_else(|| {
                tracing::debug!(
                    "Cannot measure free space on {}, using configured capacity",
                    self.config.hps.path.display()
                );
                self.config.hps.total_capacity
            });

        let decision = legacy_decide(request, &snapshot, free, &self.config);
        (decision, Some(snapshot.origin().clone()))
    }
}
