//! Legacy placement policy
//!
//! The earlier, simpler rule: the fast tier is used when it has room for the
//! requested capacity and (if the queue is busy) a fixed-speed time
//! comparison favours it. No queue-time projection, no time limit rewrite.
//! Jobs without a storage request never reach this rule.

use super::decision::{Decision, DecisionReason, Tier};
use crate::config::TierConfig;
use crate::estimate::Estimate;
use crate::queue::{JobState, QueueSnapshot};
use crate::request::StorageRequest;
use std::path::Path;
use std::time::Duration;
use sysinfo::Disks;

const MIB: u64 = 1024 * 1024;

/// Measures free space on a storage tier
pub trait SpaceProbe {
    /// Free capacity below `path` in MiB, `None` if it cannot be measured
    fn free_capacity(&self, path: &Path) -> Option<u64>;
}

/// Probe reading mounted-disk statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSpaceProbe;

impl SpaceProbe for DiskSpaceProbe {
    fn free_capacity(&self, path: &Path) -> Option<u64> {
        let disks = Disks::new_with_refreshed_list();

        // Longest mount point containing the path wins
        disks
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space() / MIB)
    }
}

/// Probe returning a fixed value
#[derive(Debug, Clone, Copy)]
pub struct FixedSpaceProbe(pub Option<u64>);

impl SpaceProbe for FixedSpaceProbe {
    fn free_capacity(&self, _path: &Path) -> Option<u64> {
        self.0
    }
}

/// Decide with the legacy rule
///
/// `free_capacity` is the measured free space on the fast tier. Running jobs
/// holding a fast-tier request are subtracted from it when the queue is busy.
pub fn legacy_decide(
    request: &StorageRequest,
    snapshot: &QueueSnapshot,
    free_capacity: u64,
    config: &TierConfig,
) -> Decision {
    let legacy = &config.legacy;
    let space = request.capacity;

    let lps_time = Duration::try_from_secs_f64(space as f64 / legacy.lps_speed).unwrap_or(Duration::MAX);
    let hps_wait = Duration::from_secs(legacy.hps_wait_secs);
    let hps_time = Duration::try_from_secs_f64(space as f64 / legacy.hps_speed)
        .unwrap_or(Duration::MAX)
        .saturating_add(hps_wait);

    let (tier, reason) = if snapshot.is_empty() {
        if space < free_capacity {
            (Tier::Hps, DecisionReason::HpsAvailable)
        } else {
            (Tier::Lps, DecisionReason::InsufficientSpace)
        }
    } else {
        let held: u64 = snapshot
            .fast_tier_holders()
            .filter(|j| j.state == JobState::Running)
            .filter_map(|j| j.storage_request)
            .fold(0u64, |acc, r| acc.saturating_add(r.capacity));
        let free = free_capacity.saturating_sub(held);

        if space >= free {
            (Tier::Lps, DecisionReason::InsufficientSpace)
        } else if lps_time > hps_time {
            (Tier::Hps, DecisionReason::HpsFaster)
        } else {
            (Tier::Lps, DecisionReason::LpsNotSlower)
        }
    };

    Decision {
        tier,
        reason,
        adjusted_time_limit: None,
        expected_wait: Duration::ZERO,
        hps_wait: Some(Estimate::Finite(hps_wait)),
        lps_time: Some(lps_time),
        hps_time: Some(Estimate::Finite(hps_time)),
    }
}
