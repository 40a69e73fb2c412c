//! Tier decision rule
//!
//! Projects a job's end-to-end completion time (queueing, run time and data
//! transfer) on each tier and picks the tier that finishes first. Ties go to
//! the slow tier.

use super::allocator::fast_tier_time_limit;
use crate::config::TierConfig;
use crate::estimate::Estimate;
use crate::request::StorageRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Shared storage tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Large, slow tier
    Lps,
    /// Small, fast tier
    Hps,
}

impl Tier {
    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Lps => "LPS",
            Tier::Hps => "HPS",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a tier was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Job asked for no fast-tier storage
    NoStorageRequest,
    /// Request exceeds the fast tier's total capacity
    HpsUnsatisfiable,
    /// Fast tier finishes strictly earlier
    HpsFaster,
    /// Fast tier does not finish earlier
    LpsNotSlower,
    /// Fast tier has room (legacy policy, empty queue)
    HpsAvailable,
    /// Fast tier lacks room for the job's space (legacy policy)
    InsufficientSpace,
}

/// Outcome of one placement decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Chosen tier
    pub tier: Tier,
    /// Why it was chosen
    pub reason: DecisionReason,
    /// New time limit for the job; `None` leaves it untouched
    pub adjusted_time_limit: Option<Duration>,
    /// Cluster-wide queueing delay used in the projection
    pub expected_wait: Duration,
    /// Fast-tier queueing delay, if estimated
    pub hps_wait: Option<Estimate>,
    /// Projected completion time on the slow tier, if computed
    pub lps_time: Option<Duration>,
    /// Projected completion time on the fast tier, if computed
    pub hps_time: Option<Estimate>,
}

impl Decision {
    /// Slow tier for a job that never asked for the fast one
    pub fn without_request() -> Self {
        Self {
            tier: Tier::Lps,
            reason: DecisionReason::NoStorageRequest,
            adjusted_time_limit: None,
            expected_wait: Duration::ZERO,
            hps_wait: None,
            lps_time: None,
            hps_time: None,
        }
    }
}

/// Time needed to move `io` MB at `bandwidth` MB/s
pub fn transfer_time(io: u64, bandwidth: f64) -> Duration {
    Duration::try_from_secs_f64(io as f64 / bandwidth).unwrap_or(Duration::MAX)
}

/// Choose a tier by minimizing projected completion time
pub fn decide(
    time_limit: Duration,
    request: Option<&StorageRequest>,
    expected_wait: Duration,
    hps_wait: Estimate,
    config: &TierConfig,
) -> Decision {
    let Some(request) = request else {
        return Decision::without_request();
    };

    let base = expected_wait.saturating_add(time_limit);
    let on_tier = |tier| base.saturating_add(transfer_time(request.throughput_io, config.bandwidth(tier)));
    let lps_time = on_tier(Tier::Lps);
    let hps_time = hps_wait.saturating_add(on_tier(Tier::Hps));

    let (tier, reason, adjusted_time_limit) = match hps_wait {
        Estimate::Unsatisfiable => (Tier::Lps, DecisionReason::HpsUnsatisfiable, None),
        Estimate::Finite(wait) if hps_time < Estimate::Finite(lps_time) => (
            Tier::Hps,
            DecisionReason::HpsFaster,
            Some(fast_tier_time_limit(time_limit, wait, config.bandwidth_ratio())),
        ),
        Estimate::Finite(_) => (Tier::Lps, DecisionReason::LpsNotSlower, None),
    };

    Decision {
        tier,
        reason,
        adjusted_time_limit,
        expected_wait,
        hps_wait: Some(hps_wait),
        lps_time: Some(lps_time),
        hps_time: Some(hps_time),
    }
}
