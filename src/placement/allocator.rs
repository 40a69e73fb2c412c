//! Tier allocation
//!
//! Applies a [`Decision`] to the job record: tier tag, time limit and storage
//! request. Only the job is touched, never shared state, and allocation
//! cannot fail.

use super::decision::{Decision, Tier};
use crate::config::TierConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Host time limits have minute resolution
const MINUTE: Duration = Duration::from_secs(60);

/// A job's mutable submission record, as exposed by the host scheduler
///
/// Durations cross this boundary; implementations convert to host units.
pub trait JobRecord {
    /// Requested wall-clock limit, `None` if the job set none
    fn time_limit(&self) -> Option<Duration>;

    /// Replace the wall-clock limit
    fn set_time_limit(&mut self, limit: Duration);

    /// Raw burst-buffer specification
    fn storage_request_spec(&self) -> Option<&str>;

    /// Drop the burst-buffer specification
    fn clear_storage_request(&mut self);

    /// Set an environment entry, replacing any existing value for `key`
    fn set_env(&mut self, key: &str, value: &str);
}

/// Serializable job submission record
///
/// Mirrors the host's descriptor: time limit in whole minutes and the
/// environment as an ordered list of `KEY=VALUE` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Wall-clock limit in minutes
    #[serde(default)]
    pub time_limit_minutes: Option<u64>,
    /// Environment entries
    #[serde(default)]
    pub environment: Vec<String>,
    /// Burst-buffer specification
    #[serde(default)]
    pub burst_buffer: Option<String>,
}

impl JobDescriptor {
    /// Create an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time limit in minutes
    pub fn with_time_limit_minutes(mut self, minutes: u64) -> Self {
        self.time_limit_minutes = Some(minutes);
        self
    }

    /// Set the burst-buffer specification
    pub fn with_burst_buffer(mut self, spec: impl Into<String>) -> Self {
        self.burst_buffer = Some(spec.into());
        self
    }

    /// Add a raw `KEY=VALUE` environment entry
    pub fn with_env_entry(mut self, entry: impl Into<String>) -> Self {
        self.environment.push(entry.into());
        self
    }

    /// Look up an environment value
    pub fn env(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .find_map(|entry| entry.strip_prefix(key)?.strip_prefix('='))
    }
}

impl JobRecord for JobDescriptor {
    fn time_limit(&self) -> Option<Duration> {
        self.time_limit_minutes
            .map(|m| Duration::from_secs(m.saturating_mul(60)))
    }

    fn set_time_limit(&mut self, limit: Duration) {
        self.time_limit_minutes = Some(limit.as_secs() / 60);
    }

    fn storage_request_spec(&self) -> Option<&str> {
        self.burst_buffer.as_deref()
    }

    fn clear_storage_request(&mut self) {
        self.burst_buffer = None;
    }

    fn set_env(&mut self, key: &str, value: &str) {
        let entry = format!("{}={}", key, value);
        let existing = self.environment.iter_mut().find(|e| {
            e.strip_prefix(key)
                .is_some_and(|rest| rest.starts_with('='))
        });

        match existing {
            Some(slot) => *slot = entry,
            None => self.environment.push(entry),
        }
    }
}

/// Wall-clock limit for a job moved to the fast tier
///
/// Scales the requested limit down by the bandwidth ratio (rounded up to a
/// whole minute), adds the fast-tier wait back on, and never returns less
/// than one minute.
pub fn fast_tier_time_limit(time_limit: Duration, hps_wait: Duration, bandwidth_ratio: f64) -> Duration {
    let scaled_minutes = (time_limit.as_secs_f64() / MINUTE.as_secs_f64() / bandwidth_ratio).ceil();
    let scaled = if scaled_minutes.is_finite() && scaled_minutes >= 0.0 {
        MINUTE.saturating_mul(scaled_minutes.min(u32::MAX as f64) as u32)
    } else {
        time_limit
    };

    scaled.saturating_add(hps_wait).max(MINUTE)
}

/// Apply a decision to a job record
pub fn allocate(job: &mut dyn JobRecord, decision: &Decision, config: &TierConfig) {
    let path = config.path(decision.tier).to_string_lossy();
    job.set_env(&config.tag_key, &path);

    match decision.tier {
        Tier::Hps => {
            if let Some(limit) = decision.adjusted_time_limit {
                job.set_time_limit(limit);
            }
        }
        Tier::Lps => job.clear_storage_request(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::DecisionReason;

    fn decision(tier: Tier, adjusted: Option<Duration>) -> Decision {
        Decision {
            tier,
            reason: match tier {
                Tier::Hps => DecisionReason::HpsFaster,
                Tier::Lps => DecisionReason::LpsNotSlower,
            },
            adjusted_time_limit: adjusted,
            ..Decision::without_request()
        }
    }

    #[test]
    fn test_fast_tier_time_limit() {
        let ratio = 16.0;
        assert_eq!(fast_tier_time_limit(Duration::from_secs(600), Duration::ZERO, ratio), MINUTE);
        assert_eq!(
            fast_tier_time_limit(Duration::from_secs(32 * 60), Duration::ZERO, ratio),
            Duration::from_secs(120)
        );
        assert_eq!(
            fast_tier_time_limit(Duration::from_secs(33 * 60), Duration::from_secs(90), ratio),
            Duration::from_secs(3 * 60 + 90)
        );
    }

    #[test]
    fn test_fast_tier_time_limit_floor() {
        assert_eq!(fast_tier_time_limit(Duration::ZERO, Duration::ZERO, 16.0), MINUTE);
    }

    #[test]
    fn test_descriptor_minutes_boundary() {
        let mut job = JobDescriptor::new();
        assert!(job.time_limit().is_none());

        job.set_time_limit(Duration::from_secs(3 * 60 + 90));
        assert_eq!(job.time_limit_minutes, Some(4));
        assert_eq!(job.time_limit(), Some(Duration::from_secs(240)));
    }

    #[test]
    fn test_set_env_replaces_existing_key() {
        let mut job = JobDescriptor::new()
            .with_env_entry("SLURM_STORAGE_TIER_OLD=x")
            .with_env_entry("SLURM_STORAGE_TIER=/old")
            .with_env_entry("HOME=/home/user");

        job.set_env("SLURM_STORAGE_TIER", "/new");
        assert_eq!(job.environment.len(), 3);
        assert_eq!(job.env("SLURM_STORAGE_TIER"), Some("/new"));
        assert_eq!(job.env("SLURM_STORAGE_TIER_OLD"), Some("x"));

        job.set_env("SCRATCH", "/tmp");
        assert_eq!(job.environment.len(), 4);
        assert_eq!(job.env("SCRATCH"), Some("/tmp"));
        assert_eq!(job.env("MISSING"), None);
    }

    #[test]
    fn test_allocate_hps() {
        let config = TierConfig::default();
        let mut job = JobDescriptor::new()
            .with_time_limit_minutes(10)
            .with_burst_buffer("capacity=100 io=600");

        allocate(&mut job, &decision(Tier::Hps, Some(MINUTE)), &config);

        assert_eq!(job.env("SLURM_STORAGE_TIER"), Some("/home/vagrant/hps"));
        assert_eq!(job.time_limit_minutes, Some(1));
        assert_eq!(job.burst_buffer.as_deref(), Some("capacity=100 io=600"));
    }

    #[test]
    fn test_allocate_hps_without_rescale() {
        let config = TierConfig::default();
        let mut job = JobDescriptor::new().with_time_limit_minutes(10);

        allocate(&mut job, &decision(Tier::Hps, None), &config);
        assert_eq!(job.time_limit_minutes, Some(10));
    }

    #[test]
    fn test_allocate_lps_clears_request() {
        let mut config = TierConfig::default();
        config.tag_key = "STORAGE_TIER".to_string();
        let mut job = JobDescriptor::new()
            .with_time_limit_minutes(10)
            .with_burst_buffer("capacity=100 io=600");

        allocate(&mut job, &decision(Tier::Lps, None), &config);

        assert_eq!(job.env("STORAGE_TIER"), Some("/home/vagrant/lps"));
        assert_eq!(job.time_limit_minutes, Some(10));
        assert!(job.burst_buffer.is_none());
    }
}
