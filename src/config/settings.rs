//! Configuration settings for TierPlace
//!
//! Defines the storage tier description, CLI arguments, and defaults. The
//! effective configuration is built from compiled-in defaults, then an
//! optional JSON file, then CLI flags and `TIERPLACE_*` environment variables.

use crate::error::{IoResultExt, PlacementError, Result};
use crate::placement::Tier;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// TierPlace - storage-tier placement for HPC job submissions
#[derive(Parser, Debug, Clone)]
#[command(name = "tierplace")]
#[command(author = "TierPlace Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Decide between a slow and a fast shared storage tier for a job")]
#[command(long_about = r#"
TierPlace evaluates where a job should place its working data: the large,
slow shared tier (LPS) or the small, fast tier (HPS). It projects the job's
completion time on both tiers from the live queue and picks the faster one.

Examples:
  tierplace place --time-limit 10 --burst-buffer "capacity=100 io=600"
  tierplace --queue-file queue.json queue      # Inspect fast-tier contention
  tierplace --config /etc/tierplace.json config
"#)]
pub struct CliArgs {
    /// JSON configuration file
    #[arg(short = 'c', long, env = "TIERPLACE_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Read the job queue from a JSON file instead of squeue
    #[arg(long, env = "TIERPLACE_QUEUE_FILE", value_name = "PATH", global = true)]
    pub queue_file: Option<PathBuf>,

    /// squeue binary used for live queue queries
    #[arg(long, env = "TIERPLACE_SQUEUE", default_value = "squeue", value_name = "PATH", global = true)]
    pub squeue: PathBuf,

    /// Path of the slow storage tier
    #[arg(long, env = "TIERPLACE_LPS_PATH", value_name = "PATH", global = true)]
    pub lps_path: Option<PathBuf>,

    /// Bandwidth of the slow storage tier (MB/s)
    #[arg(long, env = "TIERPLACE_LPS_BANDWIDTH", value_name = "MBPS", global = true)]
    pub lps_bandwidth: Option<f64>,

    /// Path of the fast storage tier
    #[arg(long, env = "TIERPLACE_HPS_PATH", value_name = "PATH", global = true)]
    pub hps_path: Option<PathBuf>,

    /// Bandwidth of the fast storage tier (MB/s)
    #[arg(long, env = "TIERPLACE_HPS_BANDWIDTH", value_name = "MBPS", global = true)]
    pub hps_bandwidth: Option<f64>,

    /// Total capacity of the fast storage tier (MiB)
    #[arg(long, env = "TIERPLACE_HPS_CAPACITY", value_name = "MIB", global = true)]
    pub hps_capacity: Option<u64>,

    /// Environment key used to tag the chosen tier
    #[arg(long, env = "TIERPLACE_TAG_KEY", value_name = "KEY", global = true)]
    pub tag_key: Option<String>,

    /// Use the legacy space-threshold policy
    #[arg(long, global = true)]
    pub legacy: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Output format for reports
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Evaluate the placement of one job
    #[command(name = "place")]
    Place {
        /// Requested time limit in minutes (default from configuration)
        #[arg(short = 't', long, value_name = "MIN")]
        time_limit: Option<u64>,
        /// Burst-buffer specification, e.g. "capacity=100 io=600"
        #[arg(short = 'b', long, value_name = "SPEC")]
        burst_buffer: Option<String>,
        /// Extra environment entries (KEY=VALUE) carried by the job
        #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
        environment: Vec<String>,
    },

    /// Show queue contention as seen by the estimator
    #[command(name = "queue")]
    Queue,

    /// Print the effective configuration
    #[command(name = "config")]
    Config,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Log line format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Placement policy
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    /// Completion-time projection over the live queue
    #[default]
    Projection,
    /// Queue emptiness and a static per-job space threshold
    Legacy,
}

/// Slow, high-capacity storage tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierSpec {
    /// Mount path handed to jobs placed on this tier
    pub path: PathBuf,
    /// Sustained bandwidth in MB/s
    pub bandwidth: f64,
}

impl Default for TierSpec {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/home/vagrant/lps"),
            bandwidth: 12.0,
        }
    }
}

/// Fast, capacity-limited storage tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastTierSpec {
    /// Mount path handed to jobs placed on this tier
    pub path: PathBuf,
    /// Sustained bandwidth in MB/s
    pub bandwidth: f64,
    /// Total capacity shared by all jobs (MiB)
    pub total_capacity: u64,
}

impl Default for FastTierSpec {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/home/vagrant/hps"),
            bandwidth: 192.0,
            total_capacity: 5120,
        }
    }
}

/// Parameters of the legacy policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Slow tier speed used for the time comparison
    pub lps_speed: f64,
    /// Fast tier speed used for the time comparison
    pub hps_speed: f64,
    /// Fixed fast-tier wait added to the fast tier's time (seconds)
    pub hps_wait_secs: u64,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            lps_speed: 80.0,
            hps_speed: 500.0,
            hps_wait_secs: 60,
        }
    }
}

/// Process-wide storage tier configuration, read-only once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Slow tier
    pub lps: TierSpec,
    /// Fast tier
    pub hps: FastTierSpec,
    /// Environment key carrying the chosen tier's path
    pub tag_key: String,
    /// Time limit for jobs submitted without one (minutes)
    pub default_time_limit_minutes: u64,
    /// Placement policy
    pub mode: PlacementMode,
    /// Legacy policy parameters
    pub legacy: LegacyConfig,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            lps: TierSpec::default(),
            hps: FastTierSpec::default(),
            tag_key: "SLURM_STORAGE_TIER".to_string(),
            default_time_limit_minutes: 60,
            mode: PlacementMode::Projection,
            legacy: LegacyConfig::default(),
        }
    }
}

impl TierConfig {
    /// Load a JSON configuration file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PlacementError::config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Build the effective configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(path) = &args.lps_path {
            config.lps.path = path.clone();
        }
        if let Some(bandwidth) = args.lps_bandwidth {
            config.lps.bandwidth = bandwidth;
        }
        if let Some(path) = &args.hps_path {
            config.hps.path = path.clone();
        }
        if let Some(bandwidth) = args.hps_bandwidth {
            config.hps.bandwidth = bandwidth;
        }
        if let Some(capacity) = args.hps_capacity {
            config.hps.total_capacity = capacity;
        }
        if let Some(key) = &args.tag_key {
            config.tag_key = key.clone();
        }
        if args.legacy {
            config.mode = PlacementMode::Legacy;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the estimator cannot work with
    pub fn validate(&self) -> Result<()> {
        for (name, bandwidth) in [("lps", self.lps.bandwidth), ("hps", self.hps.bandwidth)] {
            if !(bandwidth.is_finite() && bandwidth > 0.0) {
                return Err(PlacementError::config(format!(
                    "{} bandwidth must be a positive number, got {}",
                    name, bandwidth
                )));
            }
        }
        if self.hps.bandwidth <= self.lps.bandwidth {
            return Err(PlacementError::config(format!(
                "hps bandwidth ({}) must exceed lps bandwidth ({})",
                self.hps.bandwidth, self.lps.bandwidth
            )));
        }
        if self.lps.path.as_os_str().is_empty() || self.hps.path.as_os_str().is_empty() {
            return Err(PlacementError::config("tier paths must not be empty"));
        }
        if self.tag_key.is_empty() || self.tag_key.contains('=') {
            return Err(PlacementError::config(format!(
                "invalid tag key '{}'",
                self.tag_key
            )));
        }
        if self.default_time_limit_minutes == 0 {
            return Err(PlacementError::config("default time limit must be at least one minute"));
        }
        if self.mode == PlacementMode::Legacy {
            let legacy = &self.legacy;
            if !(legacy.lps_speed > 0.0 && legacy.hps_speed > 0.0)
                || !legacy.lps_speed.is_finite()
                || !legacy.hps_speed.is_finite()
            {
                return Err(PlacementError::config("legacy speeds must be positive numbers"));
            }
        }
        Ok(())
    }

    /// How many times faster the fast tier is
    pub fn bandwidth_ratio(&self) -> f64 {
        self.hps.bandwidth / self.lps.bandwidth
    }

    /// Bandwidth of a tier in MB/s
    pub fn bandwidth(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Lps => self.lps.bandwidth,
            Tier::Hps => self.hps.bandwidth,
        }
    }

    /// Mount path of a tier
    pub fn path(&self, tier: Tier) -> &Path {
        match tier {
            Tier::Lps => &self.lps.path,
            Tier::Hps => &self.hps.path,
        }
    }

    /// Time limit for jobs submitted without one
    pub fn default_time_limit(&self) -> Duration {
        Duration::from_secs(self.default_time_limit_minutes.saturating_mul(60))
    }
}
