//! Host job sources
//!
//! A [`QueueSource`] returns every job the host scheduler knows about, in the
//! host's own units. Filtering and parsing happen in the snapshot.

use crate::error::{IoResultExt, PlacementError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Lifecycle state of a job as reported by the host scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HostJobState {
    /// Queued, not yet started
    Pending,
    /// Executing
    Running,
    /// Started, then suspended
    Suspended,
    /// Finished, nodes still being released
    Completing,
    /// Finished successfully
    Completed,
    /// Cancelled by a user or administrator
    Cancelled,
    /// Failed (also boot failures and missed deadlines)
    Failed,
    /// Hit its time limit
    Timeout,
    /// Lost to a node failure
    NodeFail,
    /// Preempted by another job
    Preempted,
    /// Killed for exceeding its memory
    OutOfMemory,
    /// Any state not listed above
    Unknown,
}

impl HostJobState {
    /// Map a Slurm state name (e.g. `RUNNING`, `NODE_FAIL`) to a state
    pub fn from_slurm(state: &str) -> Self {
        match state.trim().to_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUSPENDED" => Self::Suspended,
            "COMPLETING" => Self::Completing,
            "COMPLETED" => Self::Completed,
            "CANCELLED" => Self::Cancelled,
            "FAILED" | "BOOT_FAIL" | "DEADLINE" => Self::Failed,
            "TIMEOUT" => Self::Timeout,
            "NODE_FAIL" => Self::NodeFail,
            "PREEMPTED" => Self::Preempted,
            "OUT_OF_MEMORY" => Self::OutOfMemory,
            _ => Self::Unknown,
        }
    }

    /// Slurm state name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Suspended => "SUSPENDED",
            Self::Completing => "COMPLETING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::NodeFail => "NODE_FAIL",
            Self::Preempted => "PREEMPTED",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for HostJobState {
    fn from(state: String) -> Self {
        Self::from_slurm(&state)
    }
}

impl From<HostJobState> for String {
    fn from(state: HostJobState) -> Self {
        state.as_str().to_string()
    }
}

/// One job as reported by the host scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostJob {
    /// Job identifier
    pub id: u64,
    /// Lifecycle state
    pub state: HostJobState,
    /// Expected or actual completion time, if the host knows it
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock limit in minutes
    pub time_limit_minutes: u64,
    /// Raw burst-buffer specification
    #[serde(default)]
    pub burst_buffer: Option<String>,
}

impl HostJob {
    /// Create a job with no end time and no storage request
    pub fn new(id: u64, state: HostJobState, time_limit_minutes: u64) -> Self {
        Self {
            id,
            state,
            end_time: None,
            time_limit_minutes,
            burst_buffer: None,
        }
    }

    /// Set the completion time
    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Set the burst-buffer specification
    pub fn with_burst_buffer(mut self, spec: impl Into<String>) -> Self {
        self.burst_buffer = Some(spec.into());
        self
    }

    /// Time limit as a duration
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_minutes.saturating_mul(60))
    }
}

/// Access to the host scheduler's job list
pub trait QueueSource {
    /// Return all jobs known to the host, in any state
    fn list_jobs(&self) -> Result<Vec<HostJob>>;

    /// Short name used in log messages
    fn name(&self) -> &str {
        "queue"
    }
}

impl<T: QueueSource + ?Sized> QueueSource for &T {
    fn list_jobs(&self) -> Result<Vec<HostJob>> {
        (**self).list_jobs()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: QueueSource + ?Sized> QueueSource for Arc<T> {
    fn list_jobs(&self) -> Result<Vec<HostJob>> {
        (**self).list_jobs()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: QueueSource + ?Sized> QueueSource for Box<T> {
    fn list_jobs(&self) -> Result<Vec<HostJob>> {
        (**self).list_jobs()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// In-memory job list, shareable between threads
#[derive(Debug, Default)]
pub struct StaticQueue {
    jobs: RwLock<Vec<HostJob>>,
}

impl StaticQueue {
    /// Create a queue holding the given jobs
    pub fn new(jobs: Vec<HostJob>) -> Self {
        Self {
            jobs: RwLock::new(jobs),
        }
    }

    /// Create an empty queue
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a job
    pub fn push(&self, job: HostJob) {
        self.write().push(job);
    }

    /// Remove a job by ID, returning it if present
    pub fn remove(&self, id: u64) -> Option<HostJob> {
        let mut jobs = self.write();
        let pos = jobs.iter().position(|j| j.id == id)?;
        Some(jobs.remove(pos))
    }

    /// Replace the whole job list
    pub fn replace(&self, new_jobs: Vec<HostJob>) {
        *self.write() = new_jobs;
    }

    /// Number of jobs held
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the queue holds no jobs
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<HostJob>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<HostJob>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl QueueSource for StaticQueue {
    fn list_jobs(&self) -> Result<Vec<HostJob>> {
        Ok(self.read().clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Job list read from a JSON file (an array of [`HostJob`])
#[derive(Debug, Clone)]
pub struct JsonFileQueue {
    path: PathBuf,
}

impl JsonFileQueue {
    /// Create a source reading the given file on every query
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QueueSource for JsonFileQueue {
    fn list_jobs(&self) -> Result<Vec<HostJob>> {
        let content = std::fs::read_to_string(&self.path).with_path(&self.path)?;
        serde_json::from_str(&content).map_err(|e| {
            PlacementError::queue(format!("invalid job list in {}: {}", self.path.display(), e))
        })
    }

    fn name(&self) -> &str {
        "json-file"
    }
}
