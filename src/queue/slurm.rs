//! Slurm queue source
//!
//! Reads the live job list with `squeue --all --json`. Different Slurm
//! releases encode the same fields differently (`job_state` as a string or a
//! list, numbers plain or wrapped in `{set, infinite, number}`), so the
//! response is decoded leniently.

use super::source::{HostJob, HostJobState, QueueSource};
use crate::error::{PlacementError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Time limit assumed for jobs submitted without one
const DEFAULT_FALLBACK_TIME_LIMIT: Duration = Duration::from_secs(60 * 60);

/// Queue source backed by the `squeue` command
#[derive(Debug, Clone)]
pub struct SqueueQueue {
    program: PathBuf,
    fallback_time_limit: Duration,
}

impl SqueueQueue {
    /// Create a source invoking `squeue` from `PATH`
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("squeue"),
            fallback_time_limit: DEFAULT_FALLBACK_TIME_LIMIT,
        }
    }

    /// Use a specific `squeue` binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Time limit reported for jobs with an unset or infinite limit
    pub fn with_fallback_time_limit(mut self, limit: Duration) -> Self {
        self.fallback_time_limit = limit;
        self
    }

    fn fallback_minutes(&self) -> u64 {
        self.fallback_time_limit.as_secs().div_ceil(60)
    }
}

impl Default for SqueueQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueSource for SqueueQueue {
    fn list_jobs(&self) -> Result<Vec<HostJob>> {
        let output = Command::new(&self.program)
            .args(["--all", "--json"])
            .output()
            .map_err(|e| {
                PlacementError::queue(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(PlacementError::queue(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_squeue_json(&String::from_utf8_lossy(&output.stdout), self.fallback_minutes())
    }

    fn name(&self) -> &str {
        "squeue"
    }
}

#[derive(Debug, Deserialize)]
struct SqueueResponse {
    #[serde(default)]
    jobs: Vec<SqueueJob>,
}

#[derive(Debug, Deserialize)]
struct SqueueJob {
    job_id: u64,
    job_state: SlurmState,
    #[serde(default)]
    end_time: Option<SlurmNumber>,
    #[serde(default)]
    time_limit: Option<SlurmNumber>,
    #[serde(default)]
    burst_buffer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlurmState {
    Single(String),
    Flags(Vec<String>),
}

impl SlurmState {
    fn base(&self) -> HostJobState {
        match self {
            Self::Single(state) => HostJobState::from_slurm(state),
            Self::Flags(flags) => flags
                .first()
                .map(|s| HostJobState::from_slurm(s))
                .unwrap_or(HostJobState::Unknown),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlurmNumber {
    Plain(u64),
    Wrapped {
        #[serde(default)]
        set: bool,
        #[serde(default)]
        infinite: bool,
        #[serde(default)]
        number: u64,
    },
}

/// Slurm's `NO_VAL`; `INFINITE` is one above it
const SLURM_NO_VAL: u64 = u32::MAX as u64 - 1;

impl SlurmNumber {
    /// The value if it is set, finite and non-zero
    fn value(&self) -> Option<u64> {
        let number = match *self {
            Self::Plain(n) => n,
            Self::Wrapped {
                set: true,
                infinite: false,
                number,
            } => number,
            Self::Wrapped { .. } => return None,
        };

        (number > 0 && number < SLURM_NO_VAL).then_some(number)
    }
}

/// Decode the output of `squeue --json`
///
/// An end time of zero means "not yet estimated". Jobs with no usable time
/// limit get `fallback_minutes`.
pub fn parse_squeue_json(json: &str, fallback_minutes: u64) -> Result<Vec<HostJob>> {
    let response: SqueueResponse = serde_json::from_str(json)
        .map_err(|e| PlacementError::queue(format!("invalid squeue output: {}", e)))?;

    Ok(response
        .jobs
        .into_iter()
        .map(|job| HostJob {
            id: job.job_id,
            state: job.job_state.base(),
            end_time: job
                .end_time
                .as_ref()
                .and_then(SlurmNumber::value)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            time_limit_minutes: job
                .time_limit
                .as_ref()
                .and_then(SlurmNumber::value)
                .unwrap_or(fallback_minutes),
            burst_buffer: job.burst_buffer.filter(|bb| !bb.trim().is_empty()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_schema() {
        let json = r#"{
            "jobs": [
                {"job_id": 11, "job_state": "RUNNING", "end_time": 1700000600,
                 "time_limit": 30, "burst_buffer": "capacity=100 io=600"},
                {"job_id": 12, "job_state": "PENDING", "end_time": 0,
                 "time_limit": 45, "burst_buffer": ""}
            ]
        }"#;

        let jobs = parse_squeue_json(json, 60).unwrap();
        assert_eq!(jobs.len(), 2);

        assert_eq!(jobs[0].id, 11);
        assert_eq!(jobs[0].state, HostJobState::Running);
        assert_eq!(jobs[0].end_time.unwrap().timestamp(), 1_700_000_600);
        assert_eq!(jobs[0].time_limit_minutes, 30);
        assert_eq!(jobs[0].burst_buffer.as_deref(), Some("capacity=100 io=600"));

        assert_eq!(jobs[1].state, HostJobState::Pending);
        assert!(jobs[1].end_time.is_none());
        assert!(jobs[1].burst_buffer.is_none());
    }

    #[test]
    fn test_parse_wrapped_schema() {
        let json = r#"{
            "meta": {"plugin": {"type": "openapi/v0.0.39"}},
            "jobs": [
                {"job_id": 21, "job_state": ["SUSPENDED"],
                 "end_time": {"set": true, "infinite": false, "number": 1700003600},
                 "time_limit": {"set": true, "infinite": false, "number": 120}},
                {"job_id": 22, "job_state": ["PENDING", "REQUEUED"],
                 "end_time": {"set": false, "infinite": false, "number": 0},
                 "time_limit": {"set": true, "infinite": true, "number": 0}}
            ]
        }"#;

        let jobs = parse_squeue_json(json, 90).unwrap();
        assert_eq!(jobs[0].state, HostJobState::Suspended);
        assert_eq!(jobs[0].end_time.unwrap().timestamp(), 1_700_003_600);
        assert_eq!(jobs[0].time_limit_minutes, 120);

        assert_eq!(jobs[1].state, HostJobState::Pending);
        assert!(jobs[1].end_time.is_none());
        assert_eq!(jobs[1].time_limit_minutes, 90);
    }

    #[test]
    fn test_plain_sentinels_use_fallback() {
        let json = r#"{
            "jobs": [
                {"job_id": 31, "job_state": "PENDING", "end_time": 4294967294,
                 "time_limit": 4294967295},
                {"job_id": 32, "job_state": "PENDING", "end_time": 4294967295,
                 "time_limit": 4294967294},
                {"job_id": 33, "job_state": "RUNNING",
                 "end_time": {"set": true, "infinite": false, "number": 4294967294},
                 "time_limit": {"set": true, "infinite": false, "number": 4294967295}}
            ]
        }"#;

        let jobs = parse_squeue_json(json, 60).unwrap();
        for job in &jobs {
            assert!(job.end_time.is_none(), "job {}", job.id);
            assert_eq!(job.time_limit_minutes, 60, "job {}", job.id);
        }
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(parse_squeue_json(r#"{"jobs": []}"#, 60).unwrap().is_empty());
        assert!(parse_squeue_json("{}", 60).unwrap().is_empty());
        assert!(parse_squeue_json("squeue: error", 60).is_err());
    }

    #[test]
    fn test_missing_binary_is_queue_failure() {
        let source = SqueueQueue::new().with_program("/nonexistent/bin/squeue");
        let err = source.list_jobs().unwrap_err();
        assert!(err.is_queue_failure());
    }

    #[test]
    fn test_fallback_minutes_rounds_up() {
        let source = SqueueQueue::new().with_fallback_time_limit(Duration::from_secs(61));
        assert_eq!(source.fallback_minutes(), 2);
    }
}
