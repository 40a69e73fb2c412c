//! Burst-buffer specification parser
//!
//! A job asks for the fast tier with a string such as `capacity=100 io=600`:
//! whitespace-separated `key=value` tokens where `capacity` comes before `io`.
//! Other tokens are ignored.

use crate::error::{PlacementError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CAPACITY_KEY: &str = "capacity";
const IO_KEY: &str = "io";

/// A job's declared need for fast-tier capacity and I/O volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageRequest {
    /// Requested fast-tier capacity (MiB)
    pub capacity: u64,
    /// Intermediate data read/written by the job (MB)
    pub throughput_io: u64,
}

impl StorageRequest {
    /// Create a new request
    pub fn new(capacity: u64, throughput_io: u64) -> Self {
        Self {
            capacity,
            throughput_io,
        }
    }

    /// Parse a burst-buffer specification
    ///
    /// Fails if `capacity=` or `io=` is missing, if `io=` does not follow
    /// `capacity=`, or if either value is not an unsigned integer.
    pub fn parse(spec: &str) -> Result<Self> {
        let tokens: Vec<&str> = spec.split_whitespace().collect();

        let capacity_pos = tokens
            .iter()
            .position(|t| key_of(t) == Some(CAPACITY_KEY))
            .ok_or_else(|| PlacementError::malformed(spec, "missing 'capacity=' token"))?;

        let io_pos = tokens[capacity_pos + 1..]
            .iter()
            .position(|t| key_of(t) == Some(IO_KEY))
            .map(|p| p + capacity_pos + 1)
            .ok_or_else(|| {
                if tokens[..capacity_pos].iter().any(|t| key_of(t) == Some(IO_KEY)) {
                    PlacementError::malformed(spec, "'io=' must follow 'capacity='")
                } else {
                    PlacementError::malformed(spec, "missing 'io=' token")
                }
            })?;

        let capacity = parse_value(spec, tokens[capacity_pos], CAPACITY_KEY)?;
        let throughput_io = parse_value(spec, tokens[io_pos], IO_KEY)?;

        Ok(Self {
            capacity,
            throughput_io,
        })
    }

    /// Parse an optional specification, treating any failure as "no request"
    ///
    /// Absent, blank and malformed specifications all yield `None`; malformed
    /// ones are logged.
    pub fn parse_lenient(spec: Option<&str>) -> Option<Self> {
        let spec = spec?.trim();
        if spec.is_empty() {
            return None;
        }

        match Self::parse(spec) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!("Ignoring storage request: {}", e);
                None
            }
        }
    }
}

impl FromStr for StorageRequest {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StorageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} {}={}", CAPACITY_KEY, self.capacity, IO_KEY, self.throughput_io)
    }
}

fn key_of(token: &str) -> Option<&str> {
    token.split_once('=').map(|(key, _)| key)
}

fn parse_value(spec: &str, token: &str, key: &str) -> Result<u64> {
    let value = token.split_once('=').map(|(_, v)| v).unwrap_or_default();

    // u64::from_str accepts a leading '+', which is not a valid value here
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PlacementError::malformed(
            spec,
            format!("invalid {} value '{}'", key, value),
        ));
    }

    value.parse::<u64>().map_err(|e| {
        PlacementError::malformed(spec, format!("invalid {} value '{}': {}", key, value, e))
    })
}
