//! Run configuration: target server, load model, and run bounds.
//!
//! Configuration is read from a YAML file, with durations given in humantime
//! format (e.g. `90s` or `2m`). All fields are validated once before the run
//! starts; a bad configuration terminates with a diagnostic instead of
//! surfacing mid-run.

use std::time::Duration;

use anyhow::{Result, bail, ensure};
use serde::Deserialize;

/// How the orchestrator's spawn loop terminates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunMode {
    /// Spawn exactly this many sessions.
    Total(u64),
    /// Spawn sessions until this much wall-clock time has passed.
    Duration(Duration),
}

/// Immutable configuration for one workload run.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Target host.
    pub host: String,

    /// Target port.
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Arrival rate, in session starts per second.
    #[serde(default = "defaults::load")]
    pub load: f64,

    /// Total number of sessions to spawn. Mutually exclusive with `duration`.
    #[serde(default)]
    pub total: Option<u64>,

    /// Wall-clock spawn window. Mutually exclusive with `total`.
    #[serde(default, with = "humantime_serde")]
    pub duration: Option<Duration>,

    /// Random seed. Fixed seeds give reproducible resource selection across
    /// runs, which keeps benchmark runs comparable.
    #[serde(default = "defaults::seed")]
    pub seed: u64,

    /// Number of resources in the target corpus.
    #[serde(default = "defaults::files")]
    pub files: usize,

    /// Skew of the popularity distribution.
    #[serde(default = "defaults::alpha")]
    pub alpha: f64,

    /// Cap on concurrently live sessions. Reaching it is the resource
    /// exhaustion condition handled per run mode.
    #[serde(default = "defaults::max_in_flight")]
    pub max_in_flight: usize,
}

mod defaults {
    pub(super) fn port() -> u16 {
        80
    }

    pub(super) fn load() -> f64 {
        1.0
    }

    pub(super) fn seed() -> u64 {
        100
    }

    pub(super) fn files() -> usize {
        1000
    }

    pub(super) fn alpha() -> f64 {
        1.0
    }

    pub(super) fn max_in_flight() -> usize {
        8192
    }
}

impl Config {
    /// Resolves the configured termination mode.
    ///
    /// Exactly one of `total` or `duration` must be set.
    pub fn mode(&self) -> Result<RunMode> {
        match (self.total, self.duration) {
            (Some(total), None) => Ok(RunMode::Total(total)),
            (None, Some(duration)) => Ok(RunMode::Duration(duration)),
            (Some(_), Some(_)) => bail!("`total` and `duration` are mutually exclusive"),
            (None, None) => bail!("one of `total` or `duration` must be set"),
        }
    }

    /// Checks all fields, returning a diagnostic for the first violation.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.host.is_empty(), "target host must not be empty");
        ensure!(
            self.load.is_finite() && self.load > 0.0,
            "arrival rate must be positive, got {}",
            self.load
        );
        ensure!(self.files > 0, "resource population must not be empty");
        ensure!(
            self.alpha.is_finite() && self.alpha > 0.0,
            "popularity skew must be positive, got {}",
            self.alpha
        );
        ensure!(self.max_in_flight > 0, "session cap must be positive");
        if let Some(total) = self.total {
            ensure!(total > 0, "session total must be positive");
        }
        if let Some(duration) = self.duration {
            ensure!(!duration.is_zero(), "run duration must be positive");
        }
        self.mode().map(|_| ())
    }
}
