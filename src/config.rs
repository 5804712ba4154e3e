//! # Global scheduler configuration.
//!
//! Provides [`Config`] centralized settings for the survey scheduler.
//!
//! ## Sentinel values
//! - `load_ceiling = 0.0` → admission control disabled (spawn immediately)
//! - `max_queue = 0` → clamped to 1 (at least one rendered command is held)

use std::time::Duration;

/// Global configuration for the survey scheduler.
///
/// ## Field semantics
/// - `load_ceiling`: a new worker is admitted only while the sampled
///   1-minute load average divided by the available parallelism stays below
///   this ceiling (`0.0` = no admission control)
/// - `sample_interval`: how long to wait before re-sampling the load when a
///   spawn was not admitted
/// - `max_queue`: how many rendered worker commands may be held ahead of
///   execution (min 1; clamped)
/// - `dry_run`: render and log worker commands without spawning processes
/// - `worker_program`: executable name used as the first token of every
///   rendered worker command
#[derive(Clone, Debug)]
pub struct Config {
    /// Admission ceiling for load divided by parallelism (`0.0` = disabled).
    pub load_ceiling: f64,
    /// Delay between load samples while a spawn is throttled.
    pub sample_interval: Duration,
    /// Maximum number of rendered commands queued ahead of execution.
    pub max_queue: usize,
    /// Render and log commands instead of spawning workers.
    pub dry_run: bool,
    /// Worker executable invoked for each surface.
    pub worker_program: String,
}

impl Config {
    /// Returns the render-ahead queue bound, clamped to a minimum of 1.
    #[inline]
    pub fn max_queue_clamped(&self) -> usize {
        self.max_queue.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `load_ceiling = 0.0` (admission control disabled)
    /// - `sample_interval = 1s`
    /// - `max_queue = 32`
    /// - `dry_run = false`
    /// - `worker_program = "flatsweep-worker"`
    fn default() -> Self {
        Self {
            load_ceiling: 0.0,
            sample_interval: Duration::from_secs(1),
            max_queue: 32,
            dry_run: false,
            worker_program: "flatsweep-worker".to_string(),
        }
    }
}
