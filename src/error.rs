//! Error types used by the flatsweep pipeline and scheduler.
//!
//! This module defines three error enums:
//!
//! - [`PipelineError`] — errors raised while driving a pipeline inside a worker.
//! - [`SchedulerError`] — errors raised by the top-level scheduler itself.
//! - [`CommandError`] — errors raised while parsing a serialized worker command.
//!
//! Exhaustion of a producer and a restart request are *not* errors; they are
//! ordinary variants of [`Production`](crate::pipeline::Production) and
//! [`Resolution`](crate::pipeline::Resolution). Everything in this module is a
//! genuine failure: contradictory cached data, a broken graph invariant, or an
//! I/O problem. All types provide `as_label` for stable snake_case labels in
//! logs.

use thiserror::Error;

/// # Errors raised while driving a pipeline.
///
/// A worker that hits one of these exits with a non-zero status; the
/// scheduler logs the failure and continues with sibling surfaces.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Historic cached verdicts disagree for what should be the same surface.
    ///
    /// Cached data about one surface must be internally consistent; this is
    /// never silently resolved in favor of either verdict.
    #[error("contradictory cached verdicts for {job} on {surface}")]
    Contradiction {
        /// Name of the goal whose records disagree.
        job: String,
        /// Surface the records describe.
        surface: String,
    },

    /// A node could not re-derive itself against a deformed surface during a
    /// restart.
    #[error("cannot rewrite {node} against the deformed surface: {reason}")]
    Rewrite {
        /// Name of the node that failed to re-derive itself.
        node: String,
        /// Why the rewrite failed.
        reason: String,
    },

    /// Cached data could not be decoded.
    #[error("malformed cache data: {0}")]
    Cache(String),

    /// An I/O failure in a reporter or cache backend.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use flatsweep::PipelineError;
    ///
    /// let err = PipelineError::Contradiction {
    ///     job: "cylinder-periodic-direction".into(),
    ///     surface: "Ngon([1, 1, 1])".into(),
    /// };
    /// assert_eq!(err.as_label(), "pipeline_contradiction");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PipelineError::Contradiction { .. } => "pipeline_contradiction",
            PipelineError::Rewrite { .. } => "pipeline_rewrite",
            PipelineError::Cache(_) => "pipeline_cache",
            PipelineError::Io(_) => "pipeline_io",
        }
    }
}

/// # Errors raised by the scheduler runtime.
///
/// Worker *process* failures are deliberately absent here: a crashed worker
/// is logged and isolated, never surfaced as a scheduler error.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Cache pre-consultation during command rendering failed.
    #[error("cache consultation failed: {0}")]
    Cache(#[from] PipelineError),
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::Cache(_) => "scheduler_cache",
        }
    }
}

/// # Errors raised while parsing a serialized worker command.
///
/// The command vector is the only channel between scheduler and worker, so a
/// parse failure means the two sides disagree about the serialization
/// contract and the worker must abort.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// A token does not name any registered node.
    #[error("unrecognized command: {0}")]
    Unrecognized(String),

    /// An option was given without its value.
    #[error("missing value for option {option} of {node}")]
    MissingValue {
        /// Node being parsed.
        node: String,
        /// Option lacking a value.
        option: String,
    },

    /// An option value could not be parsed.
    #[error("invalid value {value:?} for option {option} of {node}")]
    InvalidValue {
        /// Node being parsed.
        node: String,
        /// Option being parsed.
        option: String,
        /// The offending value.
        value: String,
    },

    /// The command names no surface to work on.
    #[error("no surface in worker command")]
    MissingSurface,

    /// The command names no goal to resolve.
    #[error("no goal in worker command")]
    MissingGoal,
}

impl CommandError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandError::Unrecognized(_) => "command_unrecognized",
            CommandError::MissingValue { .. } => "command_missing_value",
            CommandError::InvalidValue { .. } => "command_invalid_value",
            CommandError::MissingSurface => "command_missing_surface",
            CommandError::MissingGoal => "command_missing_goal",
        }
    }
}
