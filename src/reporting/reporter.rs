//! The reporter seam: where verdicts and progress leave the process.

use async_trait::async_trait;
use serde_json::Value;

use crate::command::Command;
use crate::error::PipelineError;
use crate::pipeline::Verdict;

/// Ordered key/value details attached to a report entry.
///
/// Order is preserved end to end so log lines and serialized results read
/// the same way the emitting node assembled them.
pub type Fields = Vec<(String, Value)>;

/// A sink for survey events.
///
/// Reporters are the only externally visible side effect of a worker, which
/// is why fan-out order over them is part of the pipeline's deterministic
/// contract.
#[async_trait]
pub trait Reporter: Command + Send + Sync {
    /// Stable name of this reporter, used in commands and logs.
    fn name(&self) -> &'static str;

    /// Records a free-form progress or diagnostic message from `source`.
    async fn log(&self, source: &str, message: &str) -> Result<(), PipelineError>;

    /// Records a terminal verdict from `source`, with bookkeeping details.
    async fn result(
        &self,
        source: &str,
        verdict: Verdict,
        fields: Fields,
    ) -> Result<(), PipelineError>;

    /// Records that `source` has advanced to `count` units of `what`,
    /// out of `total` when the end of the work is known up front.
    async fn progress(
        &self,
        source: &str,
        count: u64,
        what: &str,
        total: Option<u64>,
    ) -> Result<(), PipelineError>;

    /// Flushes buffered output; called once at the very end of a run.
    async fn flush(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}
