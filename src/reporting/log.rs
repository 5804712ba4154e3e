//! Reporter emitting human-readable lines through `tracing`.

use async_trait::async_trait;

use crate::command::Command;
use crate::error::PipelineError;
use crate::pipeline::Verdict;
use crate::reporting::reporter::{Fields, Reporter};

/// Writes every event as one structured log line.
///
/// This reporter is stateless; nothing is buffered and `flush` is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

fn render_fields(fields: &Fields) -> String {
    fields
        .iter()
        .map(|(key, value)| format!(" ({key}: {value})"))
        .collect()
}

fn render_progress(count: u64, what: &str, total: Option<u64>) -> String {
    match total {
        Some(total) => format!("{count}/{total} {what}"),
        None => format!("{count} {what}"),
    }
}

impl Command for LogReporter {
    fn command(&self) -> Vec<String> {
        vec!["log".to_string()]
    }
}

#[async_trait]
impl Reporter for LogReporter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn log(&self, source: &str, message: &str) -> Result<(), PipelineError> {
        tracing::info!(target: "flatsweep::report", "[{source}] {message}");
        Ok(())
    }

    async fn result(
        &self,
        source: &str,
        verdict: Verdict,
        fields: Fields,
    ) -> Result<(), PipelineError> {
        tracing::info!(
            target: "flatsweep::report",
            "[{source}] result: {verdict}{}",
            render_fields(&fields)
        );
        Ok(())
    }

    async fn progress(
        &self,
        source: &str,
        count: u64,
        what: &str,
        total: Option<u64>,
    ) -> Result<(), PipelineError> {
        tracing::info!(
            target: "flatsweep::report",
            "[{source}] {}",
            render_progress(count, what, total)
        );
        Ok(())
    }
}
