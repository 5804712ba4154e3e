//! Fan-out of report events to every attached reporter.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::pipeline::Verdict;
use crate::reporting::reporter::{Fields, Reporter};

/// Dispatches each event to all attached reporters, in attachment order.
///
/// Sources can be muted wholesale; a muted source's events are dropped
/// before any reporter sees them. Attachment order is fixed at construction
/// so externally visible side effects happen in a deterministic order.
pub struct Report {
    reporters: Vec<Arc<dyn Reporter>>,
    ignored: HashSet<String>,
}

impl Report {
    /// Creates a dispatcher over `reporters`.
    pub fn new(reporters: Vec<Arc<dyn Reporter>>) -> Self {
        Self {
            reporters,
            ignored: HashSet::new(),
        }
    }

    /// Mutes all events from `source`.
    pub fn ignore(&mut self, source: impl Into<String>) {
        self.ignored.insert(source.into());
    }

    /// The attached reporters, in attachment order.
    pub fn reporters(&self) -> &[Arc<dyn Reporter>] {
        &self.reporters
    }

    fn muted(&self, source: &str) -> bool {
        self.ignored.contains(source)
    }

    /// Forwards a diagnostic message to every reporter.
    pub async fn log(&self, source: &str, message: &str) -> Result<(), PipelineError> {
        if self.muted(source) {
            return Ok(());
        }
        for reporter in &self.reporters {
            reporter.log(source, message).await?;
        }
        Ok(())
    }

    /// Forwards a terminal verdict to every reporter.
    pub async fn result(
        &self,
        source: &str,
        verdict: Verdict,
        fields: Fields,
    ) -> Result<(), PipelineError> {
        if self.muted(source) {
            return Ok(());
        }
        for reporter in &self.reporters {
            reporter.result(source, verdict, fields.clone()).await?;
        }
        Ok(())
    }

    /// Forwards a progress tick to every reporter.
    pub async fn progress(
        &self,
        source: &str,
        count: u64,
        what: &str,
        total: Option<u64>,
    ) -> Result<(), PipelineError> {
        if self.muted(source) {
            return Ok(());
        }
        for reporter in &self.reporters {
            reporter.progress(source, count, what, total).await?;
        }
        Ok(())
    }

    /// Flushes every reporter, in attachment order.
    pub async fn flush(&self) -> Result<(), PipelineError> {
        for reporter in &self.reporters {
            reporter.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        id: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Command for Recording {
        fn command(&self) -> Vec<String> {
            vec![self.id.to_string()]
        }
    }

    #[async_trait]
    impl Reporter for Recording {
        fn name(&self) -> &'static str {
            self.id
        }

        async fn log(&self, source: &str, message: &str) -> Result<(), PipelineError> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{source}:{message}", self.id));
            Ok(())
        }

        async fn result(
            &self,
            source: &str,
            verdict: Verdict,
            _fields: Fields,
        ) -> Result<(), PipelineError> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{source}:{verdict}", self.id));
            Ok(())
        }

        async fn progress(
            &self,
            source: &str,
            count: u64,
            what: &str,
            total: Option<u64>,
        ) -> Result<(), PipelineError> {
            let total = total.map(|t| format!("/{t}")).unwrap_or_default();
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{source}:{count}{total} {what}", self.id));
            Ok(())
        }
    }

    fn pair() -> (Report, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let report = Report::new(vec![
            Arc::new(Recording {
                id: "a",
                events: events.clone(),
            }),
            Arc::new(Recording {
                id: "b",
                events: events.clone(),
            }),
        ]);
        (report, events)
    }

    #[tokio::test]
    async fn events_fan_out_in_attachment_order() {
        let (report, events) = pair();
        report.log("src", "hello").await.unwrap();
        report.progress("src", 3, "directions", None).await.unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec!["a:src:hello", "b:src:hello", "a:src:3 directions", "b:src:3 directions"]
        );
    }

    #[tokio::test]
    async fn progress_totals_reach_every_reporter() {
        let (report, events) = pair();
        report
            .progress("src", 3, "directions", Some(12))
            .await
            .unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec!["a:src:3/12 directions", "b:src:3/12 directions"]
        );
    }

    #[tokio::test]
    async fn ignored_sources_are_muted_for_all_reporters() {
        let (mut report, events) = pair();
        report.ignore("noisy");

        report.log("noisy", "dropped").await.unwrap();
        report.result("noisy", Verdict::True, Vec::new()).await.unwrap();
        report.result("kept", Verdict::False, Vec::new()).await.unwrap();

        assert_eq!(*events.lock().unwrap(), vec!["a:kept:false", "b:kept:false"]);
    }
}
