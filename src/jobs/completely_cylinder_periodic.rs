//! Goal: is the surface completely cylinder periodic?

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{reduce_verdicts, Cache};
use crate::command::Command;
use crate::error::PipelineError;
use crate::jobs::decompositions::Decomposition;
use crate::pipeline::{Consume, ConsumerCore, Consumption, Goal, GoalCore, Produce, Verdict};
use crate::reporting::{Fields, Report};
use crate::surfaces::SurfaceRef;

/// Resolves `False` as soon as one decomposition has a minimal component.
///
/// The positive answer quantifies over all directions, so live computation
/// can never settle `True`; only a cached verdict from an exhaustive prior
/// analysis can. Without a counterexample the goal stays unknown.
pub struct CompletelyCylinderPeriodic {
    core: GoalCore,
    surface: SurfaceRef,
    cache: Arc<dyn Cache>,
    report: Arc<Report>,
    lot: u64,
    seen: AtomicU64,
}

impl CompletelyCylinderPeriodic {
    pub const NAME: &'static str = "completely-cylinder-periodic";

    /// Creates the goal, consuming decompositions from `upstream`.
    pub fn new(
        upstream: Vec<Arc<dyn Produce>>,
        surface: SurfaceRef,
        cache: Arc<dyn Cache>,
        report: Arc<Report>,
        lot: u64,
        cache_only: bool,
    ) -> Self {
        Self {
            core: GoalCore::new(ConsumerCore::new(upstream), cache_only),
            surface,
            cache,
            report,
            lot,
            seen: AtomicU64::new(0),
        }
    }

    fn fields(&self, cached: bool) -> Fields {
        let mut fields: Fields = vec![
            ("lot".to_string(), serde_json::json!(self.lot)),
            (
                "directions".to_string(),
                serde_json::json!(self.seen.load(Ordering::Relaxed)),
            ),
        ];
        if cached {
            fields.push(("cached".to_string(), serde_json::json!(true)));
        }
        fields
    }

    async fn report_now(&self, cached: bool) -> Result<(), PipelineError> {
        if self.core.claim_report() {
            self.report
                .result(Self::NAME, self.core.verdict(), self.fields(cached))
                .await?;
        }
        Ok(())
    }
}

impl Command for CompletelyCylinderPeriodic {
    fn command(&self) -> Vec<String> {
        let mut command = vec![Self::NAME.to_string()];
        if self.core.cache_only() {
            command.push("--cache-only".to_string());
        }
        command
    }
}

#[async_trait]
impl Consume<Decomposition> for CompletelyCylinderPeriodic {
    async fn consume(
        &self,
        decomposition: &Decomposition,
        _cost: Duration,
    ) -> Result<Consumption, PipelineError> {
        self.core.consumer().begin_consume();
        self.seen.fetch_add(1, Ordering::Relaxed);

        if decomposition.has_minimal_component() {
            self.report
                .log(
                    Self::NAME,
                    &format!(
                        "direction {} has a minimal component",
                        decomposition.direction
                    ),
                )
                .await?;
            self.core.settle(Verdict::False);
            self.report_now(false).await?;
            return Ok(Consumption::Resolved);
        }

        Ok(Consumption::More)
    }

    fn is_resolved(&self) -> bool {
        self.core.consumer().is_resolved()
    }
}

#[async_trait]
impl Goal for CompletelyCylinderPeriodic {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn core(&self) -> &GoalCore {
        &self.core
    }

    async fn consume_cache(&self) -> Result<(), PipelineError> {
        let records = self
            .cache
            .results(Self::NAME, &|record| {
                self.surface.cache_matches(&record.surface)
            })
            .await?;
        let verdict = reduce_verdicts(
            Self::NAME,
            &self.surface.name(),
            records.iter().map(|record| record.verdict()),
        )?;

        if verdict.is_definite() {
            self.core.settle(verdict);
            self.report_now(true).await?;
        } else if self.core.cache_only() {
            self.core.give_up();
            self.report_now(true).await?;
        }
        Ok(())
    }

    async fn report(&self) -> Result<(), PipelineError> {
        self.report_now(false).await
    }
}
