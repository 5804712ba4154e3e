//! # Worker: one surface, one graph, driven to a fixed point.
//!
//! A worker process handles exactly one surface. It assembles the pipeline
//! graph from its parsed spec, consults the cache, drives every goal to
//! resolution or exhaustion, reports, and exits.
//!
//! ```text
//! run(spec)
//!   └─ loop:
//!        assemble(spec) ──► start()
//!                             ├─ Finished ──► exit
//!                             └─ Restart(deformed) ──► spec.rewrite ──┐
//!                                   ▲                                 │
//!                                   └───── fresh graph ◄──────────────┘
//! ```
//!
//! ## Rules
//! - Assembly is explicit constructor calls from specs; the graph is never
//!   patched after construction.
//! - A restart discards the old graph wholesale. Partial progress not
//!   captured in the rewritten specs is lost by design.
//! - Goals report once, at their own resolution or in the final report
//!   pass; a run that restarts reports nothing, the fresh graph does.

mod spec;

pub use spec::{
    CacheSpec, ConnectionsSpec, DecompositionsSpec, GoalSpec, ReporterSpec, WorkerSpec,
};

use std::sync::Arc;

use rand::Rng;

use crate::command::{render, Command};
use crate::error::PipelineError;
use crate::jobs::{
    ArithmeticModel, CompletelyCylinderPeriodic, Connections, CylinderPeriodicDirection,
    Decomposition, Decompositions, Direction,
};
use crate::pipeline::{Consume, Goal, Produce, Resolution, RestartRequest};
use crate::reporting::{LogReporter, Report, Reporter};
use crate::surfaces::SurfaceRef;

/// How one pass over the graph ended.
#[derive(Debug)]
pub enum Outcome {
    /// Every goal is resolved or exhausted; reports went out.
    Finished,
    /// The pipeline must be rebuilt around a deformed surface. Nothing was
    /// reported; the rebuilt graph reports instead.
    Restart(RestartRequest),
}

/// The assembled graph for one surface.
pub struct Worker {
    surface: SurfaceRef,
    goals: Vec<Arc<dyn Goal>>,
    report: Arc<Report>,
}

impl Worker {
    /// Assembles the pipeline graph described by `spec`.
    ///
    /// `lot` is the random number identifying this invocation in merged
    /// result sets; it survives restarts so a deformed rerun stays
    /// attributable to the same invocation.
    pub fn assemble(spec: &WorkerSpec, lot: u64) -> Result<Self, PipelineError> {
        let surface = spec.surface.build();
        let cache = spec.cache.build()?;

        let reporters: Vec<Arc<dyn Reporter>> = if spec.reporters.is_empty() {
            vec![Arc::new(LogReporter::new())]
        } else {
            spec.reporters
                .iter()
                .map(|reporter| reporter.build(&surface))
                .collect()
        };
        let report = Arc::new(Report::new(reporters));

        let connections = Arc::new(Connections::new(spec.connections.limit));
        let decompositions = Arc::new(Decompositions::new(
            vec![connections.clone() as Arc<dyn Produce>],
            surface.clone(),
            Arc::new(ArithmeticModel),
            report.clone(),
            spec.decompositions.deform_after,
        ));
        connections
            .core()
            .register(&(decompositions.clone() as Arc<dyn Consume<Direction>>));

        let mut goals: Vec<Arc<dyn Goal>> = Vec::with_capacity(spec.goals.len());
        for goal in &spec.goals {
            let upstream = vec![decompositions.clone() as Arc<dyn Produce>];
            match goal {
                GoalSpec::CylinderPeriodicDirection { limit, cache_only } => {
                    let goal = Arc::new(CylinderPeriodicDirection::new(
                        upstream,
                        surface.clone(),
                        cache.clone(),
                        report.clone(),
                        lot,
                        *limit,
                        *cache_only,
                    ));
                    decompositions
                        .out()
                        .register(&(goal.clone() as Arc<dyn Consume<Decomposition>>));
                    goals.push(goal);
                }
                GoalSpec::CompletelyCylinderPeriodic { cache_only } => {
                    let goal = Arc::new(CompletelyCylinderPeriodic::new(
                        upstream,
                        surface.clone(),
                        cache.clone(),
                        report.clone(),
                        lot,
                        *cache_only,
                    ));
                    decompositions
                        .out()
                        .register(&(goal.clone() as Arc<dyn Consume<Decomposition>>));
                    goals.push(goal);
                }
            }
        }

        Ok(Self {
            surface,
            goals,
            report,
        })
    }

    /// The surface this worker operates on.
    pub fn surface(&self) -> &SurfaceRef {
        &self.surface
    }

    /// The assembled goals, in spec order.
    pub fn goals(&self) -> &[Arc<dyn Goal>] {
        &self.goals
    }

    /// Drives every goal to a fixed point.
    ///
    /// Cache consultation runs first for all goals, so a fully cached
    /// surface never triggers live computation. Goals still unresolved are
    /// then resolved in spec order against the shared upstream; finally
    /// every goal reports (resolved or not) and the reporters flush.
    pub async fn start(&self) -> Result<Outcome, PipelineError> {
        for goal in &self.goals {
            goal.consume_cache().await?;
        }

        for goal in &self.goals {
            if goal.is_resolved() {
                continue;
            }
            match goal.resolve().await? {
                Resolution::Resolved | Resolution::Exhausted => {}
                Resolution::Restart(request) => return Ok(Outcome::Restart(request)),
            }
        }

        for goal in &self.goals {
            goal.report().await?;
        }
        self.report.flush().await?;
        Ok(Outcome::Finished)
    }
}

/// Runs a worker to completion, rebuilding on every restart request.
pub async fn run(spec: WorkerSpec) -> Result<(), PipelineError> {
    let lot: u64 = rand::thread_rng().gen();
    let mut spec = spec;
    loop {
        let worker = Worker::assemble(&spec, lot)?;
        tracing::debug!(
            surface = %worker.surface().name(),
            command = %render(&spec.command()),
            "worker graph assembled"
        );
        match worker.start().await? {
            Outcome::Finished => return Ok(()),
            Outcome::Restart(request) => {
                tracing::info!(
                    from = %worker.surface().name(),
                    to = %request.surface.name(),
                    "rebuilding the pipeline around a deformed surface"
                );
                spec = spec.rewrite(&request.surface);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheRecord;
    use crate::pipeline::Verdict;
    use crate::surfaces::SurfaceSpec;

    fn spec(goals: Vec<GoalSpec>) -> WorkerSpec {
        WorkerSpec {
            surface: SurfaceSpec::Ngon {
                angles: vec![1, 1, 1],
                deformation: 0,
            },
            goals,
            reporters: Vec::new(),
            connections: ConnectionsSpec { limit: Some(32) },
            decompositions: DecompositionsSpec::default(),
            cache: CacheSpec::None,
        }
    }

    #[tokio::test]
    async fn both_goals_share_one_decomposition_stream() {
        let worker = Worker::assemble(
            &spec(vec![
                GoalSpec::CylinderPeriodicDirection {
                    limit: None,
                    cache_only: false,
                },
                GoalSpec::CompletelyCylinderPeriodic { cache_only: false },
            ]),
            7,
        )
        .unwrap();

        assert!(matches!(
            worker.start().await.unwrap(),
            Outcome::Finished
        ));
        // With the arithmetic model both questions settle quickly on this
        // surface: some direction is all cylinders, some direction has a
        // minimal component.
        for goal in worker.goals() {
            assert!(goal.is_resolved() || goal.core().verdict() == Verdict::Unknown);
        }
    }

    #[tokio::test]
    async fn cache_only_worker_finishes_without_producing() {
        let worker = Worker::assemble(
            &spec(vec![GoalSpec::CylinderPeriodicDirection {
                limit: None,
                cache_only: true,
            }]),
            7,
        )
        .unwrap();

        assert!(matches!(
            worker.start().await.unwrap(),
            Outcome::Finished
        ));
        assert!(worker.goals()[0].is_resolved());
        assert_eq!(worker.goals()[0].core().verdict(), Verdict::Unknown);
    }

    #[tokio::test]
    async fn json_result_files_feed_a_later_run() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().to_path_buf();

        let mut first = spec(vec![GoalSpec::CylinderPeriodicDirection {
            limit: None,
            cache_only: false,
        }]);
        first.reporters = vec![ReporterSpec::Json {
            dir: results.clone(),
        }];
        run(first).await.unwrap();

        let file = results.join("ngon-1-1-1.json");
        assert!(file.exists());

        // A second run over the same surface settles from the cache alone.
        let mut second = spec(vec![GoalSpec::CylinderPeriodicDirection {
            limit: None,
            cache_only: true,
        }]);
        second.cache = CacheSpec::Json { files: vec![file] };
        let worker = Worker::assemble(&second, 9).unwrap();
        worker.start().await.unwrap();
        let cached = worker.goals()[0].core().verdict();

        // Whatever the first run concluded, the cached verdict agrees.
        let data = std::fs::read_to_string(results.join("ngon-1-1-1.json")).unwrap();
        let records: std::collections::HashMap<String, Vec<CacheRecord>> =
            serde_json::from_str(&data).unwrap();
        let recorded = records["cylinder-periodic-direction"][0].verdict();
        assert_eq!(cached, recorded);
    }

    #[tokio::test]
    async fn restart_rebuilds_against_the_deformed_surface() {
        // The arithmetic model classifies some decompositions as
        // undetermined; an immediate deformation threshold forces at least
        // one restart, and the driver must still finish.
        let mut restarting = spec(vec![GoalSpec::CylinderPeriodicDirection {
            limit: None,
            cache_only: false,
        }]);
        restarting.decompositions = DecompositionsSpec {
            deform_after: Some(1),
        };

        run(restarting.clone()).await.unwrap();

        // The rewrite alone is observable without running: the command of
        // the rewritten spec names the deformed surface.
        let deformed = restarting.surface.build().deform().unwrap();
        let rewritten = restarting.rewrite(&deformed);
        assert!(rewritten
            .command()
            .ends_with(&["--deformation".to_string(), "1".to_string()]));
    }
}
