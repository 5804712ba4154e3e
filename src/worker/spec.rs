//! Declarative node specs: what a worker builds its graph from.
//!
//! A spec is the parsed form of a worker command. Specs are plain data:
//! assembling live nodes from them happens through explicit constructor
//! calls in [`Worker::assemble`](crate::worker::Worker::assemble), never
//! through reflection.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{reduce_verdicts, Cache, JsonCache, NoCache};
use crate::command::Command;
use crate::error::PipelineError;
use crate::pipeline::Verdict;
use crate::reporting::{JsonReporter, LogReporter, Reporter};
use crate::surfaces::{SurfaceRef, SurfaceSpec};

/// Spec of a goal node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GoalSpec {
    CylinderPeriodicDirection {
        limit: Option<u64>,
        cache_only: bool,
    },
    CompletelyCylinderPeriodic {
        cache_only: bool,
    },
}

impl GoalSpec {
    /// The job name of the goal this spec describes.
    pub fn name(&self) -> &'static str {
        match self {
            GoalSpec::CylinderPeriodicDirection { .. } => "cylinder-periodic-direction",
            GoalSpec::CompletelyCylinderPeriodic { .. } => "completely-cylinder-periodic",
        }
    }

    /// Folds the cached verdicts about `surface` for this goal.
    ///
    /// This is the scheduler-side pre-consultation: a goal whose cached
    /// verdict is already definite is dropped from the worker command
    /// without ever building a pipeline.
    pub async fn cached_verdict(
        &self,
        surface: &SurfaceRef,
        cache: &dyn Cache,
    ) -> Result<Verdict, PipelineError> {
        let records = cache
            .results(self.name(), &|record| {
                surface.cache_matches(&record.surface)
            })
            .await?;
        reduce_verdicts(
            self.name(),
            &surface.name(),
            records.iter().map(|record| record.verdict()),
        )
    }
}

impl Command for GoalSpec {
    fn command(&self) -> Vec<String> {
        let mut command = vec![self.name().to_string()];
        match self {
            GoalSpec::CylinderPeriodicDirection { limit, cache_only } => {
                if let Some(limit) = limit {
                    command.push("--limit".to_string());
                    command.push(limit.to_string());
                }
                if *cache_only {
                    command.push("--cache-only".to_string());
                }
            }
            GoalSpec::CompletelyCylinderPeriodic { cache_only } => {
                if *cache_only {
                    command.push("--cache-only".to_string());
                }
            }
        }
        command
    }
}

/// Spec of a reporter node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReporterSpec {
    Log,
    Json { dir: PathBuf },
}

impl ReporterSpec {
    /// Builds the live reporter, bound to `surface`.
    pub fn build(&self, surface: &SurfaceRef) -> Arc<dyn Reporter> {
        match self {
            ReporterSpec::Log => Arc::new(LogReporter::new()),
            ReporterSpec::Json { dir } => Arc::new(JsonReporter::new(dir, surface.clone())),
        }
    }
}

impl Command for ReporterSpec {
    fn command(&self) -> Vec<String> {
        match self {
            ReporterSpec::Log => vec!["log".to_string()],
            ReporterSpec::Json { dir } => {
                let mut command = vec!["json".to_string()];
                if *dir != PathBuf::from(".") {
                    command.push("--dir".to_string());
                    command.push(dir.display().to_string());
                }
                command
            }
        }
    }
}

/// Spec of the direction enumeration binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionsSpec {
    pub limit: Option<u64>,
}

impl Command for ConnectionsSpec {
    fn command(&self) -> Vec<String> {
        let mut command = vec!["connections".to_string()];
        if let Some(limit) = self.limit {
            command.push("--limit".to_string());
            command.push(limit.to_string());
        }
        command
    }
}

/// Spec of the decomposition binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecompositionsSpec {
    pub deform_after: Option<u64>,
}

impl Command for DecompositionsSpec {
    fn command(&self) -> Vec<String> {
        let mut command = vec!["decompositions".to_string()];
        if let Some(threshold) = self.deform_after {
            command.push("--deform-after".to_string());
            command.push(threshold.to_string());
        }
        command
    }
}

/// Spec of the cache backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CacheSpec {
    /// No backend configured; every query comes back empty.
    #[default]
    None,
    /// JSON result files from prior runs.
    Json { files: Vec<PathBuf> },
}

impl CacheSpec {
    /// Opens the cache this spec describes.
    pub fn build(&self) -> Result<Arc<dyn Cache>, PipelineError> {
        match self {
            CacheSpec::None => Ok(Arc::new(NoCache)),
            CacheSpec::Json { files } => Ok(Arc::new(JsonCache::open(files)?)),
        }
    }
}

impl Command for CacheSpec {
    fn command(&self) -> Vec<String> {
        match self {
            CacheSpec::None => Vec::new(),
            CacheSpec::Json { files } => {
                let mut command = vec!["cache".to_string()];
                for file in files {
                    command.push("--file".to_string());
                    command.push(file.display().to_string());
                }
                command
            }
        }
    }
}

/// The complete configuration of one worker invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSpec {
    pub surface: SurfaceSpec,
    pub goals: Vec<GoalSpec>,
    pub reporters: Vec<ReporterSpec>,
    pub connections: ConnectionsSpec,
    pub decompositions: DecompositionsSpec,
    pub cache: CacheSpec,
}

impl WorkerSpec {
    /// Re-derives this spec against a deformed replacement surface.
    ///
    /// Goal, reporter, and binding configuration is surface-independent
    /// and carries over unchanged; only the surface spec is replaced.
    pub fn rewrite(&self, surface: &SurfaceRef) -> WorkerSpec {
        WorkerSpec {
            surface: surface.spec(),
            ..self.clone()
        }
    }
}

impl Command for WorkerSpec {
    /// Renders the full worker command: cache, reporters, goals, bindings
    /// with non-default options, and the surface last.
    fn command(&self) -> Vec<String> {
        let mut command = self.cache.command();
        for reporter in &self.reporters {
            command.extend(reporter.command());
        }
        for goal in &self.goals {
            command.extend(goal.command());
        }
        if self.connections != ConnectionsSpec::default() {
            command.extend(self.connections.command());
        }
        if self.decompositions != DecompositionsSpec::default() {
            command.extend(self.decompositions.command());
        }
        command.extend(self.surface.command());
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::Ngon;

    fn spec() -> WorkerSpec {
        WorkerSpec {
            surface: SurfaceSpec::Ngon {
                angles: vec![1, 1, 2],
                deformation: 0,
            },
            goals: vec![
                GoalSpec::CylinderPeriodicDirection {
                    limit: Some(64),
                    cache_only: false,
                },
                GoalSpec::CompletelyCylinderPeriodic { cache_only: false },
            ],
            reporters: vec![ReporterSpec::Json {
                dir: PathBuf::from("results"),
            }],
            connections: ConnectionsSpec { limit: Some(256) },
            decompositions: DecompositionsSpec::default(),
            cache: CacheSpec::None,
        }
    }

    #[test]
    fn command_ends_with_the_surface_and_skips_default_bindings() {
        let command = spec().command();
        assert_eq!(
            command,
            vec![
                "json",
                "--dir",
                "results",
                "cylinder-periodic-direction",
                "--limit",
                "64",
                "completely-cylinder-periodic",
                "connections",
                "--limit",
                "256",
                "ngon",
                "-a",
                "1",
                "-a",
                "1",
                "-a",
                "2",
            ]
        );
    }

    #[test]
    fn rewrite_targets_the_deformed_surface_only() {
        let spec = spec();
        let original = spec.surface.build();
        let deformed = original.deform().expect("budget available");

        let rewritten = spec.rewrite(&deformed);
        assert_eq!(rewritten.goals, spec.goals);
        assert_eq!(rewritten.reporters, spec.reporters);
        assert_eq!(
            rewritten.surface,
            SurfaceSpec::Ngon {
                angles: vec![1, 1, 2],
                deformation: 1,
            }
        );

        // The rendered command references the deformed surface, not the
        // original.
        let command = rewritten.command();
        assert!(command.ends_with(&["--deformation".to_string(), "1".to_string()]));
    }

    #[tokio::test]
    async fn cached_verdict_folds_matching_records() {
        let mut cache = JsonCache::new();
        cache
            .load_reader(
                r#"{"cylinder-periodic-direction": [
                    { "surface": { "type": "Ngon", "angles": [1, 1, 2] }, "result": true },
                    { "surface": { "type": "Ngon", "angles": [5, 5, 5] }, "result": false }
                ]}"#
                .as_bytes(),
            )
            .unwrap();

        let surface: SurfaceRef = Arc::new(Ngon::new(vec![1, 1, 2]));
        let goal = GoalSpec::CylinderPeriodicDirection {
            limit: None,
            cache_only: false,
        };
        assert_eq!(
            goal.cached_verdict(&surface, &cache).await.unwrap(),
            Verdict::True
        );

        let other = GoalSpec::CompletelyCylinderPeriodic { cache_only: false };
        assert_eq!(
            other.cached_verdict(&surface, &cache).await.unwrap(),
            Verdict::Unknown
        );
    }
}
