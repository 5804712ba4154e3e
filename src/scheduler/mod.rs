//! # Scheduler: fanning surfaces out to worker processes.
//!
//! The scheduler walks one or more surface generators, renders one worker
//! command per surface, and spawns worker processes under load admission,
//! supervising each to completion.
//!
//! ```text
//! generators ──round-robin──► cache pre-consultation ──► render command
//!                                   │ (all goals settled: skip)    │
//!                                   ▼                              ▼
//!                            bounded queue ──admit──► spawn ──► JoinSet
//! ```
//!
//! ## Rules
//! - Generators interleave fairly: one surface per generator per round,
//!   exhausted generators are dropped.
//! - At most `max_queue` rendered commands are held ahead of execution.
//! - Admission throttles new spawns only; a running worker is never
//!   preempted or killed.
//! - A crashed worker is logged with its elapsed wall time and does not
//!   abort sibling workers.

mod admission;

pub use admission::LoadGate;

use std::collections::VecDeque;
use std::time::Instant;

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::cache::Cache;
use crate::command::{render, Command};
use crate::config::Config;
use crate::error::SchedulerError;
use crate::surfaces::SurfaceRef;
use crate::worker::{
    CacheSpec, ConnectionsSpec, DecompositionsSpec, GoalSpec, ReporterSpec, WorkerSpec,
};

/// A source of surfaces to survey.
pub type SurfaceGenerator = Box<dyn Iterator<Item = SurfaceRef> + Send>;

/// Orchestrates one survey: surfaces in, supervised worker processes out.
pub struct Scheduler {
    config: Config,
    generators: Vec<SurfaceGenerator>,
    goals: Vec<GoalSpec>,
    reporters: Vec<ReporterSpec>,
    connections: ConnectionsSpec,
    decompositions: DecompositionsSpec,
    cache_spec: CacheSpec,
    cache: Arc<dyn Cache>,
    gate: LoadGate,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler with no generators or goals yet.
    ///
    /// The cache is opened once here and consulted while rendering
    /// commands; the same spec is forwarded to every worker.
    pub fn new(config: Config, cache_spec: CacheSpec) -> Result<Self, SchedulerError> {
        let cache = cache_spec.build()?;
        let gate = LoadGate::system(config.load_ceiling);
        Ok(Self {
            config,
            generators: Vec::new(),
            goals: Vec::new(),
            reporters: Vec::new(),
            connections: ConnectionsSpec::default(),
            decompositions: DecompositionsSpec::default(),
            cache_spec,
            cache,
            gate,
            shutdown: CancellationToken::new(),
        })
    }

    /// Adds a surface generator.
    pub fn add_generator(&mut self, generator: impl Iterator<Item = SurfaceRef> + Send + 'static) {
        self.generators.push(Box::new(generator));
    }

    /// Adds a goal evaluated on every surface.
    pub fn add_goal(&mut self, goal: GoalSpec) {
        self.goals.push(goal);
    }

    /// Adds a reporter attached to every worker.
    pub fn add_reporter(&mut self, reporter: ReporterSpec) {
        self.reporters.push(reporter);
    }

    /// Configures the direction enumeration forwarded to workers.
    pub fn set_connections(&mut self, connections: ConnectionsSpec) {
        self.connections = connections;
    }

    /// Configures the decomposition binding forwarded to workers.
    pub fn set_decompositions(&mut self, decompositions: DecompositionsSpec) {
        self.decompositions = decompositions;
    }

    /// Replaces the admission gate; tests inject a deterministic sampler.
    pub fn with_gate(mut self, gate: LoadGate) -> Self {
        self.gate = gate;
        self
    }

    /// A token that stops scheduling new workers when cancelled.
    ///
    /// Already-running workers are not killed; the scheduler still awaits
    /// them before returning.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The next surface, round-robining fairly across generators.
    fn next_surface(&mut self) -> Option<SurfaceRef> {
        while !self.generators.is_empty() {
            let mut generator = self.generators.remove(0);
            match generator.next() {
                Some(surface) => {
                    self.generators.push(generator);
                    return Some(surface);
                }
                // Exhausted generators are dropped; the rest keep rotating.
                None => continue,
            }
        }
        None
    }

    /// Renders the worker spec for `surface`, or `None` when the cache has
    /// already settled every goal.
    async fn render_command(
        &self,
        surface: &SurfaceRef,
    ) -> Result<Option<WorkerSpec>, SchedulerError> {
        let mut remaining = Vec::new();
        for goal in &self.goals {
            let verdict = goal.cached_verdict(surface, self.cache.as_ref()).await?;
            if verdict.is_definite() {
                tracing::debug!(
                    surface = %surface.name(),
                    goal = goal.name(),
                    %verdict,
                    "goal already settled by the cache"
                );
            } else {
                remaining.push(goal.clone());
            }
        }
        if remaining.is_empty() {
            return Ok(None);
        }
        Ok(Some(WorkerSpec {
            surface: surface.spec(),
            goals: remaining,
            reporters: self.reporters.clone(),
            connections: self.connections.clone(),
            decompositions: self.decompositions.clone(),
            cache: self.cache_spec.clone(),
        }))
    }

    /// Runs the survey to completion.
    ///
    /// Returns once every generator is exhausted and every spawned worker
    /// has been awaited.
    pub async fn run(mut self) -> Result<(), SchedulerError> {
        let mut queue: VecDeque<WorkerSpec> = VecDeque::new();
        let mut workers: JoinSet<()> = JoinSet::new();
        let max_queue = self.config.max_queue_clamped();

        'scheduling: loop {
            while queue.len() < max_queue {
                let Some(surface) = self.next_surface() else {
                    break;
                };
                match self.render_command(&surface).await? {
                    Some(spec) => queue.push_back(spec),
                    None => {
                        tracing::info!(
                            surface = %surface.name(),
                            "every goal settled by the cache; skipping"
                        );
                    }
                }
            }
            let Some(spec) = queue.pop_front() else {
                break;
            };

            tokio::select! {
                _ = self.gate.admit(self.config.sample_interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("shutdown requested; no further workers will start");
                    break 'scheduling;
                }
            }

            let command = spec.command();
            if self.config.dry_run {
                tracing::info!(
                    command = %render(&command),
                    program = %self.config.worker_program,
                    "dry run; not spawning"
                );
                continue;
            }

            let program = self.config.worker_program.clone();
            workers.spawn(supervise(program, command));
        }

        while workers.join_next().await.is_some() {}
        Ok(())
    }
}

/// Supervises one worker process to completion.
///
/// Failures are logged and swallowed here so one crashed surface never
/// takes down its siblings.
async fn supervise(program: String, command: Vec<String>) {
    let started = Instant::now();
    let pretty = render(&command);
    tracing::info!(command = %pretty, %program, "spawning worker");

    match tokio::process::Command::new(&program)
        .args(&command)
        .status()
        .await
    {
        Ok(status) if status.success() => {
            tracing::info!(
                elapsed = ?started.elapsed(),
                command = %pretty,
                "worker finished"
            );
        }
        Ok(status) => {
            tracing::error!(
                elapsed = ?started.elapsed(),
                %status,
                command = %pretty,
                "worker failed"
            );
        }
        Err(error) => {
            tracing::error!(
                elapsed = ?started.elapsed(),
                %error,
                command = %pretty,
                "worker could not be spawned"
            );
        }
    }
}
