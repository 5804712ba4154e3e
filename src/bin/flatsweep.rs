//! Scheduler entry point: enumerates surfaces and fans them out to
//! `flatsweep-worker` processes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use flatsweep::{
    CacheSpec, Config, ConnectionsSpec, DecompositionsSpec, GoalSpec, NgonGenerator, ReporterSpec,
    Scheduler,
};

#[derive(Parser, Debug)]
#[command(name = "flatsweep", about = "Survey goals over families of flat surfaces")]
struct Args {
    /// Vertex counts of the n-gon families to survey (repeatable).
    #[arg(long = "vertices", default_values_t = [3usize])]
    vertices: Vec<usize>,

    /// Largest angle-multiplier sum enumerated per family.
    #[arg(long, default_value_t = 10)]
    max_sum: u64,

    /// Survey the cylinder-periodic-direction goal.
    #[arg(long)]
    cylinder_periodic_direction: bool,

    /// Survey the completely-cylinder-periodic goal.
    #[arg(long)]
    completely_cylinder_periodic: bool,

    /// Direction budget for the cylinder-periodic-direction goal.
    #[arg(long)]
    limit: Option<u64>,

    /// Resolve goals from the cache only; never compute.
    #[arg(long)]
    cache_only: bool,

    /// Bound on enumerated directions per surface.
    #[arg(long)]
    connections_limit: Option<u64>,

    /// Deform the surface after this many undetermined decompositions.
    #[arg(long)]
    deform_after: Option<u64>,

    /// Write per-surface JSON result files into this directory.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Also report through the structured log.
    #[arg(long)]
    log: bool,

    /// JSON result files from prior runs, used as the verdict cache
    /// (repeatable).
    #[arg(long = "cache")]
    cache: Vec<PathBuf>,

    /// Admission ceiling for load average / parallelism (0 disables).
    #[arg(long, default_value_t = 0.0)]
    load_ceiling: f64,

    /// Milliseconds between load samples while throttled.
    #[arg(long, default_value_t = 1000)]
    sample_interval_ms: u64,

    /// Rendered worker commands held ahead of execution.
    #[arg(long, default_value_t = 32)]
    queue: usize,

    /// Render and log worker commands without spawning processes.
    #[arg(long)]
    dry_run: bool,

    /// Worker executable to spawn per surface.
    #[arg(long, default_value = "flatsweep-worker")]
    worker: String,
}

impl Args {
    fn goals(&self) -> Vec<GoalSpec> {
        let mut goals = Vec::new();
        if self.cylinder_periodic_direction {
            goals.push(GoalSpec::CylinderPeriodicDirection {
                limit: self.limit,
                cache_only: self.cache_only,
            });
        }
        if self.completely_cylinder_periodic {
            goals.push(GoalSpec::CompletelyCylinderPeriodic {
                cache_only: self.cache_only,
            });
        }
        goals
    }

    fn cache_spec(&self) -> CacheSpec {
        if self.cache.is_empty() {
            CacheSpec::None
        } else {
            CacheSpec::Json {
                files: self.cache.clone(),
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let goals = args.goals();
    if goals.is_empty() {
        tracing::error!("no goals selected; nothing to survey");
        return ExitCode::from(2);
    }

    let config = Config {
        load_ceiling: args.load_ceiling,
        sample_interval: Duration::from_millis(args.sample_interval_ms),
        max_queue: args.queue,
        dry_run: args.dry_run,
        worker_program: args.worker.clone(),
    };

    let mut scheduler = match Scheduler::new(config, args.cache_spec()) {
        Ok(scheduler) => scheduler,
        Err(error) => {
            tracing::error!(%error, label = error.as_label(), "cannot open the cache");
            return ExitCode::FAILURE;
        }
    };

    for vertices in &args.vertices {
        scheduler.add_generator(NgonGenerator::new(*vertices, args.max_sum));
    }
    for goal in goals {
        scheduler.add_goal(goal);
    }
    if args.log {
        scheduler.add_reporter(ReporterSpec::Log);
    }
    if let Some(dir) = &args.json {
        scheduler.add_reporter(ReporterSpec::Json { dir: dir.clone() });
    }
    scheduler.set_connections(ConnectionsSpec {
        limit: args.connections_limit,
    });
    scheduler.set_decompositions(DecompositionsSpec {
        deform_after: args.deform_after,
    });

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    match scheduler.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, label = error.as_label(), "survey failed");
            ExitCode::FAILURE
        }
    }
}
