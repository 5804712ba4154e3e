//! # flatsweep
//!
//! **Flatsweep** runs large parameter sweeps over families of translation
//! surfaces.
//!
//! Per surface, a set of goals (tri-state verdicts) share expensive
//! intermediate computations through a lazy dataflow pipeline driven to a
//! fixed point inside a worker process; a top-level scheduler fans surfaces
//! out to worker processes under system-load admission control.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Surface    │   │   Surface    │   │   Surface    │
//!     │ (generator A)│   │ (generator A)│   │ (generator B)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - round-robin across generators (fair interleaving)              │
//! │  - cache pre-consultation (drop settled goals, skip surfaces)     │
//! │  - bounded render-ahead queue of worker commands                  │
//! │  - LoadGate (admission: load / parallelism < ceiling)             │
//! └──────┬──────────────────────┬──────────────────────┬──────────────┘
//!        ▼                      ▼                      ▼
//!  ┌───────────────┐     ┌───────────────┐     ┌───────────────┐
//!  │ worker process│     │ worker process│     │ worker process│
//!  │ (one surface) │     │ (one surface) │     │ (one surface) │
//!  └───────┬───────┘     └───────────────┘     └───────────────┘
//!          │
//!          ▼  inside one worker
//!   Connections ──► Decompositions ──┬──► CylinderPeriodicDirection
//!    (producer)       (processor)    └──► CompletelyCylinderPeriodic
//!                                            │           │
//!                                         Cache ◄──┐   Report ──► log / json
//!                                      (short-circuit)
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! parse command (Registry) ──► assemble graph ──► consume_cache (all goals)
//!
//! loop {
//!   ├─► resolve each unresolved goal (round-robin over its producers)
//!   │       ├─ Resolved / Exhausted ─► next goal
//!   │       └─ Restart(deformed)    ─► rewrite specs, rebuild graph, retry
//!   ├─► report every goal (resolved or permanently unknown)
//!   └─► flush reporters, exit 0
//! }
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                  |
//! |-----------------|----------------------------------------------------------|-------------------------------------|
//! | **Pipeline**    | Lazy multi-consumer dataflow with shared intermediates.  | [`Produce`], [`Consume`], [`Goal`]  |
//! | **Cache**       | Historic verdicts short-circuit live computation.        | [`Cache`], [`JsonCache`]            |
//! | **Reporting**   | Deterministic fan-out of results and progress.           | [`Reporter`], [`Report`]            |
//! | **Surfaces**    | Parameterized objects with exact command round-trips.    | [`Surface`], [`Ngon`]               |
//! | **Scheduling**  | Load-admitted fan-out to supervised worker processes.    | [`Scheduler`], [`LoadGate`]         |
//! | **Restart**     | Wholesale pipeline rebuild around a deformed surface.    | [`RestartRequest`], [`WorkerSpec`]  |
//! | **Errors**      | Typed errors with stable log labels.                     | [`PipelineError`], [`SchedulerError`] |

pub mod cache;
pub mod jobs;
pub mod pipeline;
pub mod reporting;
pub mod scheduler;
pub mod surfaces;
pub mod worker;

mod command;
mod config;
mod error;
mod registry;

// ---- Public re-exports ----

pub use cache::{Cache, CacheRecord, JsonCache, NoCache};
pub use command::{render, Command};
pub use config::Config;
pub use error::{CommandError, PipelineError, SchedulerError};
pub use pipeline::{
    Consume, ConsumerCore, Consumption, Goal, GoalCore, Produce, ProducerCore, Production,
    Resolution, RestartRequest, Verdict,
};
pub use registry::Registry;
pub use reporting::{JsonReporter, LogReporter, Report, Reporter};
pub use scheduler::{LoadGate, Scheduler};
pub use surfaces::{Ngon, NgonGenerator, Surface, SurfaceRef, SurfaceSpec};
pub use worker::{
    CacheSpec, ConnectionsSpec, DecompositionsSpec, GoalSpec, ReporterSpec, WorkerSpec,
};
