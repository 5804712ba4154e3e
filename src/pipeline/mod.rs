//! # Lazy multi-consumer dataflow pipeline.
//!
//! A survey pipeline is a small acyclic graph, built once per surface:
//! sources generate a lazy stream of items, processors refine one stream
//! into another, and goals sit at the ends and fold the stream into a
//! verdict. Because many goals consume the same intermediate stream, shared
//! work is computed once and fanned out instead of being re-derived per
//! goal.
//!
//! ## Architecture
//! ```text
//!   Connections ──► Decompositions ──┬──► CylinderPeriodicDirection
//!    (source)        (processor)     └──► CompletelyCylinderPeriodic
//!
//! Ownership runs downstream → upstream (Arc): a goal keeps its producers
//! alive. Notification runs upstream → downstream (Weak): a producer never
//! keeps a resolved consumer alive.
//! ```
//!
//! ## Rules
//! - Consumers attached to one producer are notified in registration order.
//! - `exhausted` and `resolved` are monotonic (false → true only).
//! - A resolved consumer is removed from its producers and never notified
//!   again; notifying it anyway is a graph-construction bug and aborts.
//! - Exhaustion is a normal terminal outcome, not an error: a goal may stay
//!   undetermined forever.
//! - A restart request travels outward through the same return values as
//!   ordinary progress; nothing unwinds.

mod consumer;
mod goal;
mod processor;
mod producer;

pub use consumer::{Consume, ConsumerCore, Consumption, Resolution};
pub use goal::{Goal, GoalCore, Verdict};
pub use processor::ProcessorCore;
pub use producer::{Produce, ProducerCore, Production};

use crate::surfaces::SurfaceRef;

/// Request to rebuild the pipeline around a replacement surface.
///
/// Raised from deep inside a computation when the current surface cannot be
/// worked on any further (a structural deformation is required to make
/// progress). The worker driver catches it, rewrites every node spec against
/// the replacement, discards the old graph wholesale and reassembles.
/// Partial progress not captured in the rewritten specs is lost by design.
#[derive(Clone)]
pub struct RestartRequest {
    /// The deformed surface to rebuild the pipeline around.
    pub surface: SurfaceRef,
}

impl std::fmt::Debug for RestartRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestartRequest")
            .field("surface", &self.surface.name())
            .finish()
    }
}
