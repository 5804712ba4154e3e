//! # Surfaces: the parameterized objects a survey sweeps over.
//!
//! A surface is the unit of work: the scheduler enumerates surfaces from
//! generators, renders one worker command per surface, and each worker
//! builds its whole pipeline around exactly one surface.
//!
//! ## Rules
//! - Surfaces are immutable once constructed; a deformation produces a new
//!   surface value, never mutates the old one.
//! - Cached verdicts transfer across deformations: a deformed surface
//!   answers the same questions as the original, so `cache_matches` ignores
//!   the deformation counter.

mod ngon;

pub use ngon::{Ngon, NgonGenerator};

use std::sync::Arc;

use serde_json::Value;

use crate::command::Command;

/// Shared handle to a surface.
pub type SurfaceRef = Arc<dyn Surface>;

/// A translation surface that a survey can pose questions about.
pub trait Surface: Command + Send + Sync {
    /// Human-readable name, used in logs and error messages.
    fn name(&self) -> String;

    /// Filesystem-safe slug, used for per-surface result files.
    fn basename(&self) -> String;

    /// Structured identity of this surface, as stored in cache records.
    fn descriptor(&self) -> Value;

    /// Returns whether a cached record's surface descriptor refers to this
    /// surface (up to equivalence; deformations of one surface match).
    fn cache_matches(&self, descriptor: &Value) -> bool;

    /// Returns a structurally deformed replacement surface, or `None` when
    /// the deformation budget is spent.
    ///
    /// Deforming perturbs the surface without changing which questions it
    /// answers; pipelines stuck on a degenerate configuration restart
    /// against the deformed surface.
    fn deform(&self) -> Option<SurfaceRef>;

    /// The spec that reconstructs this surface in another process.
    fn spec(&self) -> SurfaceSpec;
}

/// Serializable description of a surface, the form that crosses process
/// boundaries inside a worker command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceSpec {
    /// An unfolded n-gon with the given angle multipliers.
    Ngon {
        angles: Vec<u64>,
        deformation: u32,
    },
}

impl SurfaceSpec {
    /// Builds the live surface this spec describes.
    pub fn build(&self) -> SurfaceRef {
        match self {
            SurfaceSpec::Ngon {
                angles,
                deformation,
            } => Arc::new(Ngon::deformed(angles.clone(), *deformation)),
        }
    }
}

impl Command for SurfaceSpec {
    fn command(&self) -> Vec<String> {
        self.build().command()
    }
}
