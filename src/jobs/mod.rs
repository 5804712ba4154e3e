//! # Concrete pipeline nodes.
//!
//! The nodes a worker wires together for one surface:
//!
//! ```text
//!   Connections ──► Decompositions ──┬──► CylinderPeriodicDirection
//!                                    └──► CompletelyCylinderPeriodic
//! ```
//!
//! [`Connections`] enumerates directions on the surface, [`Decompositions`]
//! refines each direction into a flow decomposition, and the goals fold the
//! shared decomposition stream into verdicts. The actual decomposition
//! mathematics sits behind the [`Decompose`] seam; the bundled
//! [`ArithmeticModel`] is a deterministic stand-in.

mod completely_cylinder_periodic;
mod connections;
mod cylinder_periodic_direction;
mod decompositions;

pub use completely_cylinder_periodic::CompletelyCylinderPeriodic;
pub use connections::{Connections, Direction};
pub use cylinder_periodic_direction::CylinderPeriodicDirection;
pub use decompositions::{ArithmeticModel, Component, Decompose, Decomposition, Decompositions};
