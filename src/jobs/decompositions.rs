//! Flow decompositions of a surface in a given direction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::command::Command;
use crate::error::PipelineError;
use crate::jobs::connections::Direction;
use crate::pipeline::{
    Consume, Consumption, Produce, ProcessorCore, Production, RestartRequest,
};
use crate::reporting::Report;
use crate::surfaces::SurfaceRef;

/// One component of a flow decomposition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    /// A periodic cylinder.
    Cylinder,
    /// A minimal (dense) component.
    Minimal,
    /// The computation could not classify this component.
    Undetermined,
}

/// The flow decomposition of a surface in one direction.
#[derive(Clone, Debug)]
pub struct Decomposition {
    pub direction: Direction,
    pub components: Vec<Component>,
}

impl Decomposition {
    /// Whether the flow in this direction is completely periodic.
    pub fn is_completely_cylindrical(&self) -> bool {
        !self.components.is_empty()
            && self.components.iter().all(|c| *c == Component::Cylinder)
    }

    /// Whether any component is minimal.
    pub fn has_minimal_component(&self) -> bool {
        self.components.contains(&Component::Minimal)
    }

    /// Whether any component resisted classification.
    pub fn has_undetermined_component(&self) -> bool {
        self.components.contains(&Component::Undetermined)
    }
}

/// The seam to the actual decomposition mathematics.
///
/// Real implementations delegate to an external computer algebra kernel;
/// the bundled [`ArithmeticModel`] is a deterministic stand-in that keeps
/// the pipeline exercisable without one.
pub trait Decompose: Send + Sync {
    /// Decomposes `surface` in `direction`.
    fn decompose(&self, surface: &SurfaceRef, direction: &Direction) -> Decomposition;
}

/// Deterministic arithmetic stand-in for the decomposition seam.
///
/// Component kinds are derived from the direction and the surface command
/// tokens alone, so a given surface/direction pair always decomposes the
/// same way, across runs and across processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArithmeticModel;

impl ArithmeticModel {
    fn seed(surface: &SurfaceRef, direction: &Direction) -> u64 {
        let mut seed = direction
            .x
            .wrapping_mul(31)
            .wrapping_add(direction.y.wrapping_mul(17));
        for token in surface.command() {
            for byte in token.bytes() {
                seed = seed.wrapping_mul(131).wrapping_add(u64::from(byte));
            }
        }
        seed
    }
}

impl Decompose for ArithmeticModel {
    fn decompose(&self, surface: &SurfaceRef, direction: &Direction) -> Decomposition {
        let seed = Self::seed(surface, direction);
        let count = 1 + (seed % 3) as usize;
        let components = (0..count)
            .map(|i| match seed.wrapping_add(i as u64 * 7) % 11 {
                0..=6 => Component::Cylinder,
                7..=9 => Component::Minimal,
                _ => Component::Undetermined,
            })
            .collect();
        Decomposition {
            direction: *direction,
            components,
        }
    }
}

/// Refines the direction stream into a decomposition stream.
///
/// Each direction is decomposed exactly once, no matter how many goals
/// consume the result. When too many decompositions in a row resist
/// classification, the processor asks for the pipeline to be rebuilt around
/// a deformed surface; degenerate coordinates on the original often block
/// the classification, and a deformation unblocks it.
pub struct Decompositions {
    core: ProcessorCore<Decomposition>,
    surface: SurfaceRef,
    model: Arc<dyn Decompose>,
    report: Arc<Report>,
    processed: AtomicU64,
    undetermined: AtomicU64,
    /// Restart threshold on undetermined decompositions; `None` disables
    /// deformation entirely.
    deform_after: Option<u64>,
}

impl Decompositions {
    /// Creates a processor decomposing `surface` via `model`, pulling
    /// directions from `upstream`.
    pub fn new(
        upstream: Vec<Arc<dyn Produce>>,
        surface: SurfaceRef,
        model: Arc<dyn Decompose>,
        report: Arc<Report>,
        deform_after: Option<u64>,
    ) -> Self {
        Self {
            core: ProcessorCore::new(upstream),
            surface,
            model,
            report,
            processed: AtomicU64::new(0),
            undetermined: AtomicU64::new(0),
            deform_after,
        }
    }

    /// The downstream producer state, for registering goals.
    pub fn out(&self) -> &crate::pipeline::ProducerCore<Decomposition> {
        &self.core.out
    }

    fn wants_deformation(&self, undetermined: u64) -> bool {
        match self.deform_after {
            Some(threshold) => undetermined >= threshold,
            None => false,
        }
    }
}

impl Command for Decompositions {
    fn command(&self) -> Vec<String> {
        let mut command = vec!["decompositions".to_string()];
        if let Some(threshold) = self.deform_after {
            command.push("--deform-after".to_string());
            command.push(threshold.to_string());
        }
        command
    }
}

#[async_trait]
impl Consume<Direction> for Decompositions {
    async fn consume(
        &self,
        direction: &Direction,
        cost: Duration,
    ) -> Result<Consumption, PipelineError> {
        self.core.consumer.begin_consume();

        let started = Instant::now();
        let decomposition = self.model.decompose(&self.surface, direction);
        let cost = cost + started.elapsed();

        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        self.report
            .progress("decompositions", processed, "decompositions", None)
            .await?;

        if decomposition.has_undetermined_component() {
            let undetermined = self.undetermined.fetch_add(1, Ordering::Relaxed) + 1;
            if self.wants_deformation(undetermined) {
                if let Some(deformed) = self.surface.deform() {
                    self.report
                        .log(
                            "decompositions",
                            &format!(
                                "{undetermined} undetermined decompositions; deforming to {}",
                                deformed.name()
                            ),
                        )
                        .await?;
                    return Ok(Consumption::Restart(RestartRequest { surface: deformed }));
                }
            }
        }

        match self.core.out.emit(decomposition, cost).await? {
            Production::Restart(req) => Ok(Consumption::Restart(req)),
            _ => Ok(Consumption::More),
        }
    }

    fn is_resolved(&self) -> bool {
        self.core.consumer.is_resolved()
    }
}

#[async_trait]
impl Produce for Decompositions {
    async fn produce(&self) -> Result<Production, PipelineError> {
        self.core.pull().await
    }

    fn is_exhausted(&self) -> bool {
        self.core.out.is_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::connections::Connections;
    use crate::surfaces::Ngon;

    fn surface() -> SurfaceRef {
        Arc::new(Ngon::new(vec![1, 1, 1]))
    }

    fn quiet_report() -> Arc<Report> {
        Arc::new(Report::new(Vec::new()))
    }

    /// Always classifies everything as undetermined.
    struct Opaque;

    impl Decompose for Opaque {
        fn decompose(&self, _surface: &SurfaceRef, direction: &Direction) -> Decomposition {
            Decomposition {
                direction: *direction,
                components: vec![Component::Undetermined],
            }
        }
    }

    fn attach(
        connections: &Arc<Connections>,
        model: Arc<dyn Decompose>,
        deform_after: Option<u64>,
    ) -> Arc<Decompositions> {
        let decompositions = Arc::new(Decompositions::new(
            vec![connections.clone() as Arc<dyn Produce>],
            surface(),
            model,
            quiet_report(),
            deform_after,
        ));
        connections
            .core()
            .register(&(decompositions.clone() as Arc<dyn Consume<Direction>>));
        decompositions
    }

    #[tokio::test]
    async fn model_is_deterministic() {
        let surface = surface();
        let direction = Direction { x: 2, y: 1 };
        let a = ArithmeticModel.decompose(&surface, &direction);
        let b = ArithmeticModel.decompose(&surface, &direction);
        assert_eq!(a.components, b.components);
    }

    #[tokio::test]
    async fn pull_forwards_one_decomposition_per_direction() {
        let connections = Arc::new(Connections::new(Some(3)));
        let decompositions = attach(&connections, Arc::new(ArithmeticModel), None);

        let mut produced = 0;
        loop {
            match decompositions.produce().await.unwrap() {
                Production::Produced => produced += 1,
                Production::Exhausted => break,
                Production::Restart(_) => unreachable!("deformation disabled"),
            }
        }
        assert_eq!(produced, 3);
        assert!(decompositions.is_exhausted());
    }

    #[tokio::test]
    async fn undetermined_pileup_requests_a_deformed_restart() {
        let connections = Arc::new(Connections::new(None));
        let decompositions = attach(&connections, Arc::new(Opaque), Some(2));

        assert!(matches!(
            decompositions.produce().await.unwrap(),
            Production::Produced
        ));
        match decompositions.produce().await.unwrap() {
            Production::Restart(req) => {
                assert_eq!(req.surface.name(), "Ngon([1, 1, 1]; deformation 1)");
            }
            other => panic!("expected a restart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn spent_deformation_budget_disables_restarts() {
        let connections = Arc::new(Connections::new(Some(4)));
        let decompositions = Arc::new(Decompositions::new(
            vec![connections.clone() as Arc<dyn Produce>],
            Arc::new(Ngon::deformed(vec![1, 1, 1], 3)),
            Arc::new(Opaque),
            quiet_report(),
            Some(1),
        ));
        connections
            .core()
            .register(&(decompositions.clone() as Arc<dyn Consume<Direction>>));

        // The budget is spent, so the stream continues undeterminedly
        // instead of restarting.
        let mut produced = 0;
        loop {
            match decompositions.produce().await.unwrap() {
                Production::Produced => produced += 1,
                Production::Exhausted => break,
                Production::Restart(_) => panic!("budget is spent; no restart expected"),
            }
        }
        assert_eq!(produced, 4);
    }

    #[test]
    fn deform_after_is_rendered_only_when_set() {
        let connections = Arc::new(Connections::new(None));
        assert_eq!(
            attach(&connections, Arc::new(ArithmeticModel), None).command(),
            vec!["decompositions".to_string()]
        );
        assert_eq!(
            attach(&connections, Arc::new(ArithmeticModel), Some(10)).command(),
            vec![
                "decompositions".to_string(),
                "--deform-after".to_string(),
                "10".to_string()
            ]
        );
    }
}
