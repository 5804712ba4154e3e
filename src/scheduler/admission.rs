//! Load-based admission of new worker processes.

use std::time::Duration;

use tokio::time::sleep;

/// Samples the 1-minute load average, or `0.0` when the platform refuses.
fn system_load() -> f64 {
    let mut loads = [0f64; 1];
    // SAFETY: getloadavg writes at most `nelem` doubles into the buffer.
    let written = unsafe { libc::getloadavg(loads.as_mut_ptr(), 1) };
    if written < 1 {
        return 0.0;
    }
    loads[0]
}

/// Gate deciding when a new worker process may be spawned.
///
/// A spawn is admitted while the sampled load average divided by the
/// available parallelism stays below the configured ceiling. The gate only
/// throttles new spawns; running workers are never preempted.
pub struct LoadGate {
    ceiling: f64,
    parallelism: f64,
    sampler: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl LoadGate {
    /// Creates a gate sampling the real system load.
    ///
    /// A ceiling of `0.0` disables admission control entirely.
    pub fn system(ceiling: f64) -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1) as f64;
        Self {
            ceiling,
            parallelism,
            sampler: Box::new(system_load),
        }
    }

    /// Creates a gate with an injected load sampler.
    pub fn with_sampler(
        ceiling: f64,
        parallelism: f64,
        sampler: impl Fn() -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            ceiling,
            parallelism,
            sampler: Box::new(sampler),
        }
    }

    /// Whether a spawn would be admitted right now.
    pub fn admissible(&self) -> bool {
        if self.ceiling == 0.0 {
            return true;
        }
        (self.sampler)() / self.parallelism < self.ceiling
    }

    /// Waits until a spawn is admitted, re-sampling every `interval`.
    pub async fn admit(&self, interval: Duration) {
        while !self.admissible() {
            tracing::debug!("load above ceiling; delaying the next worker");
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn zero_ceiling_always_admits() {
        let gate = LoadGate::with_sampler(0.0, 4.0, || f64::INFINITY);
        assert!(gate.admissible());
    }

    #[test]
    fn admission_compares_load_per_core_to_the_ceiling() {
        let gate = LoadGate::with_sampler(0.5, 8.0, || 3.9);
        assert!(gate.admissible()); // 3.9 / 8 < 0.5

        let gate = LoadGate::with_sampler(0.5, 8.0, || 4.1);
        assert!(!gate.admissible()); // 4.1 / 8 >= 0.5
    }

    #[tokio::test(start_paused = true)]
    async fn admit_waits_for_the_load_to_drop() {
        let samples = Arc::new(AtomicU64::new(0));
        let counting = samples.clone();
        // Load is high for two samples, then drops.
        let gate = LoadGate::with_sampler(1.0, 1.0, move || {
            if counting.fetch_add(1, Ordering::Relaxed) < 2 {
                10.0
            } else {
                0.1
            }
        });

        gate.admit(Duration::from_secs(1)).await;
        assert_eq!(samples.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn system_gate_is_constructible() {
        // Smoke test: the libc sampler runs and yields a finite value.
        let gate = LoadGate::system(0.0);
        assert!(gate.admissible());
    }
}
