//! Enumeration of directions on a surface.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;

use crate::command::Command;
use crate::error::PipelineError;
use crate::pipeline::{Produce, ProducerCore, Production};

/// A rational direction on the surface, as a primitive slope `y/x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Direction {
    pub x: u64,
    pub y: u64,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Lazily enumerates the directions of saddle connections on a surface.
///
/// Directions come out of a breadth-first walk of the Stern-Brocot tree:
/// every primitive slope appears exactly once, and coarse (small numerator
/// and denominator) directions come before finer ones. The walk is infinite
/// unless a `limit` bounds the exploration.
pub struct Connections {
    core: ProducerCore<Direction>,
    /// Pending Stern-Brocot intervals, as (left, right) endpoint fractions.
    intervals: Mutex<VecDeque<((u64, u64), (u64, u64))>>,
    emitted: AtomicU64,
    limit: Option<u64>,
}

impl Connections {
    /// Creates an enumerator over all directions, coarsest first.
    pub fn new(limit: Option<u64>) -> Self {
        let mut intervals = VecDeque::new();
        // The root interval spans slope 0 (horizontal) to infinity (vertical).
        intervals.push_back(((0, 1), (1, 0)));
        Self {
            core: ProducerCore::new(),
            intervals: Mutex::new(intervals),
            emitted: AtomicU64::new(0),
            limit,
        }
    }

    /// The producer state, for registering downstream consumers.
    pub fn core(&self) -> &ProducerCore<Direction> {
        &self.core
    }

    /// How many directions have been emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    fn next_direction(&self) -> Option<Direction> {
        if let Some(limit) = self.limit {
            if self.emitted.load(Ordering::Relaxed) >= limit {
                return None;
            }
        }
        let mut intervals = self.intervals.lock().expect("interval queue poisoned");
        let ((a, b), (c, d)) = intervals.pop_front()?;
        let mediant = (a + c, b + d);
        intervals.push_back(((a, b), mediant));
        intervals.push_back((mediant, (c, d)));
        self.emitted.fetch_add(1, Ordering::Relaxed);
        Some(Direction {
            x: mediant.1,
            y: mediant.0,
        })
    }
}

impl Command for Connections {
    fn command(&self) -> Vec<String> {
        let mut command = vec!["connections".to_string()];
        if let Some(limit) = self.limit {
            command.push("--limit".to_string());
            command.push(limit.to_string());
        }
        command
    }
}

#[async_trait]
impl Produce for Connections {
    async fn produce(&self) -> Result<Production, PipelineError> {
        if self.core.is_exhausted() {
            return Ok(Production::Exhausted);
        }
        let started = Instant::now();
        match self.next_direction() {
            None => {
                self.core.mark_exhausted();
                Ok(Production::Exhausted)
            }
            Some(direction) => self.core.emit(direction, started.elapsed()).await,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.core.is_exhausted()
    }
}
