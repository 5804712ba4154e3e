//! # Goal: a terminal consumer with a verdict.
//!
//! A goal sits at the end of a pipeline. Besides folding items like any
//! consumer, it consults the cache of historic verdicts before any live
//! computation runs, and it reports its verdict to the reporters exactly
//! once.
//!
//! ## State machine
//! ```text
//! Unresolved(cache-pending) ──consume_cache──► Resolved        (short-circuit)
//!            │
//!            └─────────────────► Unresolved(computing)
//!                                     ├──definite verdict──► Resolved
//!                                     └──producers dry────► Unresolved(exhausted)
//! ```
//! `Unresolved(exhausted)` is a valid permanent end state: the goal stays
//! forever undetermined and still reports that fact.
//!
//! ## Rules
//! - Verdicts move monotonically toward certainty; a definite verdict never
//!   reverts to unknown and never flips to the other definite value.
//! - A goal reports a terminal verdict at most once; the final `report` call
//!   is skipped when the verdict already went out at resolution time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::Command;
use crate::error::PipelineError;
use crate::pipeline::consumer::{ConsumerCore, Resolution};

/// Tri-state outcome of a goal.
///
/// `Unknown` is the initial state and a valid terminal one: many questions
/// about a surface can only ever be answered in one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Not (yet) determined.
    Unknown,
    /// Definitely holds.
    True,
    /// Definitely does not hold.
    False,
}

impl Verdict {
    /// Returns whether this is a definite (non-unknown) verdict.
    #[inline]
    pub fn is_definite(self) -> bool {
        !matches!(self, Verdict::Unknown)
    }

    /// Maps to the wire representation used by caches and reporters.
    #[inline]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Verdict::Unknown => None,
            Verdict::True => Some(true),
            Verdict::False => Some(false),
        }
    }
}

impl From<Option<bool>> for Verdict {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Verdict::Unknown,
            Some(true) => Verdict::True,
            Some(false) => Verdict::False,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Unknown => write!(f, "unknown"),
            Verdict::True => write!(f, "true"),
            Verdict::False => write!(f, "false"),
        }
    }
}

/// Shared state for goals: consumer state plus the verdict, the cache-only
/// flag and the reported-once latch.
pub struct GoalCore {
    consumer: ConsumerCore,
    cache_only: bool,
    verdict: Mutex<Verdict>,
    reported: AtomicBool,
}

impl GoalCore {
    /// Creates goal state attached to the given producers.
    pub fn new(consumer: ConsumerCore, cache_only: bool) -> Self {
        Self {
            consumer,
            cache_only,
            verdict: Mutex::new(Verdict::Unknown),
            reported: AtomicBool::new(false),
        }
    }

    /// The consumer facet of this goal.
    pub fn consumer(&self) -> &ConsumerCore {
        &self.consumer
    }

    /// Whether this goal is restricted to cache consultation.
    ///
    /// A cache-only goal resolves from historic verdicts or stays
    /// permanently unknown; it never triggers live computation.
    pub fn cache_only(&self) -> bool {
        self.cache_only
    }

    /// The best verdict known so far.
    pub fn verdict(&self) -> Verdict {
        *self.verdict.lock().expect("verdict poisoned")
    }

    /// Moves the verdict toward certainty and marks the goal resolved when
    /// it becomes definite.
    ///
    /// Settling `Unknown` is a no-op. Settling the opposite definite value
    /// of an already definite verdict is a bug in the goal's fold and
    /// aborts.
    pub fn settle(&self, verdict: Verdict) {
        let mut current = self.verdict.lock().expect("verdict poisoned");
        match (*current, verdict) {
            (_, Verdict::Unknown) => {}
            (Verdict::Unknown, definite) => {
                *current = definite;
                self.consumer.mark_resolved();
            }
            (old, new) if old == new => {}
            (old, new) => {
                panic!("verdict would regress from {old} to {new}; goal fold is broken")
            }
        }
    }

    /// Marks the goal resolved without a definite verdict (e.g. an
    /// exploration limit was reached).
    pub fn give_up(&self) {
        self.consumer.mark_resolved();
    }

    /// Claims the one-shot report latch.
    ///
    /// Returns `true` exactly once; later calls return `false`.
    pub fn claim_report(&self) -> bool {
        !self.reported.swap(true, Ordering::AcqRel)
    }
}

/// A terminal consumer representing a desired verdict about a surface.
#[async_trait]
pub trait Goal: Command + Send + Sync {
    /// Stable job name, used as the cache key and the report source.
    fn name(&self) -> &'static str;

    /// Shared goal state.
    fn core(&self) -> &GoalCore;

    /// Attempts to settle this goal from historic cached verdicts, before
    /// any live computation runs.
    ///
    /// On a definite cached verdict — or whenever the goal is configured
    /// cache-only — the verdict is reported immediately and the goal is
    /// marked resolved, short-circuiting the pipeline entirely.
    async fn consume_cache(&self) -> Result<(), PipelineError>;

    /// Emits the best current verdict plus bookkeeping counters, exactly
    /// once, at the end of a run (whether resolved or merely exhausted).
    async fn report(&self) -> Result<(), PipelineError>;

    /// Returns whether this goal needs no further input.
    fn is_resolved(&self) -> bool {
        self.core().consumer().is_resolved()
    }

    /// Drives the producers until this goal resolves, a restart is
    /// requested, or all producers are exhausted.
    async fn resolve(&self) -> Result<Resolution, PipelineError> {
        self.core().consumer().resolve().await
    }
}
