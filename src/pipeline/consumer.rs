//! # Consumer facet: folding items into state until resolved.
//!
//! A consumer registers with one or more producers, receives each produced
//! item plus its production cost, and reduces it into internal state. It
//! reports after every item whether it is fully resolved or wants more.
//!
//! ## The resolution loop
//! [`ConsumerCore::resolve`] drives consumption to a fixed point: it
//! round-robins once per round across the producer list, asking each to
//! produce in turn. The round ends the moment any producer yields (the
//! resulting `consume` notification is what may flip `resolved`). A round in
//! which every producer reports exhaustion ends resolution with
//! [`Resolution::Exhausted`] — a normal outcome, not an error: the consumer
//! stays permanently undetermined.
//!
//! ## Rules
//! - `resolved` is monotonic (false → true only).
//! - A consumer must never be asked to consume after it resolved; that is a
//!   graph-construction bug and aborts the worker loudly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::producer::{Produce, Production};
use crate::pipeline::RestartRequest;

/// Outcome of handing one item to a consumer.
#[derive(Debug)]
pub enum Consumption {
    /// The consumer folded the item and wants more data.
    More,
    /// The consumer is fully resolved and must not be notified again.
    Resolved,
    /// The consumer asks for the pipeline to be rebuilt around a replacement
    /// surface.
    Restart(RestartRequest),
}

/// Outcome of driving a consumer to a fixed point.
#[derive(Debug)]
pub enum Resolution {
    /// The consumer resolved; no further input is wanted.
    Resolved,
    /// Every producer ran dry before the consumer resolved. The consumer
    /// stays permanently undetermined. Valid and expected.
    Exhausted,
    /// The pipeline must be rebuilt around a replacement surface.
    Restart(RestartRequest),
}

/// The typed consumer facet for items of type `T`.
#[async_trait]
pub trait Consume<T: Send + Sync>: Send + Sync {
    /// Folds one `item` into internal state.
    ///
    /// `cost` is the wall time it took to produce the item, accumulated
    /// through intermediate processors; consumers may use it to decide what
    /// is worth caching or reporting.
    ///
    /// Precondition: the consumer is not resolved. Violations abort.
    async fn consume(&self, item: &T, cost: Duration) -> Result<Consumption, PipelineError>;

    /// Returns whether this consumer is fully resolved.
    fn is_resolved(&self) -> bool;
}

/// Shared state for a consumer: its producer list and the monotonic
/// `resolved` flag.
///
/// The producer list is fixed at construction — a consumer always registers
/// with its producers before being used, and the graph is never patched
/// afterwards.
pub struct ConsumerCore {
    producers: Vec<Arc<dyn Produce>>,
    resolved: AtomicBool,
}

impl ConsumerCore {
    /// Creates a core attached to `producers`.
    ///
    /// The caller is responsible for registering the owning consumer with
    /// each producer; builders do this immediately after construction.
    pub fn new(producers: Vec<Arc<dyn Produce>>) -> Self {
        Self {
            producers,
            resolved: AtomicBool::new(false),
        }
    }

    /// The producers this consumer pulls from, in round-robin order.
    pub fn producers(&self) -> &[Arc<dyn Produce>] {
        &self.producers
    }

    /// Returns whether this consumer is resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Marks this consumer resolved. Monotonic; repeated calls are no-ops.
    pub fn mark_resolved(&self) {
        self.resolved.store(true, Ordering::Release);
    }

    /// Asserts the precondition that the consumer may still consume.
    #[track_caller]
    pub fn begin_consume(&self) {
        assert!(
            !self.is_resolved(),
            "consumer notified after resolution; graph construction is broken"
        );
    }

    /// Makes the producers generate items until this consumer resolves, a
    /// restart is requested, or every producer is exhausted.
    pub async fn resolve(&self) -> Result<Resolution, PipelineError> {
        while !self.is_resolved() {
            let mut advanced = false;
            for producer in &self.producers {
                match producer.produce().await? {
                    Production::Produced => {
                        advanced = true;
                        break;
                    }
                    Production::Exhausted => continue,
                    Production::Restart(req) => return Ok(Resolution::Restart(req)),
                }
            }
            if !advanced {
                return Ok(Resolution::Exhausted);
            }
        }
        Ok(Resolution::Resolved)
    }
}
