//! # Producer facet: lazy generation with ordered fan-out.
//!
//! A producer emits a lazy, possibly infinite or possibly empty sequence of
//! items to a dynamic set of registered consumers. [`ProducerCore`] carries
//! the shared state every producer needs: the most recent item, the
//! monotonic exhaustion flag, and the ordered consumer list.
//!
//! ## Notification flow
//! ```text
//! produce()
//!   ├─ exhausted? ──► Production::Exhausted (no side effects)
//!   ├─ generate next item, measure cost
//!   │    └─ nothing left ──► mark exhausted ──► Production::Exhausted
//!   └─ emit(item, cost)
//!        ├─ consumer #1.consume(&item, cost)   (registration order)
//!        ├─ consumer #2.consume(&item, cost)
//!        └─ resolved consumers are removed (at-most-once after resolution)
//! ```
//!
//! ## Rules
//! - Registration is idempotent: registering the same consumer twice never
//!   causes duplicate delivery.
//! - `exhausted` only ever goes false → true; producing past exhaustion is a
//!   cheap no-op.
//! - A consumer that requests a restart aborts the remaining notifications
//!   for this item; the request travels outward as [`Production::Restart`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::consumer::{Consume, Consumption};
use crate::pipeline::RestartRequest;

/// Outcome of asking a producer for one more item.
#[derive(Debug)]
pub enum Production {
    /// An item was generated and all registered consumers were notified.
    Produced,
    /// Nothing more can ever be produced. Terminal and permanent.
    Exhausted,
    /// A downstream consumer asked for the pipeline to be rebuilt around a
    /// replacement surface.
    Restart(RestartRequest),
}

/// The untyped producer facet.
///
/// `produce` is untyped on purpose: consumers pulling a producer do not need
/// to know the item type, only whether progress was made. Items themselves
/// flow through the typed [`Consume`] notifications triggered by `produce`.
#[async_trait]
pub trait Produce: Send + Sync {
    /// Generates the next item and notifies every registered consumer, or
    /// reports exhaustion.
    async fn produce(&self) -> Result<Production, PipelineError>;

    /// Returns whether this producer has been exhausted.
    ///
    /// A producer only learns it is exhausted by being asked to produce at
    /// least once unsuccessfully; this follows from the lazy contract.
    fn is_exhausted(&self) -> bool;
}

/// Shared state and fan-out logic for a producer of `T` items.
///
/// Concrete producers embed a core and call [`ProducerCore::emit`] after
/// generating an item. Consumers are held as [`Weak`] handles so the graph
/// has no reference cycles: goals own their producers, never the other way
/// around.
pub struct ProducerCore<T> {
    current: Mutex<Option<Arc<T>>>,
    consumers: Mutex<Vec<Weak<dyn Consume<T>>>>,
    exhausted: AtomicBool,
}

impl<T: Send + Sync + 'static> Default for ProducerCore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> ProducerCore<T> {
    /// Creates an empty core: no item yet, not exhausted, no consumers.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            consumers: Mutex::new(Vec::new()),
            exhausted: AtomicBool::new(false),
        }
    }

    /// Registers `consumer` to be notified of every future item.
    ///
    /// Consumers are notified in registration order; this order is the
    /// deterministic contract relied upon by reporters with externally
    /// visible side effects. Registering the same consumer again is a no-op.
    pub fn register(&self, consumer: &Arc<dyn Consume<T>>) {
        let handle = Arc::downgrade(consumer);
        let mut consumers = self.consumers.lock().expect("consumer list poisoned");
        if consumers.iter().any(|w| Weak::ptr_eq(w, &handle)) {
            return;
        }
        consumers.push(handle);
    }

    /// Returns the most recently produced item, if any.
    pub fn current(&self) -> Option<Arc<T>> {
        self.current.lock().expect("current item poisoned").clone()
    }

    /// Clears the current item ahead of a fresh pull.
    pub fn clear_current(&self) {
        *self.current.lock().expect("current item poisoned") = None;
    }

    /// Returns whether an item is pending downstream.
    pub fn has_current(&self) -> bool {
        self.current.lock().expect("current item poisoned").is_some()
    }

    /// Marks this producer as permanently exhausted.
    pub fn mark_exhausted(&self) {
        self.exhausted.store(true, Ordering::Release);
    }

    /// Returns whether this producer has been exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    /// Stores `item` as current and notifies all registered consumers of
    /// `(item, cost)`, in registration order.
    ///
    /// Consumers whose `consume` reports resolution are removed and never
    /// notified again. A consumer requesting a restart aborts the remaining
    /// notifications; the request is returned as [`Production::Restart`].
    pub async fn emit(&self, item: T, cost: Duration) -> Result<Production, PipelineError> {
        let item = Arc::new(item);
        *self.current.lock().expect("current item poisoned") = Some(Arc::clone(&item));

        // Snapshot under the lock, notify without it: consume may suspend.
        let snapshot: Vec<Weak<dyn Consume<T>>> = self
            .consumers
            .lock()
            .expect("consumer list poisoned")
            .clone();

        let mut restart = None;
        for handle in snapshot {
            let Some(consumer) = handle.upgrade() else {
                continue;
            };
            // Consumers may resolve outside a notification (cache
            // consultation); never notify past resolution.
            if consumer.is_resolved() {
                continue;
            }
            match consumer.consume(item.as_ref(), cost).await? {
                Consumption::More | Consumption::Resolved => {}
                Consumption::Restart(req) => {
                    restart = Some(req);
                    break;
                }
            }
        }

        self.consumers
            .lock()
            .expect("consumer list poisoned")
            .retain(|w| match w.upgrade() {
                Some(consumer) => !consumer.is_resolved(),
                None => false,
            });

        match restart {
            Some(req) => Ok(Production::Restart(req)),
            None => Ok(Production::Produced),
        }
    }

    /// Number of live registered consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumers
            .lock()
            .expect("consumer list poisoned")
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}
