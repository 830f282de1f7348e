//! Mutable-state stream and its lifecycle-bound wrapper.
//!
//! [`StateCell`] is a stream that also holds a single current value: reads
//! and atomic updates go through the value slot, and every write is
//! broadcast to subscribers. It is backed by `tokio::sync::watch`, so a
//! subscriber always observes the current value first and the latest value
//! after an inactive span (intermediate writes conflate away).
//!
//! [`LifecycleBoundStateCell`] pairs a cell with a lifecycle owner and a
//! minimum active state, collecting through the gating combinator and
//! re-exposing the cell's accessors. The wrapper copies no state; the value
//! and the stream are the same underlying entity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::gate::gated;
use crate::lifecycle::{Lifecycle, LifecycleObserver, LifecycleState, ObserverId};
use crate::task::TaskSlot;

/// A stream holding a single current value, readable and atomically
/// updatable.
///
/// Clones share the same value slot. Setting a value equal to the previous
/// one still counts as a write; equality deduplication, if wanted, is the
/// consumer's concern.
pub struct StateCell<T> {
    sender: Arc<watch::Sender<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> StateCell<T> {
    /// Create a cell holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Overwrite the current value, notifying subscribers.
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Atomically replace the value with `f(current)`.
    ///
    /// The closure runs exactly once, under the value slot's internal lock;
    /// concurrent compound updates never lose writes.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.sender.send_modify(|value| *value = f(value));
    }

    /// Atomically replace the value with `f(current)` and return the new
    /// value.
    pub fn update_and_get<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut updated = None;
        self.sender.send_modify(|value| {
            *value = f(value);
            updated = Some(value.clone());
        });
        updated.expect("send_modify runs its closure before returning")
    }

    /// Atomically replace the value with `f(current)` and return the prior
    /// value.
    pub fn get_and_update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut prior = None;
        self.sender.send_modify(|value| {
            prior = Some(value.clone());
            *value = f(value);
        });
        prior.expect("send_modify runs its closure before returning")
    }

    /// Subscribe to the cell as a stream.
    ///
    /// Yields the current value immediately, then every subsequent write
    /// that is not conflated away by a newer one.
    #[must_use]
    pub fn subscribe(&self) -> WatchStream<T> {
        WatchStream::new(self.sender.subscribe())
    }

    /// Bind this cell to a lifecycle and start a gated collection.
    ///
    /// The mutable-state form of `bind_to_lifecycle`: constructs a
    /// [`LifecycleBoundStateCell`] sharing this cell's value slot and
    /// immediately collects with `block`.
    pub fn bind_to_lifecycle<F>(
        &self,
        lifecycle: &Lifecycle,
        min_state: LifecycleState,
        block: F,
    ) -> LifecycleBoundStateCell<T>
    where
        F: FnMut(T) + Send + 'static,
    {
        let bound = LifecycleBoundStateCell::new(lifecycle, min_state, self.clone());
        bound.collect(block);
        bound
    }
}

struct BoundCellInner {
    task: TaskSlot,
    destroyed: AtomicBool,
}

impl LifecycleObserver for BoundCellInner {
    fn on_destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        self.task.cancel();
    }
}

/// A [`StateCell`] bound to a lifecycle owner.
///
/// Registered as a lifecycle observer from construction; dropping the
/// wrapper deregisters it. `collect` runs a gated subscription (one task
/// per wrapper, cancel-and-replace); value accessors delegate directly to
/// the underlying cell and keep working after the owner is destroyed,
/// while collection becomes a no-op.
pub struct LifecycleBoundStateCell<T> {
    lifecycle: Lifecycle,
    min_state: LifecycleState,
    cell: StateCell<T>,
    inner: Arc<BoundCellInner>,
    observer: ObserverId,
}

impl<T: Clone + Send + Sync + 'static> LifecycleBoundStateCell<T> {
    /// Bind `cell` to `lifecycle`, gating collection at `min_state`.
    ///
    /// Does not start collection; call [`collect`](Self::collect).
    pub fn new(lifecycle: &Lifecycle, min_state: LifecycleState, cell: StateCell<T>) -> Self {
        let inner = Arc::new(BoundCellInner {
            task: TaskSlot::default(),
            destroyed: AtomicBool::new(false),
        });
        let observer = lifecycle.add_observer(inner.clone());
        Self {
            lifecycle: lifecycle.clone(),
            min_state,
            cell,
            inner,
            observer,
        }
    }

    /// Start a gated subscription task, cancelling and replacing any prior
    /// one. A no-op (with a warning) after the owner is destroyed.
    pub fn collect<F>(&self, mut block: F)
    where
        F: FnMut(T) + Send + 'static,
    {
        if self.inner.destroyed.load(Ordering::Acquire) {
            tracing::warn!("collect on a lifecycle-bound state cell after owner destroy; ignoring");
            return;
        }
        let stream = gated(self.cell.subscribe(), &self.lifecycle, self.min_state);
        let task = self.lifecycle.spawn(async move {
            let mut stream = std::pin::pin!(stream);
            while let Some(value) = stream.next().await {
                block(value);
            }
        });
        self.inner.task.replace(task);
    }

    /// Cancel the current subscription task, if any. Idempotent.
    pub fn cancel(&self) {
        self.inner.task.cancel();
    }

    /// Whether a subscription task is currently live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.task.is_active()
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Overwrite the current value, notifying subscribers.
    pub fn set(&self, value: T) {
        self.cell.set(value);
    }

    /// Atomically replace the value with `f(current)`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.cell.update(f);
    }

    /// Atomically replace the value with `f(current)` and return the new
    /// value.
    pub fn update_and_get<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        self.cell.update_and_get(f)
    }

    /// Atomically replace the value with `f(current)` and return the prior
    /// value.
    pub fn get_and_update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        self.cell.get_and_update(f)
    }

    /// The underlying cell (shared, not copied).
    #[must_use]
    pub fn cell(&self) -> &StateCell<T> {
        &self.cell
    }

    /// The minimum active state collection is gated on.
    #[must_use]
    pub fn min_state(&self) -> LifecycleState {
        self.min_state
    }

    /// The lifecycle this wrapper observes.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// The wrapper's observer registration.
    #[must_use]
    pub fn observer_id(&self) -> ObserverId {
        self.observer
    }
}

impl<T> Drop for LifecycleBoundStateCell<T> {
    fn drop(&mut self) {
        // A no-op after owner destroy; the cell itself may outlive the
        // wrapper through its other clones.
        self.lifecycle.remove_observer(self.observer);
    }
}
