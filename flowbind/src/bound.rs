//! Lifecycle-bound stream wrapper.
//!
//! [`LifecycleBoundStream`] pairs a stream with a lifecycle owner. The
//! wrapper registers itself as a lifecycle observer at construction (before
//! any collection starts) and releases its subscription automatically when
//! the owner is destroyed. At most one subscription task is live per
//! wrapper instance: `collect` cancels and replaces any prior task.
//!
//! Rust streams are consumed values, so a wrapper built from a single
//! stream ([`LifecycleBoundStream::new`]) supports one collection; the
//! cold-stream analogue, where every `collect` call re-subscribes from
//! scratch, is [`LifecycleBoundStream::resubscribing`].

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;

use crate::lifecycle::{Lifecycle, LifecycleObserver, ObserverId};
use crate::task::TaskSlot;

type Source<T> = Box<dyn FnMut() -> Option<BoxStream<'static, T>> + Send>;

struct BoundInner<T> {
    source: Mutex<Source<T>>,
    task: TaskSlot,
}

impl<T: 'static> LifecycleObserver for BoundInner<T> {
    fn on_destroy(&self) {
        self.task.cancel();
        // The wrapper is inert from here on; no new subscription may start.
        *self.source.lock() = Box::new(|| None);
    }
}

/// A stream bound to a lifecycle owner.
///
/// Construction registers the wrapper as an observer immediately but does
/// not start collection; call [`collect`](Self::collect) for that. On the
/// owner's destroy transition the wrapper is deregistered, any running task
/// is force-cancelled, and later `collect` calls become no-ops. Dropping
/// the wrapper before destroy deregisters it as well, releasing the source
/// without waiting for the owner.
pub struct LifecycleBoundStream<T> {
    lifecycle: Lifecycle,
    inner: Arc<BoundInner<T>>,
    observer: ObserverId,
}

impl<T: Send + 'static> LifecycleBoundStream<T> {
    /// Bind an already-materialized stream to `lifecycle`.
    ///
    /// The stream supports a single collection; a second `collect` call
    /// finds the source exhausted and does nothing.
    pub fn new<S>(lifecycle: &Lifecycle, stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let mut slot = Some(stream.boxed());
        Self::with_source(lifecycle, move || slot.take())
    }

    /// Bind a re-subscribable source to `lifecycle`.
    ///
    /// Every `collect` call invokes `subscribe` for a fresh stream, so the
    /// wrapper can be re-collected any number of times before the owner is
    /// destroyed.
    pub fn resubscribing<S, F>(lifecycle: &Lifecycle, mut subscribe: F) -> Self
    where
        F: FnMut() -> S + Send + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        Self::with_source(lifecycle, move || Some(subscribe().boxed()))
    }

    fn with_source<F>(lifecycle: &Lifecycle, source: F) -> Self
    where
        F: FnMut() -> Option<BoxStream<'static, T>> + Send + 'static,
    {
        let source: Source<T> = Box::new(source);
        let inner = Arc::new(BoundInner {
            source: Mutex::new(source),
            task: TaskSlot::default(),
        });
        let observer = lifecycle.add_observer(inner.clone());
        Self {
            lifecycle: lifecycle.clone(),
            inner,
            observer,
        }
    }

    /// Start a subscription task, cancelling and replacing any prior one.
    ///
    /// If no stream is available (one-shot source already consumed, or the
    /// owner destroyed) this logs a warning and leaves the wrapper idle.
    pub fn collect<F>(&self, mut block: F)
    where
        F: FnMut(T) + Send + 'static,
    {
        self.inner.task.cancel();
        let stream = {
            let mut source = self.inner.source.lock();
            (*source)()
        };
        let Some(mut stream) = stream else {
            tracing::warn!("collect on an exhausted or destroyed lifecycle-bound stream; ignoring");
            return;
        };
        let task = self.lifecycle.spawn(async move {
            while let Some(item) = stream.next().await {
                block(item);
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

impl<T> Drop for LifecycleBoundStream<T> {
    fn drop(&mut self) {
        // Releases the boxed source eagerly; a no-op after owner destroy.
        self.lifecycle.remove_observer(self.observer);
    }
}
