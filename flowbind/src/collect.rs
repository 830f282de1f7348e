//! Extension operations for collecting streams on a lifecycle scope.
//!
//! [`LifecycleStreamExt`] is implemented for every sendable stream. Each
//! operation spawns exactly one subscription task on the owner's scope and
//! returns the [`TaskHandle`] for external cancellation. Values are
//! delivered to the callback strictly in emission order, one at a time.

use futures::{Stream, StreamExt};

use crate::bound::LifecycleBoundStream;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::task::TaskHandle;

/// Lifecycle-aware collection operations on streams.
pub trait LifecycleStreamExt: Stream + Send + Sized + 'static
where
    Self::Item: Send,
{
    /// Collect this stream for the lifetime of the owner's task scope.
    ///
    /// No state gating: items are delivered in every non-destroyed state.
    /// The subscription ends when the stream completes, the handle is
    /// cancelled, or the owner is destroyed.
    fn collect_on<F>(self, lifecycle: &Lifecycle, block: F) -> TaskHandle
    where
        F: FnMut(Self::Item) + Send + 'static,
    {
        lifecycle.spawn(drain(self, block))
    }

    /// Collect this stream while the owner's state is at least `min_state`.
    ///
    /// Delivery pauses when the state drops below the minimum and resumes
    /// automatically when it re-enters the active range; the upstream is
    /// not polled while paused.
    fn collect_gated<F>(
        self,
        lifecycle: &Lifecycle,
        min_state: LifecycleState,
        block: F,
    ) -> TaskHandle
    where
        F: FnMut(Self::Item) + Send + 'static,
    {
        lifecycle.spawn(drain(crate::gate::gated(self, lifecycle, min_state), block))
    }

    /// Collect at most `max_count` items, then self-cancel.
    ///
    /// The callback is invoked exactly `min(max_count, total_emitted)`
    /// times; nothing is forwarded past the `max_count`-th item even when
    /// the upstream has more buffered. `max_count == 0` delivers nothing.
    fn collect_with_count<F>(self, lifecycle: &Lifecycle, max_count: usize, block: F) -> TaskHandle
    where
        F: FnMut(Self::Item) + Send + 'static,
    {
        lifecycle.spawn(drain_counted(self, max_count, block))
    }

    /// Gated, count-limited collection.
    ///
    /// Combines [`collect_gated`](Self::collect_gated) and
    /// [`collect_with_count`](Self::collect_with_count): the count applies
    /// across all active periods and is not reset by pause/resume
    /// transitions.
    fn collect_gated_with_count<F>(
        self,
        lifecycle: &Lifecycle,
        min_state: LifecycleState,
        max_count: usize,
        block: F,
    ) -> TaskHandle
    where
        F: FnMut(Self::Item) + Send + 'static,
    {
        lifecycle.spawn(drain_counted(
            crate::gate::gated(self, lifecycle, min_state),
            max_count,
            block,
        ))
    }

    /// Collect exactly one item, then self-cancel.
    fn collect_once<F>(self, lifecycle: &Lifecycle, block: F) -> TaskHandle
    where
        F: FnMut(Self::Item) + Send + 'static,
    {
        self.collect_with_count(lifecycle, 1, block)
    }

    /// Gated once-only collection.
    fn collect_once_gated<F>(
        self,
        lifecycle: &Lifecycle,
        min_state: LifecycleState,
        block: F,
    ) -> TaskHandle
    where
        F: FnMut(Self::Item) + Send + 'static,
    {
        self.collect_gated_with_count(lifecycle, min_state, 1, block)
    }

    /// Gate this stream on the owner's state without collecting it.
    ///
    /// See [`gated`](crate::gate::gated).
    fn gated(
        self,
        lifecycle: &Lifecycle,
        min_state: LifecycleState,
    ) -> impl Stream<Item = Self::Item> {
        crate::gate::gated(self, lifecycle, min_state)
    }

    /// Wrap this stream in a [`LifecycleBoundStream`] and start collecting.
    ///
    /// The wrapper observes the owner's destroy transition and releases its
    /// subscription automatically; see the `bound` module.
    fn bind_to_lifecycle<F>(self, lifecycle: &Lifecycle, block: F) -> LifecycleBoundStream<Self::Item>
    where
        F: FnMut(Self::Item) + Send + 'static,
        Self::Item: 'static,
    {
        let bound = LifecycleBoundStream::new(lifecycle, self);
        bound.collect(block);
        bound
    }
}

impl<S> LifecycleStreamExt for S
where
    S: Stream + Send + 'static,
    S::Item: Send,
{
}

/// Owner-side forms of the collection operations, for call sites that hold
/// a lifecycle rather than a stream. Each method forwards to the matching
/// [`LifecycleStreamExt`] operation.
impl Lifecycle {
    /// Collect `stream` on this owner's scope; see
    /// [`LifecycleStreamExt::collect_on`].
    pub fn collect_stream<S, F>(&self, stream: S, block: F) -> TaskHandle
    where
        S: Stream + Send + 'static,
        S::Item: Send,
        F: FnMut(S::Item) + Send + 'static,
    {
        stream.collect_on(self, block)
    }

    /// Gated collection of `stream`; see
    /// [`LifecycleStreamExt::collect_gated`].
    pub fn collect_stream_gated<S, F>(
        &self,
        stream: S,
        min_state: LifecycleState,
        block: F,
    ) -> TaskHandle
    where
        S: Stream + Send + 'static,
        S::Item: Send,
        F: FnMut(S::Item) + Send + 'static,
    {
        stream.collect_gated(self, min_state, block)
    }

    /// Count-limited collection of `stream`; see
    /// [`LifecycleStreamExt::collect_with_count`].
    pub fn collect_stream_with_count<S, F>(
        &self,
        stream: S,
        max_count: usize,
        block: F,
    ) -> TaskHandle
    where
        S: Stream + Send + 'static,
        S::Item: Send,
        F: FnMut(S::Item) + Send + 'static,
    {
        stream.collect_with_count(self, max_count, block)
    }

    /// Gated, count-limited collection of `stream`; see
    /// [`LifecycleStreamExt::collect_gated_with_count`].
    pub fn collect_stream_gated_with_count<S, F>(
        &self,
        stream: S,
        min_state: LifecycleState,
        max_count: usize,
        block: F,
    ) -> TaskHandle
    where
        S: Stream + Send + 'static,
        S::Item: Send,
        F: FnMut(S::Item) + Send + 'static,
    {
        stream.collect_gated_with_count(self, min_state, max_count, block)
    }
}

async fn drain<S, F>(stream: S, mut block: F)
where
    S: Stream,
    F: FnMut(S::Item),
{
    let mut stream = std::pin::pin!(stream);
    while let Some(item) = stream.next().await {
        block(item);
    }
}

async fn drain_counted<S, F>(stream: S, max_count: usize, mut block: F)
where
    S: Stream,
    F: FnMut(S::Item),
{
    if max_count == 0 {
        return;
    }
    let mut stream = std::pin::pin!(stream);
    let mut delivered = 0usize;
    while let Some(item) = stream.next().await {
        delivered += 1;
        block(item);
        if delivered >= max_count {
            break;
        }
    }
}
