//! Lifecycle gating for streams.
//!
//! [`gated`] is the gating combinator behind every `*_gated` collect
//! operation: it forwards items only while the owner's state is at or above
//! a minimum, and while below it neither delivers to the consumer nor polls
//! the upstream stream. Items the upstream buffers during an inactive span
//! are consumed after the state re-enters the active range; sources that
//! conflate (such as a state cell) naturally resume with their latest value.

use futures::stream::{self, Stream, StreamExt};

use crate::lifecycle::{Lifecycle, LifecycleState};

/// Gate `stream` on `lifecycle`, requiring at least `min_state`.
///
/// The returned stream:
///
/// - forwards upstream items unchanged while the state is at least
///   `min_state`;
/// - suspends without polling upstream while the state is below it, waking
///   on the next transition;
/// - completes when the lifecycle is destroyed or the upstream ends.
pub fn gated<S>(
    stream: S,
    lifecycle: &Lifecycle,
    min_state: LifecycleState,
) -> impl Stream<Item = S::Item>
where
    S: Stream,
{
    let states = lifecycle.subscribe();
    stream::unfold(
        (Box::pin(stream), states),
        move |(mut stream, mut states)| async move {
            loop {
                // Wait until the owner is in the active range.
                loop {
                    let state = *states.borrow_and_update();
                    if state.is_destroyed() {
                        return None;
                    }
                    if state.is_at_least(min_state) {
                        break;
                    }
                    if states.changed().await.is_err() {
                        return None;
                    }
                }

                tokio::select! {
                    item = stream.next() => {
                        return item.map(|item| (item, (stream, states)));
                    }
                    changed = states.changed() => {
                        // Re-check the new state before touching upstream.
                        if changed.is_err() {
                            return None;
                        }
                    }
                }
            }
        },
    )
}
