//! Integration tests for lifecycle-gated collection, bound wrappers, and
//! the timer factories.
//!
//! Timing-sensitive tests run under a paused tokio clock
//! (`start_paused = true`), so elapsed-time assertions are exact rather
//! than tolerance-based. The `settle` helper advances the clock by one
//! millisecond, which also lets every ready subscription task run.

use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use flowbind::{
    timer, timer_down, timer_millis, timer_up, LifecycleBoundStream, LifecycleRegistry,
    LifecycleState, LifecycleStreamExt, StateCell, TimeUnit,
};

/// Shared recording sink for callbacks.
fn recorder<T>() -> (Arc<Mutex<Vec<T>>>, Arc<Mutex<Vec<T>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    (Arc::clone(&seen), seen)
}

/// Let spawned subscription tasks catch up under a paused clock.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// =============================================================================
// Count-limited collection
// =============================================================================

#[tokio::test]
async fn collect_with_count_delivers_exactly_max_count() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    let (seen, sink) = recorder();

    let task = stream::iter(0..100).collect_with_count(&lifecycle, 5, move |n| sink.lock().push(n));
    task.join().await;
    assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn collect_with_count_delivers_everything_on_short_streams() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    let (seen, sink) = recorder();

    let task = stream::iter(0..3).collect_with_count(&lifecycle, 10, move |n| sink.lock().push(n));
    task.join().await;
    assert_eq!(*seen.lock(), vec![0, 1, 2]);
}

#[tokio::test]
async fn collect_once_matches_count_of_one() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    let (seen, sink) = recorder();

    let task = stream::iter([7, 8, 9]).collect_once(&lifecycle, move |n| sink.lock().push(n));
    task.join().await;
    assert_eq!(*seen.lock(), vec![7]);
}

// =============================================================================
// Timer factories
// =============================================================================

#[tokio::test(start_paused = true)]
async fn timer_millis_emits_immediately_then_on_interval() {
    let start = tokio::time::Instant::now();
    let mut stream = std::pin::pin!(timer_millis(1000));

    assert_eq!(stream.next().await, Some(0));
    assert_eq!(start.elapsed(), Duration::ZERO);

    assert_eq!(stream.next().await, Some(1));
    assert_eq!(start.elapsed(), Duration::from_millis(1000));

    assert_eq!(stream.next().await, Some(2));
    assert_eq!(start.elapsed(), Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn timer_unit_conversion_matches_millisecond_cadence() {
    let start = tokio::time::Instant::now();
    let mut stream = std::pin::pin!(timer(1, TimeUnit::Seconds));

    assert_eq!(stream.next().await, Some(0));
    assert_eq!(stream.next().await, Some(1));
    assert_eq!(start.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn timer_down_counts_to_zero_then_completes_one_interval_later() {
    let start = tokio::time::Instant::now();
    let values: Vec<u64> = timer_down(3).collect().await;

    assert_eq!(values, vec![3, 2, 1, 0]);
    // The trailing delay after the final 0 is part of the contract.
    assert_eq!(start.elapsed(), Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn timer_up_counts_from_zero() {
    let values: Vec<u64> = timer_up(3).collect().await;
    assert_eq!(values, vec![0, 1, 2, 3]);
}

// =============================================================================
// Gated collection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn gated_collection_pauses_below_min_state_and_resumes() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Started);

    let (tx, rx) = mpsc::channel(16);
    let (seen, sink) = recorder();
    let _task = ReceiverStream::new(rx).collect_gated(
        &lifecycle,
        LifecycleState::Started,
        move |n: u32| sink.lock().push(n),
    );

    tx.send(1).await.unwrap();
    settle().await;
    assert_eq!(*seen.lock(), vec![1]);

    // Below the minimum: nothing is delivered, upstream is not consumed.
    registry.set_state(LifecycleState::Created);
    tx.send(2).await.unwrap();
    settle().await;
    assert_eq!(*seen.lock(), vec![1]);

    // Re-entering the active range resumes delivery, including the item
    // the channel buffered during the pause.
    registry.set_state(LifecycleState::Resumed);
    settle().await;
    assert_eq!(*seen.lock(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn gated_count_is_not_reset_by_pause_resume() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Started);

    let (tx, rx) = mpsc::channel(16);
    let (seen, sink) = recorder();
    let _task = ReceiverStream::new(rx).collect_gated_with_count(
        &lifecycle,
        LifecycleState::Started,
        3,
        move |n: u32| sink.lock().push(n),
    );

    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();
    settle().await;
    assert_eq!(*seen.lock(), vec![1, 2]);

    registry.set_state(LifecycleState::Created);
    settle().await;
    registry.set_state(LifecycleState::Started);

    // Only one slot of the budget remains after the pause.
    tx.send(3).await.unwrap();
    tx.send(4).await.unwrap();
    settle().await;
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
}

// =============================================================================
// Bound stream wrapper
// =============================================================================

#[tokio::test(start_paused = true)]
async fn bound_stream_cancel_stops_delivery_and_is_idempotent() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Started);

    let (seen, sink) = recorder();
    let bound = timer_millis(100).bind_to_lifecycle(&lifecycle, move |n| sink.lock().push(n));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(*seen.lock(), vec![0, 1, 2]);

    bound.cancel();
    let delivered = seen.lock().len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(seen.lock().len(), delivered);

    // Second cancel is a no-op.
    bound.cancel();
    assert!(!bound.is_active());
}

#[tokio::test(start_paused = true)]
async fn destroy_force_cancels_and_deregisters_without_manual_cancel() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Started);

    let (seen, sink) = recorder();
    let bound = timer_millis(100).bind_to_lifecycle(&lifecycle, move |n| sink.lock().push(n));
    settle().await;
    assert_eq!(lifecycle.observer_count(), 1);

    registry.set_state(LifecycleState::Destroyed);
    assert_eq!(lifecycle.observer_count(), 0);

    let delivered = seen.lock().len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(seen.lock().len(), delivered);
    assert!(!bound.is_active());
}

#[tokio::test(start_paused = true)]
async fn collect_after_destroy_is_inert() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Started);

    let (seen, sink) = recorder();
    let bound = LifecycleBoundStream::resubscribing(&lifecycle, || stream::iter([1u32, 2, 3]));
    registry.set_state(LifecycleState::Destroyed);

    bound.collect(move |n| sink.lock().push(n));
    settle().await;
    assert!(seen.lock().is_empty());
    assert!(!bound.is_active());
}

#[tokio::test]
async fn collect_on_a_destroyed_scope_spawns_a_stillborn_task() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Destroyed);

    let (seen, sink) = recorder();
    let task = stream::iter(0..10).collect_on(&lifecycle, move |n| sink.lock().push(n));
    task.join().await;
    assert!(seen.lock().is_empty());
}

// =============================================================================
// State cell
// =============================================================================

#[tokio::test(start_paused = true)]
async fn bound_state_cell_replays_current_value_and_conflates_while_paused() {
    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Started);

    let cell = StateCell::new(10u32);
    let (seen, sink) = recorder();
    let bound = cell.bind_to_lifecycle(&lifecycle, LifecycleState::Started, move |n| {
        sink.lock().push(n);
    });

    settle().await;
    assert_eq!(*seen.lock(), vec![10]);

    bound.set(11);
    settle().await;
    assert_eq!(*seen.lock(), vec![10, 11]);

    // Writes during a pause conflate; only the latest survives the resume.
    registry.set_state(LifecycleState::Created);
    bound.set(12);
    bound.set(13);
    settle().await;
    assert_eq!(*seen.lock(), vec![10, 11]);

    registry.set_state(LifecycleState::Started);
    settle().await;
    assert_eq!(*seen.lock(), vec![10, 11, 13]);

    // Accessors hit the shared slot, not a copy.
    assert_eq!(bound.get(), 13);
    assert_eq!(cell.get(), 13);
    assert_eq!(bound.update_and_get(|n| n + 1), 14);
    assert_eq!(bound.get_and_update(|n| n * 2), 14);
    assert_eq!(bound.get(), 28);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_state_updates_lose_nothing() {
    let cell = StateCell::new(0u64);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let cell = cell.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..1000 {
                cell.update_and_get(|n| n + 1);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(cell.get(), 8000);
}
