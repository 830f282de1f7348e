//! Countdown demo.
//!
//! Drives a lifecycle owner through its states while two subscriptions
//! collect against it: a countdown timer bound to the lifecycle, and a
//! gated state cell fed by an interval timer. Pausing the owner pauses the
//! gated collection; destroying it releases everything.
//!
//! Run with `RUST_LOG=debug` to watch the lifecycle transitions.

use std::time::Duration;

use flowbind::{
    timer_down, timer_millis, LifecycleRegistry, LifecycleState, LifecycleStreamExt, StateCell,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = LifecycleRegistry::new();
    let lifecycle = registry.handle();
    registry.set_state(LifecycleState::Started);

    // Countdown bound to the lifecycle: released automatically on destroy.
    let countdown = timer_down(8).bind_to_lifecycle(&lifecycle, |remaining| {
        tracing::info!(remaining, "countdown");
    });

    // A shared counter driven by an interval timer, observed through a
    // gated state cell: updates keep landing while paused, but delivery
    // waits for the owner to come back to Started.
    let ticks = StateCell::new(0u64);
    let writer = ticks.clone();
    let _feed = timer_millis(500).collect_on(&lifecycle, move |_| {
        writer.update(|n| n + 1);
    });
    let _observed = ticks.bind_to_lifecycle(&lifecycle, LifecycleState::Started, |n| {
        tracing::info!(ticks = n, "observed");
    });

    tokio::time::sleep(Duration::from_secs(3)).await;

    tracing::info!("pausing the owner for two seconds");
    registry.set_state(LifecycleState::Created);
    tokio::time::sleep(Duration::from_secs(2)).await;

    tracing::info!("resuming");
    registry.set_state(LifecycleState::Resumed);
    tokio::time::sleep(Duration::from_secs(3)).await;

    tracing::info!("destroying the owner");
    registry.set_state(LifecycleState::Destroyed);
    assert!(!countdown.is_active());
}
