//! Lifecycle-aware stream collection for async Rust.
//!
//! This crate is convenience glue between three primitives it does not
//! reimplement: async streams (`futures::Stream`), a lifecycle owner whose
//! readiness changes over time, and the tokio task runtime. It adds the
//! missing piece: starting and stopping stream collection in step with the
//! owner's lifecycle, plus a few timer stream factories.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Caller                                 │
//! │   stream (timer_*, channels, anything)  +  callback           │
//! └───────────────┬──────────────────────────────────────────────┘
//!                 │
//!   LifecycleStreamExt::collect_* ──────────┐
//!                 │                         │
//! ┌───────────────▼───────────┐   ┌─────────▼──────────────────┐
//! │  gate::gated              │   │  LifecycleBoundStream      │
//! │  (pause below min state)  │   │  LifecycleBoundStateCell   │
//! └───────────────┬───────────┘   │  (observe destroy,         │
//!                 │               │   one task per wrapper)    │
//! ┌───────────────▼───────────┐   └─────────┬──────────────────┘
//! │  Lifecycle::spawn         │◄────────────┘
//! │  (scope = token tree,     │
//! │   destroy cancels all)    │
//! └───────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`LifecycleRegistry`] / [`Lifecycle`]: owner-side state machine and
//!   its cloneable observer handle
//! - [`LifecycleStreamExt`]: `collect_on`, `collect_gated`,
//!   `collect_with_count`, `collect_once`, `bind_to_lifecycle`
//! - [`LifecycleBoundStream`] / [`LifecycleBoundStateCell`]: wrappers that
//!   auto-release their subscription on owner destroy
//! - [`StateCell`]: a stream that also holds a current, atomically
//!   updatable value
//! - [`timer_millis`] / [`timer`] / [`timer_down`] / [`timer_up`]:
//!   interval and countdown stream factories
//!
//! # Quick Start
//!
//! ```ignore
//! use flowbind::{timer_down, LifecycleRegistry, LifecycleState, LifecycleStreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = LifecycleRegistry::new();
//!     let lifecycle = registry.handle();
//!     registry.set_state(LifecycleState::Started);
//!
//!     // Collect pauses below Started and stops for good on destroy.
//!     let bound = timer_down(10).bind_to_lifecycle(&lifecycle, |remaining| {
//!         println!("{remaining}");
//!     });
//!
//!     // ... later, the owner shuts down:
//!     registry.set_state(LifecycleState::Destroyed);
//!     assert!(!bound.is_active());
//! }
//! ```
//!
//! # Failure semantics
//!
//! There is no error taxonomy here. A panicking callback or stream
//! terminates only its own subscription task, per tokio's default policy;
//! nothing is caught, logged, or retried on the caller's behalf.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bound;
pub mod collect;
pub mod gate;
pub mod lifecycle;
pub mod state;
pub mod task;
pub mod timer;

// Re-exports for convenience
pub use bound::LifecycleBoundStream;
pub use collect::LifecycleStreamExt;
pub use gate::gated;
pub use lifecycle::{
    Lifecycle, LifecycleObserver, LifecycleRegistry, LifecycleState, ObserverId,
};
pub use state::{LifecycleBoundStateCell, StateCell};
pub use task::TaskHandle;
pub use timer::{
    timer, timer_down, timer_map, timer_millis, timer_millis_map, timer_up, TimeUnit,
};
