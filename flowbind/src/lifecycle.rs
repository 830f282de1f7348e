//! Lifecycle state machine, observer registry, and task scope.
//!
//! A lifecycle owner is split into two halves:
//!
//! - [`LifecycleRegistry`]: the owner-side mutator. Whoever drives the host
//!   component (a UI shell, a test, a demo binary) holds the registry and
//!   moves it through its states.
//! - [`Lifecycle`]: a cheap, cloneable observer handle. Everything else in
//!   this crate consumes lifecycles only through this handle: reading the
//!   current state, subscribing to transitions, registering observers, and
//!   spawning tasks on the owner's scope.
//!
//! State transitions are broadcast over a `tokio::sync::watch` channel so
//! that any number of gated streams can wait on them without polling.
//! Observers are held in a lock-guarded registry; callbacks are invoked
//! outside the lock so an observer may call back into the registry.
//!
//! The owner's task scope is a `CancellationToken` tree: every task spawned
//! through [`Lifecycle::spawn`] runs under a child token, and destroying the
//! owner cancels the root, force-cancelling every outstanding task.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::task::TaskHandle;

/// Readiness state of a lifecycle owner.
///
/// States are totally ordered: `Destroyed < Created < Started < Resumed`.
/// `Destroyed` is terminal; a destroyed owner never re-enters an active
/// state and is never "at least" any active state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Terminal state; the owner's scope is cancelled and observers drained.
    Destroyed,
    /// The owner exists but is not yet visible or interactive.
    Created,
    /// The owner is active; the default minimum for gated collection.
    Started,
    /// The owner is fully active and in the foreground.
    Resumed,
}

impl LifecycleState {
    /// Whether this state is at or above the given minimum active state.
    ///
    /// `Destroyed` is never at least any state, including itself.
    #[must_use]
    pub fn is_at_least(self, min: LifecycleState) -> bool {
        self != Self::Destroyed && self >= min
    }

    /// Whether this is the terminal state.
    #[must_use]
    pub fn is_destroyed(self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Destroyed => "Destroyed",
            Self::Created => "Created",
            Self::Started => "Started",
            Self::Resumed => "Resumed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Identifier assigned to a registered lifecycle observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Callbacks invoked on lifecycle transitions.
///
/// Both methods default to no-ops so implementors override only what they
/// need, in the manner of a default observer interface.
pub trait LifecycleObserver: Send + Sync {
    /// Called after the owner transitions to a new non-terminal state.
    fn on_state_changed(&self, state: LifecycleState) {
        let _ = state;
    }

    /// Called exactly once when the owner is destroyed. The observer has
    /// already been removed from the registry when this runs.
    fn on_destroy(&self) {}
}

struct LifecycleShared {
    state: watch::Sender<LifecycleState>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn LifecycleObserver>)>>,
    next_observer_id: AtomicU64,
    scope: CancellationToken,
}

/// Observer-side handle to a lifecycle owner.
///
/// Cloning is cheap; all clones observe the same owner and spawn onto the
/// same task scope.
#[derive(Clone)]
pub struct Lifecycle {
    shared: Arc<LifecycleShared>,
}

impl Lifecycle {
    /// Current state of the owner.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.shared.state.borrow()
    }

    /// Subscribe to state transitions.
    ///
    /// The receiver observes every `set_state` call, including the terminal
    /// transition to [`LifecycleState::Destroyed`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.shared.state.subscribe()
    }

    /// Register an observer.
    ///
    /// If the owner is already destroyed the observer is not retained and
    /// its `on_destroy` runs immediately.
    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) -> ObserverId {
        let id = ObserverId(self.shared.next_observer_id.fetch_add(1, Ordering::Relaxed));
        let mut observers = self.shared.observers.lock();
        if self.shared.state.borrow().is_destroyed() {
            drop(observers);
            tracing::warn!(
                observer_id = id.0,
                "Observer added to a destroyed lifecycle; destroying immediately"
            );
            observer.on_destroy();
            return id;
        }
        observers.push((id, observer));
        tracing::debug!(observer_id = id.0, "Lifecycle observer added");
        id
    }

    /// Remove a previously registered observer.
    ///
    /// Returns `true` if the observer was still registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.shared.observers.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        let removed = observers.len() != before;
        if removed {
            tracing::debug!(observer_id = id.0, "Lifecycle observer removed");
        }
        removed
    }

    /// Number of currently registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared.observers.lock().len()
    }

    /// Spawn a task on the owner's scope.
    ///
    /// The task runs under a child cancellation token: cancelling the
    /// returned handle stops it at its next suspension point, and destroying
    /// the owner cancels every task spawned through this scope. Spawning on
    /// an already-destroyed owner is permitted; the child token is born
    /// cancelled, so the task exits at its first suspension point without
    /// doing any work.
    ///
    /// A panic inside the task terminates only that task, per the runtime's
    /// default policy; this crate neither catches nor retries.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, as `tokio::spawn` does.
    pub fn spawn<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        TaskHandle::spawn(self.shared.scope.child_token(), future)
    }
}

/// Owner-side mutator for a lifecycle.
///
/// Created at [`LifecycleState::Created`]. Dropping the registry destroys
/// the lifecycle if the owner never did so explicitly.
pub struct LifecycleRegistry {
    shared: Arc<LifecycleShared>,
}

impl LifecycleRegistry {
    /// Create a new lifecycle owner in the `Created` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Created);
        Self {
            shared: Arc::new(LifecycleShared {
                state,
                observers: Mutex::new(Vec::new()),
                next_observer_id: AtomicU64::new(0),
                scope: CancellationToken::new(),
            }),
        }
    }

    /// Observer-side handle for this owner.
    #[must_use]
    pub fn handle(&self) -> Lifecycle {
        Lifecycle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Move the owner to a new state, notifying subscribers and observers.
    ///
    /// Transitions requested on a destroyed owner are ignored. Transitioning
    /// to [`LifecycleState::Destroyed`] cancels the task scope, drains the
    /// observer registry, and invokes each observer's `on_destroy` exactly
    /// once.
    pub fn set_state(&self, state: LifecycleState) {
        let current = *self.shared.state.borrow();
        if current.is_destroyed() {
            tracing::warn!(requested = %state, "State change on a destroyed lifecycle ignored");
            return;
        }
        if current == state {
            return;
        }
        if state.is_destroyed() {
            self.destroy();
            return;
        }

        self.shared.state.send_replace(state);
        tracing::debug!(%state, "Lifecycle state changed");

        // Snapshot under the lock, invoke outside it.
        let observers: Vec<_> = self
            .shared
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.on_state_changed(state);
        }
    }

    fn destroy(&self) {
        let drained: Vec<_> = {
            let mut observers = self.shared.observers.lock();
            if self.shared.state.borrow().is_destroyed() {
                return;
            }
            self.shared.state.send_replace(LifecycleState::Destroyed);
            std::mem::take(&mut *observers)
        };
        self.shared.scope.cancel();
        tracing::debug!(observers = drained.len(), "Lifecycle destroyed");
        for (_, observer) in drained {
            observer.on_destroy();
        }
    }
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LifecycleRegistry {
    fn drop(&mut self) {
        self.destroy();
    }
}
