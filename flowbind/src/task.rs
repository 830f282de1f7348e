//! Subscription task handles.
//!
//! Every `collect*` operation spawns exactly one task on the owner's scope
//! and hands back a [`TaskHandle`] for external cancellation. Cancellation
//! is cooperative throughout: a cancelled task stops at its next suspension
//! point, and an in-flight callback invocation is never interrupted.

use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to one running subscription task.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn `future` racing against `token`.
    ///
    /// The cancellation branch is polled first, so a task spawned with an
    /// already-cancelled token exits before doing any work.
    pub(crate) fn spawn<F>(token: CancellationToken, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = guard.cancelled() => {}
                () = future => {}
            }
        });
        Self { token, handle }
    }

    /// Request cooperative cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Subscription task cancelled");
            self.token.cancel();
        }
    }

    /// Whether cancellation has been requested (including by the owner's
    /// destroy transition).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task has finished running.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to finish.
    ///
    /// A panic inside the task is swallowed here; it has already terminated
    /// the task per the runtime's default policy.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Nullable task-handle slot shared by the bound wrapper types.
///
/// At most one task per slot at any time. The slot is single-writer in
/// practice (all writes happen from wrapper calls on the owner's scope);
/// the mutex makes that assumption safe rather than load-bearing.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    current: Mutex<Option<TaskHandle>>,
}

impl TaskSlot {
    /// Store a new task, cancelling any prior one.
    pub(crate) fn replace(&self, handle: TaskHandle) {
        if let Some(prior) = self.current.lock().replace(handle) {
            prior.cancel();
        }
    }

    /// Cancel and clear the current task. Idempotent when empty.
    pub(crate) fn cancel(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.cancel();
        }
    }

    /// Whether a task is currently live.
    pub(crate) fn is_active(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
