//! Owned handles for the periodic tasks.
//!
//! The bio rotator and status watcher each run as a spawned tokio task
//! driven by an interval. `start()` hands back a [`TaskHandle`] that the
//! caller must keep to stop the task — there is no process-wide interval
//! state. Cancellation is observed between ticks only: an in-flight tick
//! always runs to completion.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running periodic task.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub(crate) fn new(token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self {
            token,
            join: Some(join),
        }
    }

    /// Request the task to stop. No further tick is scheduled; a tick that
    /// is already executing finishes first.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stop and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        // A dropped handle must not leave an orphaned timer behind.
        self.token.cancel();
    }
}
