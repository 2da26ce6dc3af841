use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const WAIT_DURATION: u64 = 5; // 5 seconds

/// TaskManager keeps track of the node's long-running tasks, the cosigning
/// loop and the HTTP server, so that all of them can be stopped together
/// when the process receives a shutdown signal.
pub struct TaskManager<T: Send> {
    handles: Vec<JoinHandle<T>>,
    cancellation_token: CancellationToken,
}

impl<T: Send + 'static> Default for TaskManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> TaskManager<T> {
    pub fn new() -> Self {
        Self {
            handles: vec![],
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Spawn a new asynchronous task.
    ///
    /// Tasks are forced to accept a cancellation token so that they can be notified
    /// about the cancellation using the passed token.
    pub fn spawn<F, Fut>(&mut self, callback: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let handle = tokio::spawn(callback(self.child_token()));
        self.handles.push(handle);
    }

    /// Notify all running tasks to stop and wait for them to return.
    ///
    /// Tasks that are still running after the grace period are aborted.
    pub async fn abort(&mut self) {
        self.cancellation_token.cancel();

        for handle in self.handles.drain(..) {
            let abort_handle = handle.abort_handle();
            if timeout(Duration::from_secs(WAIT_DURATION), handle)
                .await
                .is_err()
            {
                warn!("Task did not stop within {}s, aborting", WAIT_DURATION);
                abort_handle.abort();
            }
        }
    }

    /// Provides a child cancellation token.
    ///
    /// This would enable us to pass this token into child tasks
    /// so that all child tasks can be cancelled at once.
    pub fn child_token(&self) -> CancellationToken {
        self.cancellation_token.child_token()
    }

    /// Number of tasks spawned and not yet stopped through [`TaskManager::abort`].
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn abort_cancels_spawned_tasks() {
        let stopped = Arc::new(AtomicBool::new(false));
        let mut task_manager = TaskManager::<()>::new();

        let flag = stopped.clone();
        task_manager.spawn(|cancellation_token| async move {
            cancellation_token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(task_manager.len(), 1);

        task_manager.abort().await;

        assert!(stopped.load(Ordering::SeqCst));
        assert!(task_manager.is_empty());
    }
}
