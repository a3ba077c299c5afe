//! Handle to a session loop running on its own tokio task.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TaskHandle<E> {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), E>>,
}

impl<E: Send + 'static> TaskHandle<E> {
    /// Spawn `run` with a fresh cancellation token.
    pub fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(cancel.clone()));
        Self { cancel, task }
    }

    /// Ask the loop to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to end and return why it ended.
    pub async fn join(self) -> Result<(), E> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}
