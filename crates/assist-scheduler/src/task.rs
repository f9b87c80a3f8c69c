use tokio::sync::oneshot;

use crate::{CancellationToken, TaskError};

/// Handle to a job running on the background pool.
pub struct BlockingTask<T> {
    token: CancellationToken,
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> BlockingTask<T> {
    pub(crate) fn new(
        token: CancellationToken,
        rx: oneshot::Receiver<Result<T, TaskError>>,
    ) -> Self {
        Self { token, rx }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the job from async code.
    ///
    /// Resolves to `Cancelled` as soon as the token fires, even if the job has
    /// not yet reached its next cancellation check.
    pub async fn join(self) -> Result<T, TaskError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TaskError::Cancelled),
            result = self.rx => match result {
                Ok(result) => result,
                Err(_) => Err(TaskError::Panicked),
            }
        }
    }

    /// Block the current thread until the job reports back.
    ///
    /// Must not be called from inside a Tokio runtime.
    pub fn wait(self) -> Result<T, TaskError> {
        match self.rx.blocking_recv() {
            Ok(result) => result,
            Err(_) => Err(TaskError::Panicked),
        }
    }
}
