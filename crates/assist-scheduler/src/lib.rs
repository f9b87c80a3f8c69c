//! Background execution for metadata rebuilds.
//!
//! Work runs on a small rayon pool; cancellation is cooperative via
//! [`CancellationToken`] and is checked by the job itself between units of
//! work (for rebuilds: between metadata files). [`KeyedDebouncer`] coalesces
//! bursts of work for the same key.

mod debouncer;
mod progress;
mod scheduler;
mod task;

pub use debouncer::KeyedDebouncer;
pub use progress::{Progress, ProgressEvent, ProgressId, ProgressReceiver, ProgressSender};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use task::BlockingTask;
pub use tokio_util::sync::CancellationToken;

/// Returned by a job that observed its cancellation token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cancelled")]
pub struct Cancelled;

impl Cancelled {
    /// `Err(Cancelled)` once `token` has been cancelled.
    pub fn check(token: &CancellationToken) -> Result<(), Cancelled> {
        if token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,
    #[error("task panicked")]
    Panicked,
}

impl From<Cancelled> for TaskError {
    fn from(_: Cancelled) -> Self {
        TaskError::Cancelled
    }
}
