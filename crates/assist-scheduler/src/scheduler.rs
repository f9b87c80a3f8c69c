use std::sync::Arc;

use rayon::ThreadPool;
use tokio::runtime::Runtime;
use tokio::sync::{broadcast, oneshot};

use assist_core::panic_payload_to_str;

use crate::{task::BlockingTask, CancellationToken, Cancelled, ProgressSender, TaskError};

enum BlockingPool {
    Rayon(ThreadPool),
    Inline,
}

impl BlockingPool {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            BlockingPool::Rayon(pool) => pool.spawn(job),
            BlockingPool::Inline => job(),
        }
    }

    fn threads(&self) -> usize {
        match self {
            BlockingPool::Rayon(pool) => pool.current_num_threads(),
            BlockingPool::Inline => 0,
        }
    }
}

fn build_rayon_pool(prefix: &'static str, threads: usize) -> BlockingPool {
    // Thread creation can fail under low RLIMIT_NPROC; shrink the pool instead of
    // failing startup.
    let mut threads = threads.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |idx| format!("{prefix}-{idx}"))
            .build()
        {
            Ok(pool) => return BlockingPool::Rayon(pool),
            Err(_) if threads > 1 => {
                threads = (threads / 2).max(1);
            }
            Err(err) => {
                tracing::warn!(
                    target = "assist.scheduler",
                    error = %err,
                    "no worker threads available; running jobs inline"
                );
                return BlockingPool::Inline;
            }
        }
    }
}

fn build_timer_runtime() -> Option<Runtime> {
    match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .thread_name("assist-timer")
        .build()
    {
        Ok(rt) => Some(rt),
        Err(err) => {
            tracing::warn!(
                target = "assist.scheduler",
                error = %err,
                "failed to start timer runtime; debounced work runs immediately"
            );
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub background_threads: usize,
    pub progress_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            // Rebuilds are serialized per scope, so a couple of threads covers
            // several scopes refreshing at once.
            background_threads: available.clamp(1, 2),
            progress_channel_capacity: 256,
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    background_pool: BlockingPool,
    timer: Option<Runtime>,
    progress: ProgressSender,
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        // A blocking shutdown panics when the last handle is dropped inside async code.
        if let Some(timer) = self.timer.take() {
            timer.shutdown_background();
        }
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let background_pool = build_rayon_pool("assist-background", config.background_threads);
        let (progress_tx, _) = broadcast::channel(config.progress_channel_capacity.max(1));

        Self {
            inner: Arc::new(SchedulerInner {
                background_pool,
                timer: build_timer_runtime(),
                progress: ProgressSender::new(progress_tx),
            }),
        }
    }

    /// A scheduler that runs every job on the calling thread, with no timer:
    /// debounced work runs immediately.
    ///
    /// Used by one-shot tools (the CLI) where a pool buys nothing.
    pub fn inline() -> Self {
        let (progress_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(SchedulerInner {
                background_pool: BlockingPool::Inline,
                timer: None,
                progress: ProgressSender::new(progress_tx),
            }),
        }
    }

    /// Worker threads in the background pool; `0` for an inline scheduler.
    pub fn background_threads(&self) -> usize {
        self.inner.background_pool.threads()
    }

    pub fn progress(&self) -> ProgressSender {
        self.inner.progress.clone()
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<crate::ProgressEvent> {
        self.inner.progress.subscribe()
    }

    pub(crate) fn timer_handle(&self) -> Option<tokio::runtime::Handle> {
        self.inner.timer.as_ref().map(|rt| rt.handle().clone())
    }

    pub fn spawn_background<T, F>(&self, f: F) -> BlockingTask<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Result<T, Cancelled> + Send + 'static,
    {
        self.spawn_background_with_token(CancellationToken::new(), f)
    }

    pub fn spawn_background_with_token<T, F>(
        &self,
        token: CancellationToken,
        f: F,
    ) -> BlockingTask<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Result<T, Cancelled> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        if token.is_cancelled() {
            let _ = tx.send(Err(TaskError::Cancelled));
            return BlockingTask::new(token, rx);
        }

        let token_for_job = token.clone();
        let job = move || {
            let result =
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(token_for_job))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(TaskError::from(err)),
                    Err(panic) => {
                        let message = panic_payload_to_str(&*panic);
                        tracing::error!(
                            target = "assist.scheduler",
                            panic = %message,
                            "background task panicked"
                        );
                        Err(TaskError::Panicked)
                    }
                };
            let _ = tx.send(result);
        };

        self.inner.background_pool.spawn(job);
        BlockingTask::new(token, rx)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
