use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;

use crate::{CancellationToken, Cancelled, Scheduler};

struct DebounceEntry {
    id: u64,
    token: CancellationToken,
}

struct DebouncerInner<K> {
    scheduler: Scheduler,
    delay: Duration,
    next_id: AtomicU64,
    entries: Mutex<HashMap<K, DebounceEntry>>,
}

/// Runs the most recent job per key once the key has been quiet for `delay`.
///
/// Scheduling a key again cancels the pending job for that key. Once the
/// delay elapses the job moves to the background pool.
#[derive(Clone)]
pub struct KeyedDebouncer<K> {
    inner: Arc<DebouncerInner<K>>,
}

impl<K> KeyedDebouncer<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn new(scheduler: Scheduler, delay: Duration) -> Self {
        Self {
            inner: Arc::new(DebouncerInner {
                scheduler,
                delay,
                next_id: AtomicU64::new(1),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    pub fn debounce<F>(&self, key: K, f: F) -> CancellationToken
    where
        F: FnOnce(CancellationToken) -> Result<(), Cancelled> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        if let Some(previous) = self.inner.entries.lock().insert(
            key.clone(),
            DebounceEntry {
                id,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
        }

        let Some(timer) = self.inner.scheduler.timer_handle() else {
            self.fire(key, id, token.clone(), f);
            return token;
        };

        let inner = Arc::clone(&self.inner);
        let token_for_timer = token.clone();
        let delay = self.inner.delay;
        timer.spawn(async move {
            tokio::select! {
                _ = token_for_timer.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    KeyedDebouncer { inner }.fire(key, id, token_for_timer, f);
                }
            }
        });

        token
    }

    fn fire<F>(&self, key: K, id: u64, token: CancellationToken, f: F)
    where
        F: FnOnce(CancellationToken) -> Result<(), Cancelled> + Send + 'static,
    {
        {
            let mut entries = self.inner.entries.lock();
            if entries.get(&key).is_some_and(|current| current.id == id) {
                entries.remove(&key);
            }
        }
        // The job reports through its own side effects; the handle is not needed.
        drop(self.inner.scheduler.spawn_background_with_token(token, f));
    }

    /// Cancel the pending job for `key`, if any.
    pub fn cancel(&self, key: &K) -> bool {
        let Some(entry) = self.inner.entries.lock().remove(key) else {
            return false;
        };
        entry.token.cancel();
        true
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.inner.entries.lock().contains_key(key)
    }
}
