//! Per-key request coalescing with a terminal-result cache.
//!
//! For any key at most one unit of work is outstanding at a time. Every
//! caller that asks while it runs attaches to the same shared future and
//! sees the same result. Work runs as a detached tokio task, so a caller
//! going away does not abandon it; only [`Coalescer::invalidate_all`]
//! cancels work.
//!
//! Each piece of work is tagged with the epoch it started in. Invalidation
//! bumps the epoch, so a completion that races an invalidation can never
//! write into the new epoch's cache.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::AbortHandle;

pub enum CoalesceError<E> {
    /// The work itself failed. Failures are not cached.
    Failed(Arc<E>),
    /// The work was aborted by `invalidate_all`.
    Cancelled,
}

impl<E> Clone for CoalesceError<E> {
    fn clone(&self) -> Self {
        match self {
            CoalesceError::Failed(err) => CoalesceError::Failed(Arc::clone(err)),
            CoalesceError::Cancelled => CoalesceError::Cancelled,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for CoalesceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoalesceError::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            CoalesceError::Cancelled => f.write_str("Cancelled"),
        }
    }
}

impl<E: fmt::Display> fmt::Display for CoalesceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoalesceError::Failed(err) => write!(f, "{}", err),
            CoalesceError::Cancelled => f.write_str("cancelled by a newer search"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CoalesceError<E> {}

pub type CoalescedFuture<V, E> = Shared<BoxFuture<'static, Result<V, CoalesceError<E>>>>;

/// What a caller gets back from [`Coalescer::begin`].
pub enum Attach<V, E> {
    Ready(V),
    Waiting(CoalescedFuture<V, E>),
}

/// Terminal vs in flight vs unknown, kept distinct so readers can fall back
/// to other data while work is running.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus<V> {
    Terminal(V),
    Pending,
    Absent,
}

struct InFlight<V, E> {
    task_id: u64,
    shared: CoalescedFuture<V, E>,
    abort: AbortHandle,
}

struct State<K, V, E> {
    epoch: u64,
    next_task_id: u64,
    terminal: HashMap<K, V>,
    in_flight: HashMap<K, InFlight<V, E>>,
}

impl<K: Eq + Hash + Clone, V: Clone, E> State<K, V, E> {
    /// The one transition from in flight to terminal. Runs at most once per
    /// task; a stale epoch only clears its own in-flight slot.
    fn settle(&mut self, key: &K, epoch: u64, task_id: u64, value: Option<&V>) {
        if self
            .in_flight
            .get(key)
            .map_or(false, |f| f.task_id == task_id)
        {
            self.in_flight.remove(key);
        }
        if epoch != self.epoch {
            return;
        }
        if let Some(value) = value {
            self.terminal
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

pub struct Coalescer<K, V, E> {
    inner: Arc<Mutex<State<K, V, E>>>,
}

impl<K, V, E> Clone for Coalescer<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, E> Default for Coalescer<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K, V, E> Coalescer<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                epoch: 0,
                next_task_id: 0,
                terminal: HashMap::new(),
                in_flight: HashMap::new(),
            })),
        }
    }

    pub fn epoch(&self) -> u64 {
        lock(&self.inner).epoch
    }

    /// Return the terminal value, attach to running work, or start `work`.
    ///
    /// `work` is called synchronously and only when no terminal value and no
    /// outstanding work exist for `key`. Must be called within a tokio
    /// runtime.
    pub fn begin<F, Fut>(&self, key: K, work: F) -> Attach<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut state = lock(&self.inner);

        if let Some(value) = state.terminal.get(&key) {
            return Attach::Ready(value.clone());
        }
        if let Some(running) = state.in_flight.get(&key) {
            return Attach::Waiting(running.shared.clone());
        }

        let epoch = state.epoch;
        state.next_task_id += 1;
        let task_id = state.next_task_id;

        let fut = work();
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = fut.await;
            lock(&inner).settle(&task_key, epoch, task_id, result.as_ref().ok());
            result.map_err(|err| CoalesceError::Failed(Arc::new(err)))
        });

        let abort = handle.abort_handle();
        let shared = handle
            .map(|joined| joined.unwrap_or_else(|_| Err(CoalesceError::Cancelled)))
            .boxed()
            .shared();

        state.in_flight.insert(
            key,
            InFlight {
                task_id,
                shared: shared.clone(),
                abort,
            },
        );
        Attach::Waiting(shared)
    }

    /// Async form of [`Coalescer::begin`].
    pub async fn request<F, Fut>(&self, key: K, work: F) -> Result<V, CoalesceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        match self.begin(key, work) {
            Attach::Ready(value) => Ok(value),
            Attach::Waiting(shared) => shared.await,
        }
    }

    /// Terminal value only; never starts work.
    pub fn get(&self, key: &K) -> Option<V> {
        lock(&self.inner).terminal.get(key).cloned()
    }

    pub fn status(&self, key: &K) -> CacheStatus<V> {
        let state = lock(&self.inner);
        if let Some(value) = state.terminal.get(key) {
            CacheStatus::Terminal(value.clone())
        } else if state.in_flight.contains_key(key) {
            CacheStatus::Pending
        } else {
            CacheStatus::Absent
        }
    }

    /// Drop a single terminal value so the next request recomputes it.
    pub fn evict(&self, key: &K) {
        lock(&self.inner).terminal.remove(key);
    }

    /// Clear both maps, abort outstanding work and start a new epoch.
    pub fn invalidate_all(&self) {
        let mut state = lock(&self.inner);
        state.epoch += 1;
        state.terminal.clear();
        for (_, running) in state.in_flight.drain() {
            running.abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    type TestCoalescer = Coalescer<String, u32, String>;

    fn slow_work(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, String>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                sleep(Duration::from_millis(30)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_run_work_once() {
        let coalescer = TestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..8).map(|i| {
            coalescer.request("porto".to_string(), slow_work(&calls, 100 + i))
        });
        let results = join_all(requests).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| matches!(r, Ok(100))));
        assert_eq!(coalescer.get(&"porto".to_string()), Some(100));
    }

    #[tokio::test]
    async fn test_terminal_result_is_reused_and_never_overwritten() {
        let coalescer = TestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coalescer.request("porto".to_string(), slow_work(&calls, 1)).await;
        let second = coalescer.request("porto".to_string(), slow_work(&calls, 2)).await;

        assert!(matches!(first, Ok(1)));
        assert!(matches!(second, Ok(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_new_work() {
        let coalescer = TestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        coalescer.request("porto".to_string(), slow_work(&calls, 1)).await.unwrap();
        coalescer.invalidate_all();
        assert_eq!(coalescer.get(&"porto".to_string()), None);

        let again = coalescer.request("porto".to_string(), slow_work(&calls, 2)).await;
        assert!(matches!(again, Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let coalescer = TestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let failed = coalescer
            .request("porto".to_string(), move || {
                counted.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>("provider down".to_string()) }
            })
            .await;
        assert!(matches!(failed, Err(CoalesceError::Failed(ref e)) if e.as_str() == "provider down"));
        assert_eq!(coalescer.status(&"porto".to_string()), CacheStatus::Absent);

        let retried = coalescer.request("porto".to_string(), slow_work(&calls, 7)).await;
        assert!(matches!(retried, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_and_status_never_start_work() {
        let coalescer = TestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "porto".to_string();

        assert_eq!(coalescer.get(&key), None);
        assert_eq!(coalescer.status(&key), CacheStatus::Absent);

        let pending = coalescer.begin(key.clone(), slow_work(&calls, 5));
        assert_eq!(coalescer.status(&key), CacheStatus::Pending);
        assert_eq!(coalescer.get(&key), None);

        if let Attach::Waiting(fut) = pending {
            assert!(matches!(fut.await, Ok(5)));
        } else {
            panic!("expected work to start");
        }
        assert_eq!(coalescer.status(&key), CacheStatus::Terminal(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_cancels_in_flight_and_ignores_late_result() {
        let coalescer = TestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "porto".to_string();

        let waiting = match coalescer.begin(key.clone(), slow_work(&calls, 1)) {
            Attach::Waiting(fut) => fut,
            Attach::Ready(_) => panic!("nothing cached yet"),
        };
        coalescer.invalidate_all();

        assert!(matches!(waiting.await, Err(CoalesceError::Cancelled)));
        sleep(Duration::from_millis(50)).await;
        assert_eq!(coalescer.status(&key), CacheStatus::Absent);
        assert_eq!(coalescer.epoch(), 1);
    }

    #[tokio::test]
    async fn test_stale_settle_does_not_write_new_epoch() {
        let coalescer = TestCoalescer::new();
        {
            let mut state = lock(&coalescer.inner);
            state.epoch = 3;
            state.settle(&"porto".to_string(), 2, 99, Some(&42));
        }
        assert_eq!(coalescer.get(&"porto".to_string()), None);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let coalescer = TestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = futures::join!(
            coalescer.request("porto".to_string(), slow_work(&calls, 1)),
            coalescer.request("lisbon".to_string(), slow_work(&calls, 2)),
        );
        assert!(matches!(a, Ok(1)));
        assert!(matches!(b, Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
