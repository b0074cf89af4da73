use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt, Shared};
use tracing::{debug, trace};

use super::key::QueryKey;
use super::retry::{run_with_retry, RetryPolicy};
use crate::config::CacheConfig;
use crate::error::{ClientError, Result};

type CachedValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue>>>;

/// Per-read overrides of the cache defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Option<Duration>,
    pub retry: Option<u32>,
}

impl QueryOptions {
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}

struct InFlight {
    id: u64,
    fetch: SharedFetch,
    abort: AbortHandle,
    /// Set when the key is invalidated while this fetch runs; its result is
    /// then stored as already stale.
    invalidated: bool,
}

#[derive(Default)]
struct Entry {
    value: Option<CachedValue>,
    updated_at: Option<Instant>,
    invalidated: bool,
    /// Reads served from `value` since it was fetched.
    hits: u64,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn fresh_value(&self, stale_time: Duration) -> Option<CachedValue> {
        match (&self.value, self.updated_at) {
            (Some(value), Some(updated_at))
                if !self.invalidated && updated_at.elapsed() < stale_time =>
            {
                Some(value.clone())
            }
            _ => None,
        }
    }

    fn is_expired(&self, gc_time: Duration) -> bool {
        self.in_flight.is_none()
            && self
                .updated_at
                .map_or(true, |updated_at| updated_at.elapsed() >= gc_time)
    }
}

struct CacheInner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_fetch_id: AtomicU64,
    stale_time: Duration,
    gc_time: Duration,
    retry: RetryPolicy,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome of fetch `id`, unless it was cancelled or replaced.
    fn settle(&self, key: &QueryKey, id: u64, outcome: &Result<CachedValue>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
            return;
        }
        let flight = entry.in_flight.take();
        if let Ok(value) = outcome {
            entry.value = Some(value.clone());
            entry.updated_at = Some(Instant::now());
            entry.invalidated = flight.map_or(false, |f| f.invalidated);
            entry.hits = 0;
        }
    }
}

/// Keyed cache of server reads.
///
/// Reads younger than their stale time are served from memory. Otherwise a
/// fetch is started, and every reader of the same key arriving before it
/// completes shares that one fetch. Cloning is cheap and shares the entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        QueryCache {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                next_fetch_id: AtomicU64::new(0),
                stale_time: config.stale_time(),
                gc_time: config.gc_time(),
                retry: RetryPolicy::from_config(config),
            }),
        }
    }

    /// Return the cached value for `key` if still fresh, otherwise fetch it.
    ///
    /// Transient fetch failures are retried per the retry policy.
    pub async fn read<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetcher: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let stale_time = options.stale_time.unwrap_or(self.inner.stale_time);
        let fetch = {
            let mut entries = self.inner.lock();
            let gc_time = self.inner.gc_time;
            entries.retain(|k, entry| k == &key || !entry.is_expired(gc_time));

            let entry = entries.entry(key.clone()).or_default();
            if let Some(value) = entry.fresh_value(stale_time) {
                entry.hits += 1;
                trace!(key = %key, hits = entry.hits, "query served from cache");
                return downcast(&key, value);
            }

            match &entry.in_flight {
                Some(flight) => {
                    debug!(key = %key, "joining in-flight query");
                    flight.fetch.clone()
                }
                None => {
                    let policy = options
                        .retry
                        .map_or(self.inner.retry, |n| self.inner.retry.with_max_retries(n));
                    let flight = self.start_fetch(key.clone(), policy, fetcher);
                    let fetch = flight.fetch.clone();
                    entry.in_flight = Some(flight);
                    fetch
                }
            }
        };

        let value = fetch.await?;
        downcast(&key, value)
    }

    fn start_fetch<T, F, Fut>(&self, key: QueryKey, policy: RetryPolicy, fetcher: F) -> InFlight
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let (abort, registration) = AbortHandle::new_pair();
        let cache: Weak<CacheInner> = Arc::downgrade(&self.inner);
        debug!(key = %key, fetch_id = id, "fetching query");

        let fetch = async move {
            let work = async {
                run_with_retry(policy, &key, &fetcher)
                    .await
                    .map(|value| Arc::new(value) as CachedValue)
            };
            let outcome = match Abortable::new(work, registration).await {
                Ok(outcome) => outcome,
                Err(_aborted) => Err(ClientError::Cancelled),
            };
            if let Some(cache) = cache.upgrade() {
                cache.settle(&key, id, &outcome);
            }
            outcome
        }
        .boxed()
        .shared();

        InFlight {
            id,
            fetch,
            abort,
            invalidated: false,
        }
    }

    /// Mark `key` stale so the next read refetches.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.inner.lock();
        if let Some(entry) = entries.get_mut(key) {
            debug!(key = %key, hits = entry.hits, "invalidating query");
            entry.invalidated = true;
            if let Some(flight) = entry.in_flight.as_mut() {
                flight.invalidated = true;
            }
        }
    }

    /// Run a mutation; on success invalidate `invalidates`.
    ///
    /// Reads of those keys already in flight still resolve for their waiters,
    /// but their result is stored stale so the next read refetches.
    /// Mutations are not retried.
    pub async fn write<T, Fut>(&self, invalidates: &[QueryKey], mutation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let result = mutation.await;
        if result.is_ok() {
            for key in invalidates {
                self.invalidate(key);
            }
        }
        result
    }

    /// Abort the fetch in flight for `key`; its readers get `Cancelled`.
    pub fn cancel(&self, key: &QueryKey) {
        let mut entries = self.inner.lock();
        if let Some(flight) = entries.get_mut(key).and_then(|e| e.in_flight.take()) {
            debug!(key = %key, fetch_id = flight.id, "cancelling query");
            flight.abort.abort();
        }
    }

    pub fn cancel_all(&self) {
        let mut entries = self.inner.lock();
        for flight in entries.values_mut().filter_map(|e| e.in_flight.take()) {
            flight.abort.abort();
        }
    }

    /// Drop `key` entirely, cancelling any fetch for it.
    pub fn remove(&self, key: &QueryKey) {
        let removed = self.inner.lock().remove(key);
        if let Some(flight) = removed.and_then(|e| e.in_flight) {
            flight.abort.abort();
        }
    }

    /// Drop every entry, cancelling all fetches.
    pub fn clear(&self) {
        self.cancel_all();
        self.inner.lock().clear();
        debug!("query cache cleared");
    }

    /// The last stored value for `key`, fresh or not.
    pub fn peek<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.inner.lock();
        let value = entries.get(key)?.value.clone()?;
        value.downcast_ref::<T>().cloned()
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner
            .lock()
            .get(key)
            .map_or(false, |e| e.in_flight.is_some())
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.inner
            .lock()
            .get(key)
            .map_or(true, |e| e.fresh_value(self.inner.stale_time).is_none())
    }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, value: CachedValue) -> Result<T> {
    value.downcast_ref::<T>().cloned().ok_or_else(|| {
        ClientError::Decode(format!("cached value for '{}' has an unexpected type", key))
    })
}
