//! Keyed, deduplicating query cache
//!
//! [`QueryCache`] owns one [`CacheEntry`] per key and coordinates every fetch
//! for it:
//!
//! - **Coalescing**: while a fetch for a key is running, further requests
//!   attach to it instead of calling the fetcher again.
//! - **Epochs**: every fetch is tagged with a cache-wide, increasing epoch.
//!   A completion is applied only if its epoch is still the entry's current
//!   one, so a slow response never overwrites a newer request's result.
//! - **Stale-while-revalidate**: stale data is returned immediately while a
//!   background fetch replaces it.
//! - **Polling**: keys subscribed with a refresh interval are refetched on
//!   that cadence for as long as at least one subscriber is attached.
//!
//! Fetches run on spawned Tokio tasks, so they complete (and update the
//! entry) even when every caller stopped waiting. The registry lock is never
//! held across an `.await` or while listeners run. Each transition gets a
//! per-key version under that lock; listeners of a key are invoked one
//! snapshot at a time and never see a version older than one already
//! delivered.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, ReentrantMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::QueryOptions;
use super::entry::{CacheEntry, QueryStatus};
use super::stats::{MetricsCollector, QueryStats};
use super::subscription::Subscription;
use crate::time::{Clock, SystemClock};

/// Produces one fetch of a query's data.
pub type Fetcher<V, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, E>> + Send + Sync>;

/// Callback invoked with a snapshot of the entry after each transition.
pub type Listener<V, E> = Arc<dyn Fn(&CacheEntry<V, E>) + Send + Sync>;

type InFlight<V, E> = Shared<BoxFuture<'static, Result<Arc<V>, E>>>;

/// Last version delivered to a key's listeners.
type DeliveryGate = Arc<ReentrantMutex<Cell<u64>>>;

/// Wraps an async closure as a [`Fetcher`].
///
/// ```rust
/// use kpfdash_common::cache::{fetcher, Fetcher};
///
/// let f: Fetcher<u32, String> = fetcher(|| async { Ok(42) });
/// ```
pub fn fetcher<V, E, F, Fut>(f: F) -> Fetcher<V, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

struct Slot<V, E> {
    entry: CacheEntry<V, E>,
    epoch: u64,
    in_flight: Option<InFlight<V, E>>,
    invalidated: bool,
    options: QueryOptions,
    fetcher: Option<Fetcher<V, E>>,
    listeners: Vec<(u64, Listener<V, E>)>,
    poller: Option<CancellationToken>,
    version: u64,
    delivered: DeliveryGate,
}

impl<V, E: Clone> Slot<V, E> {
    fn new(options: QueryOptions) -> Self {
        Self {
            entry: CacheEntry::default(),
            epoch: 0,
            in_flight: None,
            invalidated: false,
            options,
            fetcher: None,
            listeners: Vec::new(),
            poller: None,
            version: 0,
            delivered: Arc::new(ReentrantMutex::new(Cell::new(0))),
        }
    }

    fn notification(&mut self) -> Notification<V, E> {
        self.version += 1;
        Notification {
            listeners: self.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect(),
            entry: self.entry.clone(),
            version: self.version,
            gate: Arc::clone(&self.delivered),
        }
    }

    fn stop_polling(&mut self) -> bool {
        match self.poller.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Listener calls collected under the lock and delivered after releasing it.
struct Notification<V, E> {
    listeners: Vec<Listener<V, E>>,
    entry: CacheEntry<V, E>,
    version: u64,
    gate: DeliveryGate,
}

impl<V, E> Notification<V, E> {
    /// Runs the listeners unless a newer snapshot of the key got there first.
    fn deliver(self) {
        let delivered = self.gate.lock();
        if delivered.get() >= self.version {
            return;
        }
        delivered.set(self.version);
        for listener in &self.listeners {
            // A listener triggered a newer transition of the same key.
            if delivered.get() > self.version {
                return;
            }
            listener(&self.entry);
        }
    }
}

enum Pending<V, E> {
    Ready(Arc<V>),
    Waiting(InFlight<V, E>),
}

struct Inner<K, V, E, C> {
    slots: Mutex<HashMap<K, Slot<V, E>>>,
    clock: C,
    metrics: MetricsCollector,
    next_epoch: AtomicU64,
    next_listener: AtomicU64,
    shutdown: CancellationToken,
}

impl<K, V, E, C> Drop for Inner<K, V, E, C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<K, V, E, C> Inner<K, V, E, C>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Clone + fmt::Display + Send + Sync + 'static,
    C: Clock,
{
    fn is_stale(&self, slot: &Slot<V, E>) -> bool {
        slot.invalidated
            || slot.entry.fetched_at.is_some_and(|fetched_at| {
                slot.options.is_stale(self.clock.now().saturating_duration_since(fetched_at))
            })
    }

    /// Starts a fetch for `key`, superseding whatever is in flight.
    fn issue(
        self: &Arc<Self>,
        key: &K,
        slot: &mut Slot<V, E>,
        fetcher: Fetcher<V, E>,
    ) -> InFlight<V, E> {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        if slot.in_flight.is_some() {
            debug!(key = %key, epoch, "superseding in-flight query fetch");
        } else {
            debug!(key = %key, epoch, "issuing query fetch");
        }
        slot.epoch = epoch;
        slot.entry.status = QueryStatus::Loading;
        self.metrics.record_fetch();

        let weak = Arc::downgrade(self);
        let owned_key = key.clone();
        let fetch = async move {
            let result = fetcher().await.map(Arc::new);
            if let Some(inner) = weak.upgrade() {
                inner.complete(&owned_key, epoch, &result);
            }
            result
        }
        .boxed()
        .shared();

        slot.in_flight = Some(fetch.clone());
        spawn_detached(fetch.clone());
        fetch
    }

    /// Starts a fetch that only its background task waits on.
    fn revalidate(self: &Arc<Self>, key: &K, slot: &mut Slot<V, E>, fetcher: Fetcher<V, E>) {
        drop(self.issue(key, slot, fetcher));
    }

    fn complete(&self, key: &K, epoch: u64, result: &Result<Arc<V>, E>) {
        let notification = {
            let mut slots = self.slots.lock();
            let Some(slot) = slots.get_mut(key).filter(|slot| slot.epoch == epoch) else {
                self.metrics.record_discard();
                debug!(key = %key, epoch, "discarding superseded query result");
                return;
            };

            slot.in_flight = None;
            match result {
                Ok(data) => {
                    slot.entry.status = QueryStatus::Success;
                    slot.entry.data = Some(Arc::clone(data));
                    slot.entry.error = None;
                    slot.entry.fetched_at = Some(self.clock.now());
                    slot.invalidated = false;
                    debug!(key = %key, epoch, "query fetch succeeded");
                }
                Err(err) => {
                    slot.entry.status = QueryStatus::Error;
                    slot.entry.error = Some(err.clone());
                    self.metrics.record_failure();
                    warn!(key = %key, epoch, error = %err, "query fetch failed");
                }
            }
            slot.notification()
        };
        notification.deliver();
    }

    fn read(
        self: &Arc<Self>,
        key: &K,
        fetcher: Fetcher<V, E>,
        options: QueryOptions,
    ) -> (Option<InFlight<V, E>>, Option<Notification<V, E>>) {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(options));
        slot.options = options;
        slot.fetcher = Some(Arc::clone(&fetcher));

        if slot.entry.data.is_some() {
            self.metrics.record_hit();
            if slot.in_flight.is_none() && self.is_stale(slot) {
                debug!(key = %key, "serving stale query data while revalidating");
                self.revalidate(key, slot, fetcher);
                return (None, Some(slot.notification()));
            }
            return (None, None);
        }

        self.metrics.record_miss();
        if let Some(in_flight) = &slot.in_flight {
            self.metrics.record_join();
            debug!(key = %key, "joining in-flight query fetch");
            return (Some(in_flight.clone()), None);
        }
        let in_flight = self.issue(key, slot, fetcher);
        (Some(in_flight), Some(slot.notification()))
    }

    fn ensure(
        self: &Arc<Self>,
        key: &K,
        fetcher: Fetcher<V, E>,
        options: QueryOptions,
    ) -> (Pending<V, E>, Option<Notification<V, E>>) {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(options));
        slot.options = options;
        slot.fetcher = Some(Arc::clone(&fetcher));

        if !self.is_stale(slot) {
            if let Some(data) = &slot.entry.data {
                self.metrics.record_hit();
                return (Pending::Ready(Arc::clone(data)), None);
            }
        }

        self.metrics.record_miss();
        if let Some(in_flight) = &slot.in_flight {
            self.metrics.record_join();
            debug!(key = %key, "joining in-flight query fetch");
            return (Pending::Waiting(in_flight.clone()), None);
        }
        let in_flight = self.issue(key, slot, fetcher);
        (Pending::Waiting(in_flight), Some(slot.notification()))
    }

    /// Poll tick: behaves like an ordinary request, so a fetch already in
    /// flight is not duplicated.
    fn tick(self: &Arc<Self>, key: &K) {
        let notification = {
            let mut slots = self.slots.lock();
            let Some(slot) = slots.get_mut(key) else { return };
            if slot.listeners.is_empty() {
                return;
            }
            if slot.in_flight.is_some() {
                self.metrics.record_join();
                debug!(key = %key, "poll tick joined in-flight query fetch");
                return;
            }
            let Some(fetcher) = slot.fetcher.clone() else { return };
            self.revalidate(key, slot, fetcher);
            slot.notification()
        };
        notification.deliver();
    }

    fn start_polling(self: &Arc<Self>, key: K, interval: Duration) -> CancellationToken {
        let token = self.shutdown.child_token();
        let cancel = token.clone();
        let weak = Arc::downgrade(self);
        debug!(key = %key, ?interval, "query polling started");

        spawn_detached(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
                let Some(inner) = weak.upgrade() else { break };
                inner.tick(&key);
            }
            debug!(key = %key, "query polling stopped");
        });
        token
    }

    fn detach(&self, key: &K, id: u64) {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(key) else { return };
        slot.listeners.retain(|(listener_id, _)| *listener_id != id);
        debug!(key = %key, listener = id, "query subscriber detached");
        if slot.listeners.is_empty() && slot.stop_polling() {
            debug!(key = %key, "last subscriber detached; polling cancelled");
        }
    }
}

/// Spawns `task` on the current Tokio runtime, if there is one.
fn spawn_detached<F>(task: F)
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => warn!("no Tokio runtime available; background query work will not run"),
    }
}

/// Registry of cached queries.
///
/// Cloning yields another handle to the same registry. The registry is torn
/// down by [`QueryCache::shutdown`] or when the last handle is dropped; both
/// stop every poller.
///
/// # Type Parameters
///
/// * `K` - Query key
/// * `V` - Payload type, shared with readers as `Arc<V>`
/// * `E` - Fetch error, stored in entries and handed to every waiter
/// * `C` - Clock used to age data (defaults to `SystemClock`)
///
/// # Examples
///
/// ```
/// use kpfdash_common::cache::{fetcher, QueryCache, QueryOptions};
///
/// #[tokio::main]
/// async fn main() {
///     let cache: QueryCache<String, u32, String> = QueryCache::new();
///     let load = fetcher(|| async { Ok(42) });
///
///     let entry = cache.read_or_fetch("answer".to_string(), load, QueryOptions::default()).await;
///     assert_eq!(entry.data().map(|value| **value), Some(42));
/// }
/// ```
pub struct QueryCache<K, V, E, C = SystemClock> {
    inner: Arc<Inner<K, V, E, C>>,
}

impl<K, V, E> QueryCache<K, V, E, SystemClock>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Clone + fmt::Display + Send + Sync + 'static,
{
    /// Creates an empty cache using the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<K, V, E> Default for QueryCache<K, V, E, SystemClock>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Clone + fmt::Display + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E, C> QueryCache<K, V, E, C>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Clone + fmt::Display + Send + Sync + 'static,
    C: Clock,
{
    /// Creates an empty cache that ages data with `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                clock,
                metrics: MetricsCollector::new(),
                next_epoch: AtomicU64::new(0),
                next_listener: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Returns the entry for `key`, fetching only when needed.
    ///
    /// - No data yet: waits for a fetch (joining one already in flight).
    /// - Stale or invalidated data: returns it at once and refreshes in the
    ///   background.
    /// - Fresh data: returns it without calling `fetcher`.
    ///
    /// Fetch failures are recorded in the returned entry, never raised.
    pub async fn read_or_fetch(
        &self,
        key: K,
        fetcher: Fetcher<V, E>,
        options: QueryOptions,
    ) -> CacheEntry<V, E> {
        let (pending, notification) = self.inner.read(&key, fetcher, options);
        if let Some(notification) = notification {
            notification.deliver();
        }
        if let Some(pending) = pending {
            // The outcome is read back from the entry below.
            drop(pending.await);
        }
        self.peek(&key).unwrap_or_default()
    }

    /// Returns fresh data for `key`, waiting for a fetch if necessary.
    ///
    /// Concurrent calls for the same key share one fetcher invocation and
    /// all receive its result. The fetch starts when this is called; the
    /// returned future only waits for it.
    pub fn fetch(
        &self,
        key: K,
        fetcher: Fetcher<V, E>,
        options: QueryOptions,
    ) -> BoxFuture<'static, Result<Arc<V>, E>> {
        let (pending, notification) = self.inner.ensure(&key, fetcher, options);
        if let Some(notification) = notification {
            notification.deliver();
        }
        match pending {
            Pending::Ready(data) => future::ready(Ok(data)).boxed(),
            Pending::Waiting(in_flight) => in_flight.boxed(),
        }
    }

    /// Forces a new fetch for `key`, superseding any fetch in flight.
    ///
    /// Waiters of the superseded fetch still receive its result, but that
    /// result is not applied to the entry.
    pub fn refetch(&self, key: K, fetcher: Fetcher<V, E>) -> BoxFuture<'static, Result<Arc<V>, E>> {
        let (in_flight, notification) = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(QueryOptions::default()));
            slot.fetcher = Some(Arc::clone(&fetcher));
            let in_flight = self.inner.issue(&key, slot, fetcher);
            (in_flight, slot.notification())
        };
        notification.deliver();
        in_flight.boxed()
    }

    /// Attaches `listener` to `key`.
    ///
    /// Fetches immediately if the key has no data or its data is stale, and
    /// starts polling when `options.refresh_interval` is set. The listener
    /// is called synchronously, outside the registry lock, after every
    /// transition of the entry; a snapshot that loses the race to a newer
    /// one is skipped. It must not hold a handle to this cache, or
    /// the registry will never be dropped.
    pub fn subscribe<F>(
        &self,
        key: K,
        fetcher: Fetcher<V, E>,
        options: QueryOptions,
        listener: F,
    ) -> Subscription
    where
        F: Fn(&CacheEntry<V, E>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        let notification = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(options));
            slot.options = options;
            slot.fetcher = Some(Arc::clone(&fetcher));
            let listener: Listener<V, E> = Arc::new(listener);
            slot.listeners.push((id, listener));

            if let Some(interval) = options.refresh_interval {
                if slot.poller.is_none() {
                    slot.poller = Some(self.inner.start_polling(key.clone(), interval));
                }
            }

            let needs_fetch = slot.in_flight.is_none()
                && (slot.entry.data.is_none() || self.inner.is_stale(slot));
            if needs_fetch {
                self.inner.revalidate(&key, slot, fetcher);
                Some(slot.notification())
            } else {
                None
            }
        };
        if let Some(notification) = notification {
            notification.deliver();
        }
        debug!(key = %key, listener = id, "query subscriber attached");

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.detach(&key, id);
            }
        })
    }

    /// Marks `key` stale.
    ///
    /// Keys with subscribers are refetched right away; others refetch on
    /// their next read. Returns `false` if the key is unknown.
    pub fn invalidate(&self, key: &K) -> bool {
        let notification = {
            let mut slots = self.inner.slots.lock();
            let Some(slot) = slots.get_mut(key) else { return false };
            slot.invalidated = true;
            debug!(key = %key, "query invalidated");

            let fetcher = slot.fetcher.clone().filter(|_| !slot.listeners.is_empty());
            fetcher.map(|fetcher| {
                self.inner.revalidate(key, slot, fetcher);
                slot.notification()
            })
        };
        if let Some(notification) = notification {
            notification.deliver();
        }
        true
    }

    /// Removes `key`, stopping its poller. A fetch still in flight completes
    /// but is not applied.
    pub fn evict(&self, key: &K) -> bool {
        let removed = self.inner.slots.lock().remove(key);
        match removed {
            Some(mut slot) => {
                slot.stop_polling();
                debug!(key = %key, "query evicted");
                true
            }
            None => false,
        }
    }

    /// Removes every entry and stops every poller.
    pub fn clear(&self) {
        let drained: Vec<Slot<V, E>> = self.inner.slots.lock().drain().map(|(_, slot)| slot).collect();
        for mut slot in drained {
            slot.stop_polling();
        }
    }

    /// Stops all polling and empties the registry. Subscriptions taken later
    /// still work but no longer poll.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.clear();
        debug!("query cache shut down");
    }

    /// Snapshot of the entry for `key`, without fetching.
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V, E>> {
        self.inner.slots.lock().get(key).map(|slot| slot.entry.clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.slots.lock().contains_key(key)
    }

    /// Number of listeners attached to `key`.
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.inner.slots.lock().get(key).map_or(0, |slot| slot.listeners.len())
    }

    /// Whether a refresh timer is running for `key`.
    pub fn is_polling(&self, key: &K) -> bool {
        self.inner.slots.lock().get(key).is_some_and(|slot| slot.poller.is_some())
    }

    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueryStats {
        self.inner.metrics.snapshot(self.len())
    }
}

impl<K, V, E, C> Clone for QueryCache<K, V, E, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<K, V, E, C> fmt::Debug for QueryCache<K, V, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache").field("entries", &self.inner.slots.lock().len()).finish()
    }
}
