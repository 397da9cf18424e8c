//! Lock-guarded HashMap
//!
//! [`ConcurrentMap`] wraps a `std::collections::HashMap` in one
//! `parking_lot::RwLock`. Every operation acquires the lock for its whole
//! duration and releases it before returning.
//!
//! ## Locking
//!
//! - `get`, `get_with`, `contains_key`, `len`, `is_empty`, `capacity`,
//!   `for_each` and `snapshot` take the lock in shared mode
//! - `insert`, `remove`, `get_or_insert_with`, `extend`, `retain` and `clear`
//!   take it exclusively
//! - The lock is task-fair: once a writer is waiting, new readers queue behind it
//!
//! ## Traversal
//!
//! `for_each` keeps the read lock until the last entry has been visited, so the
//! callback sees a view no writer can touch. The cost is that every writer waits
//! for the whole traversal. Because the lock is fair, calling *any* method of the
//! same map from inside the callback can deadlock once a writer is queued.
//!
//! ## Example
//!
//! ```rust
//! use safemap::ConcurrentMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map = Arc::new(ConcurrentMap::new());
//!
//! let writers: Vec<_> = (0..4)
//!     .map(|t| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || {
//!             for i in 0..250 {
//!                 map.insert(t * 250 + i, i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for writer in writers {
//!     writer.join().unwrap();
//! }
//!
//! assert_eq!(map.len(), 1000);
//! ```

use crate::metrics::{AccessMetrics, AtomicMetrics, MetricsCollector};
use crate::{Error, Result};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::hash_map::{Entry, RandomState};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// A hash map guarded by a single reader-writer lock
///
/// Readers share the lock; writers hold it exclusively. The map never hands out
/// references that outlive a lock acquisition: lookups return clones
/// ([`get`](Self::get)) or run a closure under the lock
/// ([`get_with`](Self::get_with)).
///
/// # Type Parameters
///
/// * `K` - The key type, must implement `Hash + Eq` for lookups
/// * `V` - The value type, unconstrained
/// * `S` - The hash builder, `RandomState` by default
///
/// # Examples
///
/// ```rust
/// use safemap::ConcurrentMap;
///
/// let map: ConcurrentMap<String, i32> = ConcurrentMap::new();
/// map.insert("hello".to_string(), 1);
/// assert_eq!(map.get("hello"), Some(1));
/// assert_eq!(map.remove("hello"), Some(1));
/// assert!(map.is_empty());
/// ```
pub struct ConcurrentMap<K, V, S = RandomState> {
    inner: RwLock<HashMap<K, V, S>>,
    metrics: AtomicMetrics,
    metrics_enabled: AtomicBool,
}

impl<K, V> ConcurrentMap<K, V, RandomState> {
    /// Create an empty map
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safemap::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<i32, String> = ConcurrentMap::new();
    /// assert_eq!(map.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(0, RandomState::new())
    }

    /// Create an empty map with room for at least `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> ConcurrentMap<K, V, S> {
    /// Create an empty map using `hasher` to hash keys
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Create an empty map with room for `capacity` entries, using `hasher`
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        trace!(capacity, "created concurrent map");
        Self::from_map(HashMap::with_capacity_and_hasher(capacity, hasher))
    }

    fn from_map(map: HashMap<K, V, S>) -> Self {
        Self {
            inner: RwLock::new(map),
            metrics: AtomicMetrics::default(),
            metrics_enabled: AtomicBool::new(true),
        }
    }

    /// Number of entries at the time of the call
    ///
    /// The value can be stale as soon as it is returned if writers are active.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the map held no entries at the time of the call
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of entries the map can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.read().capacity()
    }

    /// Visit every entry exactly once, in unspecified order
    ///
    /// The read lock is held until `f` has been called for the last entry.
    /// Writers block for the entire traversal, so keep `f` short.
    ///
    /// `f` must not call back into this map. A write from inside `f` always
    /// deadlocks; a read deadlocks if a writer started waiting in the meantime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safemap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// let mut sum = 0;
    /// map.for_each(|_, v| sum += v);
    /// assert_eq!(sum, 3);
    /// ```
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        let map = self.read();
        for (key, value) in map.iter() {
            f(key, value);
        }
        self.record(|m| m.record_traversal());
    }

    /// Copy every entry out of the map under a single read lock
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let map = self.read();
        let entries = map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.record(|m| m.record_traversal());
        entries
    }

    /// Keep only the entries for which `f` returns `true`
    ///
    /// Runs under the write lock; `f` may modify values in place.
    pub fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut map = self.write();
        let before = map.len();
        map.retain(f);
        let retained = map.len();
        trace!(removed = before - retained, retained, "retained entries");
    }

    /// Remove every entry, keeping the allocated capacity
    pub fn clear(&self) {
        let mut map = self.write();
        let removed = map.len();
        map.clear();
        trace!(removed, "cleared concurrent map");
    }

    /// Consume the map and return the underlying `HashMap`
    pub fn into_inner(self) -> HashMap<K, V, S> {
        self.inner.into_inner()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V, S>> {
        match self.inner.try_read() {
            Some(guard) => {
                self.record(|m| m.record_acquisition(false));
                guard
            }
            None => {
                self.record(|m| m.record_acquisition(true));
                self.inner.read()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V, S>> {
        match self.inner.try_write() {
            Some(guard) => {
                self.record(|m| m.record_acquisition(false));
                guard
            }
            None => {
                self.record(|m| m.record_acquisition(true));
                self.inner.write()
            }
        }
    }

    #[inline]
    fn record(&self, f: impl FnOnce(&AtomicMetrics)) {
        if self.metrics_enabled.load(Ordering::Relaxed) {
            f(&self.metrics);
        }
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Return a clone of the value stored for `key`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safemap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.insert(1, "one");
    /// assert_eq!(map.get(&1), Some("one"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.read().get(key).cloned();
        self.record(|m| m.record_read(value.is_some()));
        value
    }

    /// Run `f` on the value stored for `key` while the read lock is held
    ///
    /// Useful for values that are expensive or impossible to clone.
    pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> R,
    {
        let map = self.read();
        let result = map.get(key).map(f);
        self.record(|m| m.record_read(result.is_some()));
        result
    }

    /// Whether `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.read().contains_key(key);
        self.record(|m| m.record_read(found));
        found
    }

    /// Insert or overwrite the value for `key`, returning the previous value
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let previous = self.write().insert(key, value);
        self.record(|m| m.record_writes(1));
        previous
    }

    /// Remove `key`, returning its value if it was present
    ///
    /// Removing an absent key is a no-op.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.write().remove(key);
        self.record(|m| m.record_removal());
        removed
    }

    /// Return the value for `key`, inserting the result of `init` if absent
    ///
    /// The lookup and the insertion happen under one write lock, so `init`
    /// runs at most once per absent key even when callers race.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safemap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.get_or_insert_with("k", || 7), 7);
    /// assert_eq!(map.get_or_insert_with("k", || 9), 7);
    /// ```
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        let mut map = self.write();
        let value = match map.entry(key) {
            Entry::Occupied(entry) => {
                self.record(|m| m.record_read(true));
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                self.record(|m| {
                    m.record_read(false);
                    m.record_writes(1);
                });
                entry.insert(init()).clone()
            }
        };
        value
    }

    /// Insert every pair from `iter` under a single write lock
    ///
    /// Later pairs overwrite earlier ones with the same key.
    pub fn extend<I>(&self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = self.write();
        let mut inserted = 0u64;
        let mut replaced = 0u64;
        for (key, value) in iter {
            match map.insert(key, value) {
                Some(_) => replaced += 1,
                None => inserted += 1,
            }
        }
        drop(map);
        self.record(|m| m.record_writes(inserted + replaced));
        trace!(inserted, replaced, "extended concurrent map");
    }

    /// Look up `key` without waiting for the lock
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBlock`] if the lock is held by a writer.
    pub fn try_get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let map = self.inner.try_read().ok_or_else(|| {
            debug!("read lock unavailable, not waiting");
            Error::WouldBlock
        })?;
        self.record(|m| m.record_acquisition(false));
        let value = map.get(key).cloned();
        self.record(|m| m.record_read(value.is_some()));
        Ok(value)
    }

    /// Look up `key`, waiting at most `timeout` for the lock
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimedOut`] if the read lock was not acquired in time.
    pub fn try_get_for<Q>(&self, key: &Q, timeout: Duration) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let map = match self.inner.try_read() {
            Some(map) => {
                self.record(|m| m.record_acquisition(false));
                map
            }
            None => {
                let map = self.inner.try_read_for(timeout).ok_or_else(|| {
                    debug!(?timeout, "timed out waiting for read lock");
                    Error::TimedOut
                })?;
                self.record(|m| m.record_acquisition(true));
                map
            }
        };
        let value = map.get(key).cloned();
        self.record(|m| m.record_read(value.is_some()));
        Ok(value)
    }

    /// Remove `key` without waiting for the lock
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBlock`] if any reader or writer holds the lock.
    pub fn try_remove<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut map = self.inner.try_write().ok_or_else(|| {
            debug!("write lock unavailable, not waiting");
            Error::WouldBlock
        })?;
        self.record(|m| m.record_acquisition(false));
        let removed = map.remove(key);
        self.record(|m| m.record_removal());
        Ok(removed)
    }

    /// Remove `key`, waiting at most `timeout` for the lock
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimedOut`] if the write lock was not acquired in time.
    pub fn try_remove_for<Q>(&self, key: &Q, timeout: Duration) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut map = match self.inner.try_write() {
            Some(map) => {
                self.record(|m| m.record_acquisition(false));
                map
            }
            None => {
                let map = self.inner.try_write_for(timeout).ok_or_else(|| {
                    debug!(?timeout, "timed out waiting for write lock");
                    Error::TimedOut
                })?;
                self.record(|m| m.record_acquisition(true));
                map
            }
        };
        let removed = map.remove(key);
        self.record(|m| m.record_removal());
        Ok(removed)
    }
}

impl<K, V, S> super::Map<K, V> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<V> {
        ConcurrentMap::get(self, key)
    }

    fn set(&self, key: K, value: V) {
        self.insert(key, value);
    }

    fn delete(&self, key: &K) {
        self.remove(key);
    }

    fn len(&self) -> usize {
        ConcurrentMap::len(self)
    }

    fn is_empty(&self) -> bool {
        ConcurrentMap::is_empty(self)
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        ConcurrentMap::for_each(self, f)
    }
}

impl<K, V, S> MetricsCollector for ConcurrentMap<K, V, S> {
    fn metrics(&self) -> AccessMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics_enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_metrics_enabled(&self) -> bool {
        cfg!(feature = "metrics") && self.metrics_enabled.load(Ordering::Relaxed)
    }
}

impl<K, V, S: Default> Default for ConcurrentMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

/// Deep copy taken under the read lock; metrics start from zero.
impl<K, V, S> Clone for ConcurrentMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        let copy = Self::from_map(self.read().clone());
        copy.metrics_enabled
            .store(self.metrics_enabled.load(Ordering::Relaxed), Ordering::Relaxed);
        copy
    }
}

impl<K, V, S> fmt::Debug for ConcurrentMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never block here: Debug may be called while this thread holds the lock.
        // A fair try_read also fails while a writer is only queued, so the
        // fallback means "busy", not necessarily "held".
        match self.inner.try_read() {
            Some(map) => f.debug_struct("ConcurrentMap").field("entries", &*map).finish(),
            None => f
                .debug_struct("ConcurrentMap")
                .field("entries", &format_args!("<busy>"))
                .finish(),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map: HashMap<K, V, S> = iter.into_iter().collect();
        trace!(len = map.len(), "collected concurrent map");
        Self::from_map(map)
    }
}

impl<K, V, S> Extend<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        ConcurrentMap::extend(self, iter)
    }
}

impl<K, V, S> From<HashMap<K, V, S>> for ConcurrentMap<K, V, S> {
    fn from(map: HashMap<K, V, S>) -> Self {
        Self::from_map(map)
    }
}
