//! Map implementations
//!
//! This module provides the lock-guarded map and the [`Map`] trait describing
//! its capability set.
//!
//! ## Available Maps
//!
//! - [`ConcurrentMap`]: `HashMap` behind a single reader-writer lock
//!
//! ## Choosing an API
//!
//! - Use the inherent methods on `ConcurrentMap` when the concrete type is known;
//!   they return previous values and offer bounded-wait variants
//! - Accept `impl Map<K, V>` when a consumer only needs get/set/delete/len/for_each

pub mod concurrent;

pub use self::concurrent::ConcurrentMap;

/// Thread-safe key-value capability set
///
/// Every method takes `&self`; implementations synchronize internally.
pub trait Map<K, V> {
    /// Look up `key`, returning a copy of its value if present
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or overwrite the value for `key`
    fn set(&self, key: K, value: V);

    /// Remove `key` if present; absent keys are ignored
    fn delete(&self, key: &K);

    /// Number of entries at the time of the call
    fn len(&self) -> usize;

    /// Whether the map held no entries at the time of the call
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every entry once, in unspecified order
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);
}


#[cfg(test)]
mod proptests;
