//! # safemap
//!
//! A generic key-value map that is safe to share between threads, guarded by a
//! single reader-writer lock.
//!
//! ## Features
//!
//! - **ConcurrentMap**: get / insert / remove / len / for_each over a `HashMap`
//!   behind one `parking_lot::RwLock`
//! - **Map trait**: the same capability set as an abstract interface
//! - **Metrics**: optional access counters (`metrics` feature, on by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use safemap::ConcurrentMap;
//!
//! let map = ConcurrentMap::new();
//! map.insert("a", 1);
//! map.insert("b", 2);
//! map.insert("a", 3);
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get("a"), Some(3));
//! assert_eq!(map.get("c"), None);
//! ```
//!
//! ## Thread Safety
//!
//! Reads take the lock in shared mode and may run in parallel with each other.
//! Writes take it exclusively. Share an instance with `Arc` or scoped threads;
//! no additional synchronization is needed.
//!
//! ## Caveats
//!
//! [`ConcurrentMap::for_each`] holds the read lock for the whole traversal,
//! including every callback invocation. Writers wait until it returns, and a
//! callback that calls a write operation on the same map deadlocks.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod map;
pub mod metrics;

pub use crate::map::{ConcurrentMap, Map};
pub use crate::metrics::{AccessMetrics, MetricsCollector};

/// Error types for the bounded-wait map operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The lock is held in a conflicting mode and the caller asked not to wait
    WouldBlock,
    /// The lock could not be acquired before the timeout elapsed
    TimedOut,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::WouldBlock => write!(f, "Lock is held, operation would block"),
            Error::TimedOut => write!(f, "Timed out waiting for lock"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for safemap operations
pub type Result<T> = core::result::Result<T, Error>;
