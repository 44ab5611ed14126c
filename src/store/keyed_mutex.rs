//! Per-key mutual exclusion.
//!
//! Operations on the same key are serialized; operations on different keys
//! never touch the same lock. Mutexes are created lazily on first use and are
//! never removed, so the map grows with the number of distinct keys seen.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while the caller owns the key. Dropping it releases the lock.
pub type KeyGuard = OwnedMutexGuard<()>;

#[derive(Clone, Default)]
pub struct KeyedMutex {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no one else holds `key`, then take it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        // `entry` holds the shard write lock, so concurrent first-use of a key
        // still yields a single mutex. The shard guard is dropped before awaiting.
        let mutex = self
            .locks
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Number of distinct keys that have ever been locked.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}
