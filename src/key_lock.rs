//! Per-key asynchronous mutual exclusion.
//!
//! [`KeyLocks`] hands out one async mutex per key, so work on different
//! commits proceeds concurrently while work on the same `(commit,
//! deliverable)` pair is serialized. Entries are pruned once no guard or
//! waiter references them, keeping the map bounded by live contention.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-key async locks.
pub struct KeyLocks<K> {
    entries: Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K> KeyLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits for exclusive access to `key`.
    ///
    /// The returned guard releases the key on drop.
    pub async fn lock(&self, key: K) -> KeyGuard<K> {
        let mutex = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(key.clone()).or_default())
        };
        let guard = mutex.lock_owned().await;
        KeyGuard {
            key,
            guard: Some(guard),
            entries: Arc::clone(&self.entries),
        }
    }

    /// Returns the number of keys currently locked or awaited.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K> Default for KeyLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for KeyLocks<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLocks").finish_non_exhaustive()
    }
}

/// Proof that the holder has exclusive access to a key.
pub struct KeyGuard<K>
where
    K: Eq + Hash,
{
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    entries: Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K> KeyGuard<K>
where
    K: Eq + Hash,
{
    /// Returns the locked key.
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }
}

impl<K> fmt::Debug for KeyGuard<K>
where
    K: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}

impl<K> Drop for KeyGuard<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        // Release the async mutex before inspecting the reference count.
        drop(self.guard.take());
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = entries
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1);
        if unused {
            entries.remove(&self.key);
        }
    }
}
