//! Per-key mutual exclusion.
//!
//! [`KeyedLocks`] maps a key to an async mutex, created on first use and
//! removed once no holder or waiter references it. Attempts on the same key
//! run one at a time; attempts on different keys never contend beyond the
//! brief table lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;
type Table = Mutex<HashMap<String, Slot>>;

/// A process-local table of per-key locks.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: Arc<Table>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Access is held until the returned guard is dropped. If this future
    /// is dropped while waiting, its table entry is still cleaned up.
    pub async fn acquire(&self, key: &str) -> KeyedGuard {
        let ticket = self.ticket(key);
        let guard = Arc::clone(&ticket.slot).lock_owned().await;
        KeyedGuard {
            _guard: guard,
            _ticket: ticket,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ticket(&self, key: &str) -> Ticket {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = Arc::clone(table.entry(key.to_string()).or_default());
        Ticket {
            table: Arc::clone(&self.table),
            key: key.to_string(),
            slot,
        }
    }
}

impl std::fmt::Debug for KeyedLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLocks").field("keys", &self.len()).finish()
    }
}

/// A registered interest in a key. Dropping it removes the table entry
/// when nobody else references the slot.
struct Ticket {
    table: Arc<Table>,
    key: String,
    slot: Slot,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left: the table's and this ticket's.
        let idle = table
            .get(&self.key)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2);
        if idle {
            table.remove(&self.key);
        }
    }
}

/// Exclusive access to one key. Released on drop.
pub struct KeyedGuard {
    // Field order matters: the lock is released before the ticket cleans up.
    _guard: OwnedMutexGuard<()>,
    _ticket: Ticket,
}

impl std::fmt::Debug for KeyedGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedGuard").field("key", &self._ticket.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = KeyedLocks::new();
        {
            let _g = locks.acquire("a").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("a").await;

        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_same_key_blocks_until_release() {
        let locks = KeyedLocks::new();
        let held = locks.acquire("a").await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(blocked.is_err());

        drop(held);
        let acquired = tokio::time::timeout(Duration::from_millis(200), locks.acquire("a")).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_cleans_up() {
        let locks = KeyedLocks::new();
        let held = locks.acquire("a").await;

        // Times out while waiting; the waiter's ticket is dropped.
        let _ = tokio::time::timeout(Duration::from_millis(20), locks.acquire("a")).await;
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mutual_exclusion_under_contention() {
        let locks = KeyedLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _g = locks.acquire("shared").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
