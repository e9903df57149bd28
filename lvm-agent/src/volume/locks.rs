//! Per-volume mutual exclusion.
//!
//! LVM only locks its own metadata, so two requests for the same name could
//! otherwise interleave (e.g. a delete removing a volume another request is
//! about to mount). Operations on different names never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Keyed table of async locks. Entries are dropped once nobody holds or
/// waits on them.
#[derive(Debug, Clone, Default)]
pub struct VolumeLocks {
    table: LockTable,
}

/// Held lock for one volume name.
#[derive(Debug)]
pub struct VolumeLockGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    table: LockTable,
}

impl VolumeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    pub async fn lock(&self, name: &str) -> VolumeLockGuard {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        // Built before waiting so a waiter dropped mid-wait still prunes the
        // entry. The pending lock future is dropped first, releasing its
        // reference before the count is checked.
        let mut held = VolumeLockGuard {
            key: name.to_string(),
            guard: None,
            table: self.table.clone(),
        };
        held.guard = Some(entry.lock_owned().await);
        held
    }

    /// Number of names with a live lock entry.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for VolumeLockGuard {
    fn drop(&mut self) {
        // Release before checking so the count below only sees the table's
        // reference and any waiters.
        drop(self.guard.take());

        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = table.get(&self.key) {
            if Arc::strong_count(entry) == 1 {
                table.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = VolumeLocks::new();
        {
            let _guard = locks.lock("vol1").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let locks = VolumeLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock("vol1").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_leak_entry() {
        let locks = VolumeLocks::new();
        let holder = locks.lock("vol1").await;

        // Poll the waiter once so it is queued on the held lock
        let mut waiter = Box::pin(locks.lock("vol1"));
        tokio::select! {
            biased;
            _ = &mut waiter => panic!("lock should be held"),
            _ = std::future::ready(()) => {}
        }

        // The holder goes first, then the waiter gives up before it is
        // polled again.
        drop(holder);
        assert_eq!(locks.len(), 1);
        drop(waiter);
        assert!(locks.is_empty());

        let again = tokio::time::timeout(Duration::from_secs(1), locks.lock("vol1")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_timed_out_waiter_leaves_holder_entry() {
        let locks = VolumeLocks::new();
        let holder = locks.lock("vol1").await;

        let waited = tokio::time::timeout(Duration::from_millis(10), locks.lock("vol1")).await;
        assert!(waited.is_err());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let locks = VolumeLocks::new();
        let _a = locks.lock("vol-a").await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock("vol-b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
