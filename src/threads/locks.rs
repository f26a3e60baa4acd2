use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::key::ThreadKey;

/// Per thread key mutual exclusion. Holding the guard for a key
/// serializes every load/decide/save cycle on that thread while other
/// threads proceed independently.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<ThreadKey, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &ThreadKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map have no holder and no
            // waiter left.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn it_serializes_the_same_key() {
        let locks = Arc::new(KeyLocks::new());
        let key = ThreadKey::from_source("<root@example.com>");

        let guard = locks.lock(&key).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter never acquired the lock")
            .unwrap();
    }

    #[tokio::test]
    async fn it_does_not_block_other_keys() {
        let locks = KeyLocks::new();
        let _a = locks.lock(&ThreadKey::from_source("<a@example.com>")).await;
        let b = tokio::time::timeout(
            Duration::from_secs(1),
            locks.lock(&ThreadKey::from_source("<b@example.com>")),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn it_prunes_released_keys() {
        let locks = KeyLocks::new();
        drop(locks.lock(&ThreadKey::from_source("<a@example.com>")).await);
        drop(locks.lock(&ThreadKey::from_source("<b@example.com>")).await);
        // Taking any lock prunes everything that is no longer held
        let _c = locks.lock(&ThreadKey::from_source("<c@example.com>")).await;
        assert_eq!(locks.len(), 1);
    }
}
