//! # Keyed Locks
//!
//! One async mutex per key (`showing:<id>`, `wallet:<member>`, ...), created
//! lazily and shared by every caller asking for the same key.
//!
//! These serialize critical sections inside one process. The database's
//! write lock, claimed first in every atomic unit, covers the rest.
//!
//! ## Ordering
//! ```text
//! acquire_many(["wallet:bob", "wallet:alice"])
//!      │ sort + dedup
//!      ▼
//! lock "wallet:alice" → lock "wallet:bob"
//! ```
//! Callers needing several keys go through [`KeyedLocks::acquire_many`] so
//! two transfers in opposite directions cannot deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: LockMap,
}

/// Held locks; released on drop. Keys nobody else holds or waits for are
/// evicted from the map at the same time.
#[derive(Debug)]
pub struct KeyedGuard {
    locks: LockMap,
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        self.guards.clear();
        // Acquirers clone the entry under this same mutex, so a count of one
        // means only the map still refers to it.
        for key in &self.keys {
            if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(key);
            }
        }
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub async fn acquire(&self, key: &str) -> KeyedGuard {
        let guard = self.get_lock(key).lock_owned().await;
        KeyedGuard {
            locks: Arc::clone(&self.locks),
            keys: vec![key.to_string()],
            guards: vec![guard],
        }
    }

    /// Locks every key in sorted order. Duplicates are locked once.
    pub async fn acquire_many(&self, keys: &[String]) -> KeyedGuard {
        let mut sorted: Vec<&String> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guard = KeyedGuard {
            locks: Arc::clone(&self.locks),
            keys: Vec::with_capacity(sorted.len()),
            guards: Vec::with_capacity(sorted.len()),
        };
        for key in sorted {
            let held = self.get_lock(key).lock_owned().await;
            guard.keys.push(key.clone());
            guard.guards.push(held);
        }
        guard
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn showing_key(showing_id: &str) -> String {
    format!("showing:{showing_id}")
}

pub(crate) fn wallet_key(member_id: &str) -> String {
    format!("wallet:{member_id}")
}

pub(crate) fn booking_key(booking_id: &str) -> String {
    format!("booking:{booking_id}")
}

/// Serializes booking attempts of one member for one showing.
pub(crate) fn member_showing_key(member_id: &str, showing_id: &str) -> String {
    format!("member:{member_id}:showing:{showing_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_excludes() {
        let locks = Arc::new(KeyedLocks::new());
        let held = locks.acquire("showing:1").await;

        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = other.acquire("showing:1").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("wallet:a").await;
        let _b = locks.acquire("wallet:b").await;
    }

    #[tokio::test]
    async fn test_opposite_orders_do_not_deadlock() {
        let locks = Arc::new(KeyedLocks::new());
        let mut tasks = Vec::new();
        for i in 0..20 {
            let locks = Arc::clone(&locks);
            tasks.push(tokio::spawn(async move {
                let keys = if i % 2 == 0 {
                    vec!["wallet:a".to_string(), "wallet:b".to_string()]
                } else {
                    vec!["wallet:b".to_string(), "wallet:a".to_string()]
                };
                let _g = locks.acquire_many(&keys).await;
                tokio::task::yield_now().await;
            }));
        }
        for t in tasks {
            tokio::time::timeout(Duration::from_secs(5), t).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_released_keys_are_evicted() {
        let locks = KeyedLocks::new();
        for i in 0..1000 {
            let _g = locks.acquire(&format!("booking:{i}")).await;
        }
        let pair = locks
            .acquire_many(&["wallet:a".to_string(), "wallet:b".to_string()])
            .await;
        assert_eq!(locks.len(), 2);
        drop(pair);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiting_key_survives_release() {
        let locks = Arc::new(KeyedLocks::new());
        let held = locks.acquire("showing:1").await;

        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = other.acquire("showing:1").await;
            other.len()
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The waiter still refers to the entry, so it stays mapped
        drop(held);
        assert_eq!(waiter.await.unwrap(), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_keys_lock_once() {
        let locks = KeyedLocks::new();
        let _g = locks
            .acquire_many(&["wallet:a".to_string(), "wallet:a".to_string()])
            .await;
    }
}
